//! Flat-file persistence for users, objectives and bookings.
//!
//! Each record kind lives in its own `;`-separated file with a fixed header.
//! Reads are resilient: malformed rows are skipped and reported, and missing
//! or empty files are recreated with just the header. Writes replace the
//! whole file by staging a temporary sibling and renaming it over the target.

/// Line codec for the record files.
pub mod row;

use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    error::{StoreError, StoreResult},
    models::{Booking, Objective, User},
};

pub use row::{parse_available, parse_calendar_date, ReadOutcome, Record, SEP};

/// Prefix of export snapshot file names.
pub const EXPORT_PREFIX: &str = "available_objectives_";

/// Storage backend consumed by the repository.
pub trait RecordStore {
    /// Read all users in file order.
    fn read_users(&self) -> StoreResult<ReadOutcome<User>>;
    /// Read all objectives in file order.
    fn read_objectives(&self) -> StoreResult<ReadOutcome<Objective>>;
    /// Read all bookings in file order.
    fn read_bookings(&self) -> StoreResult<ReadOutcome<Booking>>;
    /// Replace the users file with `users`.
    fn write_users(&self, users: &[User]) -> StoreResult<()>;
    /// Replace the objectives file with `objectives`.
    fn write_objectives(&self, objectives: &[Objective]) -> StoreResult<()>;
    /// Replace the bookings file with `bookings`.
    fn write_bookings(&self, bookings: &[Booking]) -> StoreResult<()>;
    /// Write a snapshot of the available objectives stamped with `on` and
    /// return its path.
    fn export_available_objectives(
        &self,
        objectives: &[Objective],
        on: NaiveDate,
    ) -> StoreResult<PathBuf>;
}

/// [`RecordStore`] backed by three delimited text files.
#[derive(Debug, Clone)]
pub struct FlatFileStore {
    users_path: PathBuf,
    objectives_path: PathBuf,
    bookings_path: PathBuf,
    export_dir: PathBuf,
}

impl FlatFileStore {
    /// Create a store over explicit file locations.
    pub fn new(
        users_path: impl Into<PathBuf>,
        objectives_path: impl Into<PathBuf>,
        bookings_path: impl Into<PathBuf>,
        export_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            users_path: users_path.into(),
            objectives_path: objectives_path.into(),
            bookings_path: bookings_path.into(),
            export_dir: export_dir.into(),
        }
    }

    /// Create a store using the standard file names inside `data_dir`.
    pub fn in_dir(data_dir: impl AsRef<Path>, export_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.as_ref();
        Self::new(
            data_dir.join("users.csv"),
            data_dir.join("objectives.csv"),
            data_dir.join("bookings.csv"),
            export_dir,
        )
    }

    /// Create a store from the application configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.users_path(),
            config.objectives_path(),
            config.bookings_path(),
            config.export_dir.clone(),
        )
    }

    /// Location of the users file.
    pub fn users_path(&self) -> &Path {
        &self.users_path
    }

    /// Location of the objectives file.
    pub fn objectives_path(&self) -> &Path {
        &self.objectives_path
    }

    /// Location of the bookings file.
    pub fn bookings_path(&self) -> &Path {
        &self.bookings_path
    }

    /// Directory receiving export snapshots.
    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    fn read<T: Record>(&self, path: &Path) -> StoreResult<ReadOutcome<T>> {
        ensure_file(path, T::HEADER)?;
        let content = fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let header_blank = content
            .lines()
            .next()
            .map(|line| line.trim().is_empty())
            .unwrap_or(true);
        if header_blank {
            warn!("{} has a blank header line, reading no records", path.display());
            return Ok(ReadOutcome::default());
        }

        let outcome = row::parse_records::<T>(&file_label(path), &content);
        for skipped in &outcome.skipped {
            warn!(
                file = %skipped.file,
                line = skipped.line,
                reason = %skipped.reason,
                "{skipped}"
            );
        }
        Ok(outcome)
    }

    fn write<T: Record>(&self, path: &Path, records: &[T]) -> StoreResult<()> {
        write_file(path, T::HEADER, records.iter().map(Record::to_line))?;
        debug!("wrote {} records to {}", records.len(), path.display());
        Ok(())
    }
}

impl RecordStore for FlatFileStore {
    fn read_users(&self) -> StoreResult<ReadOutcome<User>> {
        self.read(&self.users_path)
    }

    fn read_objectives(&self) -> StoreResult<ReadOutcome<Objective>> {
        self.read(&self.objectives_path)
    }

    fn read_bookings(&self) -> StoreResult<ReadOutcome<Booking>> {
        self.read(&self.bookings_path)
    }

    fn write_users(&self, users: &[User]) -> StoreResult<()> {
        self.write(&self.users_path, users)
    }

    fn write_objectives(&self, objectives: &[Objective]) -> StoreResult<()> {
        self.write(&self.objectives_path, objectives)
    }

    fn write_bookings(&self, bookings: &[Booking]) -> StoreResult<()> {
        self.write(&self.bookings_path, bookings)
    }

    fn export_available_objectives(
        &self,
        objectives: &[Objective],
        on: NaiveDate,
    ) -> StoreResult<PathBuf> {
        fs::create_dir_all(&self.export_dir).map_err(|source| StoreError::CreateDir {
            path: self.export_dir.clone(),
            source,
        })?;
        let path = self
            .export_dir
            .join(format!("{EXPORT_PREFIX}{}.csv", on.format("%Y-%m-%d")));
        let lines = objectives
            .iter()
            .filter(|objective| objective.is_available())
            .map(row::export_line);
        write_file(&path, row::EXPORT_HEADER, lines)?;
        info!("exported available objectives to {}", path.display());
        Ok(path)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn parent_dir(path: &Path) -> StoreResult<PathBuf> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|source| StoreError::CreateDir {
        path: parent.clone(),
        source,
    })?;
    Ok(parent)
}

/// Create `path` with only `header` when it is missing or zero-length.
fn ensure_file(path: &Path, header: &str) -> StoreResult<()> {
    parent_dir(path)?;
    let needs_header = match fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => true,
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if needs_header {
        info!("initialising {} with header", path.display());
        write_file(path, header, std::iter::empty())?;
    }
    Ok(())
}

/// Replace `path` with `header` followed by `lines`, one per line.
fn write_file(path: &Path, header: &str, lines: impl Iterator<Item = String>) -> StoreResult<()> {
    let parent = parent_dir(path)?;
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut staged = NamedTempFile::new_in(&parent).map_err(write_err)?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        writeln!(writer, "{header}").map_err(write_err)?;
        for line in lines {
            writeln!(writer, "{line}").map_err(write_err)?;
        }
        writer.flush().map_err(write_err)?;
    }
    staged.as_file().sync_all().map_err(write_err)?;
    staged
        .persist(path)
        .map_err(|err| StoreError::Persist {
            path: path.to_path_buf(),
            source: err.error,
        })?;
    Ok(())
}

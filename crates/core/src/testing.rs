//! Test doubles shared by unit tests.

use std::{
    cell::{Cell, RefCell},
    fs, io,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;

use crate::{
    error::{StoreError, StoreResult},
    models::{Booking, Objective, User},
    store::{FlatFileStore, ReadOutcome, RecordStore},
};

pub(crate) fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

/// Wraps a [`FlatFileStore`], recording writes and failing them on demand.
pub(crate) struct ScriptedStore {
    inner: FlatFileStore,
    fail_all: Cell<bool>,
    fail_on: Cell<Option<&'static str>>,
    writes: RefCell<Vec<&'static str>>,
}

impl ScriptedStore {
    pub(crate) fn new(dir: &Path) -> Self {
        Self {
            inner: FlatFileStore::in_dir(dir.join("data"), dir.join("exports")),
            fail_all: Cell::new(false),
            fail_on: Cell::new(None),
            writes: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn inner(&self) -> &FlatFileStore {
        &self.inner
    }

    /// Write raw file contents for the three collections.
    pub(crate) fn seed(&self, users: &str, objectives: &str, bookings: &str) -> io::Result<()> {
        if let Some(parent) = self.inner.users_path().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(self.inner.users_path(), users)?;
        fs::write(self.inner.objectives_path(), objectives)?;
        fs::write(self.inner.bookings_path(), bookings)
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_all.set(fail);
    }

    /// Fail only writes to `collection` (`users`, `objectives`, `bookings`).
    pub(crate) fn fail_writes_to(&self, collection: &'static str) {
        self.fail_on.set(Some(collection));
    }

    pub(crate) fn writes(&self) -> Vec<&'static str> {
        self.writes.borrow().clone()
    }

    pub(crate) fn objective_writes(&self) -> usize {
        self.writes
            .borrow()
            .iter()
            .filter(|name| **name == "objectives")
            .count()
    }

    fn guard(&self, collection: &'static str, path: &Path) -> StoreResult<()> {
        if self.fail_all.get() || self.fail_on.get() == Some(collection) {
            return Err(StoreError::Write {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "scripted write failure"),
            });
        }
        self.writes.borrow_mut().push(collection);
        Ok(())
    }
}

impl RecordStore for ScriptedStore {
    fn read_users(&self) -> StoreResult<ReadOutcome<User>> {
        self.inner.read_users()
    }

    fn read_objectives(&self) -> StoreResult<ReadOutcome<Objective>> {
        self.inner.read_objectives()
    }

    fn read_bookings(&self) -> StoreResult<ReadOutcome<Booking>> {
        self.inner.read_bookings()
    }

    fn write_users(&self, users: &[User]) -> StoreResult<()> {
        self.guard("users", self.inner.users_path())?;
        self.inner.write_users(users)
    }

    fn write_objectives(&self, objectives: &[Objective]) -> StoreResult<()> {
        self.guard("objectives", self.inner.objectives_path())?;
        self.inner.write_objectives(objectives)
    }

    fn write_bookings(&self, bookings: &[Booking]) -> StoreResult<()> {
        self.guard("bookings", self.inner.bookings_path())?;
        self.inner.write_bookings(bookings)
    }

    fn export_available_objectives(
        &self,
        objectives: &[Objective],
        on: NaiveDate,
    ) -> StoreResult<PathBuf> {
        let target = self.inner.export_dir().to_path_buf();
        self.guard("export", &target)?;
        self.inner.export_available_objectives(objectives, on)
    }
}

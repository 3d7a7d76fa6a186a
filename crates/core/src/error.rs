//! Error taxonomy shared by the store, repository and workflow layers.

use std::{fmt, io, path::PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{BookingId, ObjectiveId, UserId};

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result alias for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Failure talking to the backing files.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A parent or export directory could not be created.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// A record file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// A record file could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// File being written.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// The staged temporary file could not replace the target.
    #[error("failed to replace {}: {source}", .path.display())]
    Persist {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
}

/// Why a single data row was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// Fewer separated fields than the record needs.
    #[error("expected {expected} columns, found {found}")]
    MissingFields {
        /// Columns the record kind requires.
        expected: usize,
        /// Columns present on the line.
        found: usize,
    },
    /// A numeric column did not hold an integer.
    #[error("invalid integer in column `{column}`: {value:?}")]
    InvalidInteger {
        /// Header name of the column.
        column: &'static str,
        /// Offending token.
        value: String,
    },
    /// The date column did not match `YYYY-MM-DD`.
    #[error("invalid date format (expected YYYY-MM-DD): {value:?}")]
    InvalidDate {
        /// Offending token.
        value: String,
    },
}

/// A row that was skipped while reading a record file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// File name (not the full path) the row came from.
    pub file: String,
    /// 1-based line number, the header being line 1.
    pub line: usize,
    /// Reason the row was rejected.
    pub reason: RowError,
    /// Raw line content.
    pub raw: String,
}

impl fmt::Display for SkippedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} line {} skipped ({}): {}",
            self.file, self.line, self.reason, self.raw
        )
    }
}

/// A precondition of a workflow operation that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No user with this id.
    #[error("user {0} not found")]
    UserNotFound(UserId),
    /// No objective with this id.
    #[error("objective {0} not found")]
    ObjectiveNotFound(ObjectiveId),
    /// The objective exists but is already booked.
    #[error("objective {0} is not available")]
    ObjectiveUnavailable(ObjectiveId),
    /// The pair already has a booking.
    #[error("a booking for user {user_id} and objective {objective_id} already exists")]
    DuplicateBooking {
        /// User of the existing booking.
        user_id: UserId,
        /// Objective of the existing booking.
        objective_id: ObjectiveId,
    },
    /// The requested date lies before today.
    #[error("booking date {date} is before {today}")]
    DateInPast {
        /// Requested date.
        date: NaiveDate,
        /// Reference date the request was checked against.
        today: NaiveDate,
    },
    /// No booking with this id.
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),
    /// Another user already uses this email.
    #[error("a user with email {0} already exists")]
    DuplicateEmail(String),
    /// A value contains the field separator or a line break.
    #[error("{field} must not contain ';' or line breaks")]
    ReservedCharacter {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The highest stored id is already the largest representable one.
    #[error("no {kind} ids left")]
    IdSpaceExhausted {
        /// Record kind that ran out of ids.
        kind: &'static str,
    },
}

/// Failure of a workflow operation.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A precondition failed; nothing was mutated.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Persisting the change failed; the in-memory change was rolled back.
    #[error("could not persist change, rolled back: {0}")]
    Persistence(#[source] StoreError),
}

impl WorkflowError {
    /// The validation failure, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(_) => None,
        }
    }

    /// Whether this error came from the store after a rollback.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

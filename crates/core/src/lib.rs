#![warn(clippy::all, missing_docs)]

//! Core domain logic for MindTrack.
//!
//! This crate hosts the data models, configuration handling, the flat-file
//! store, the in-memory repository, and the booking/user workflows used by
//! the command-line shell.

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod store;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::config::AppConfig;
pub use error::{
    RowError, SkippedRow, StoreError, StoreResult, ValidationError, WorkflowError, WorkflowResult,
};
pub use models::{Booking, BookingId, Objective, ObjectiveId, User, UserId};
pub use repository::{LoadReport, Repository};
pub use store::{FlatFileStore, ReadOutcome, RecordStore};
pub use workflow::{BookingRequest, NewUser};

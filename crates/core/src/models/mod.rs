//! Shared domain models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of a [`User`].
pub type UserId = u32;
/// Identifier of an [`Objective`].
pub type ObjectiveId = u32;
/// Identifier of a [`Booking`].
pub type BookingId = u32;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Positive, never reused identifier.
    pub id: UserId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact address, unique ignoring case and surrounding whitespace.
    pub email: String,
}

impl User {
    /// Returns `first last` for display.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether this user's email matches `email` ignoring case and padding.
    pub fn has_email(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}

/// A bookable slot that pays out a coin reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    /// Unique identifier.
    pub id: ObjectiveId,
    /// Short title shown in listings.
    pub title: String,
    /// Free-form period label (e.g. `2024-Q3`, `weekly`).
    pub period: String,
    /// Coin reward.
    pub coins: i32,
    available: bool,
}

impl Objective {
    /// Build an objective with the given availability.
    pub fn new(
        id: ObjectiveId,
        title: impl Into<String>,
        period: impl Into<String>,
        coins: i32,
        available: bool,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            period: period.into(),
            coins,
            available,
        }
    }

    /// Whether the objective can currently be booked.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Update the availability flag, returning the previous value.
    pub(crate) fn set_available(&mut self, available: bool) -> bool {
        std::mem::replace(&mut self.available, available)
    }
}

/// A reservation of one objective by one user on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique identifier, never reused.
    pub id: BookingId,
    /// Referenced user.
    pub user_id: UserId,
    /// Referenced objective.
    pub objective_id: ObjectiveId,
    /// Booked calendar date.
    pub date: NaiveDate,
}

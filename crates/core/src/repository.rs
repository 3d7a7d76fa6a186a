//! In-memory collections backed by a [`RecordStore`].
//!
//! The repository is the single source of truth for a session. It is loaded
//! once, mutated only through [`crate::workflow`], and flushed to the store
//! after every successful mutation.

use tracing::{info, warn};

use crate::{
    error::StoreResult,
    models::{Booking, BookingId, Objective, ObjectiveId, User, UserId},
    store::RecordStore,
};

/// Summary of a [`Repository::load_all`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Users loaded.
    pub users: usize,
    /// Objectives loaded.
    pub objectives: usize,
    /// Bookings loaded.
    pub bookings: usize,
    /// Rows skipped across all three files.
    pub skipped_rows: usize,
    /// Bookings whose objective does not exist, as `(booking, objective)`.
    pub orphaned_bookings: Vec<(BookingId, ObjectiveId)>,
    /// Objectives flipped from available to unavailable.
    pub reconciled: usize,
    /// Whether the objectives file was rewritten after reconciliation.
    pub objectives_saved: bool,
}

/// Owner of the users, objectives and bookings collections.
pub struct Repository<S> {
    store: S,
    users: Vec<User>,
    objectives: Vec<Objective>,
    bookings: Vec<Booking>,
    last_booking_id: BookingId,
    last_user_id: UserId,
}

impl<S: RecordStore> Repository<S> {
    /// Create an empty repository over `store`. Call [`Self::load_all`] to
    /// populate it.
    pub fn new(store: S) -> Self {
        Self {
            store,
            users: Vec::new(),
            objectives: Vec::new(),
            bookings: Vec::new(),
            last_booking_id: 0,
            last_user_id: 0,
        }
    }

    /// Replace all collections with the store contents and force objective
    /// availability to agree with the loaded bookings.
    pub fn load_all(&mut self) -> StoreResult<LoadReport> {
        self.users.clear();
        self.objectives.clear();
        self.bookings.clear();

        let users = self.store.read_users()?;
        let objectives = self.store.read_objectives()?;
        let bookings = self.store.read_bookings()?;

        let skipped_rows = users.skipped.len() + objectives.skipped.len() + bookings.skipped.len();
        self.users = users.records;
        self.objectives = objectives.records;
        self.bookings = bookings.records;
        self.last_booking_id = self.bookings.iter().map(|booking| booking.id).max().unwrap_or(0);
        self.last_user_id = self.users.iter().map(|user| user.id).max().unwrap_or(0);

        let mut report = LoadReport {
            users: self.users.len(),
            objectives: self.objectives.len(),
            bookings: self.bookings.len(),
            skipped_rows,
            ..LoadReport::default()
        };

        self.reconcile(&mut report);
        if report.reconciled > 0 {
            self.save_objectives()?;
            report.objectives_saved = true;
        }

        info!(
            users = report.users,
            objectives = report.objectives,
            bookings = report.bookings,
            skipped = report.skipped_rows,
            reconciled = report.reconciled,
            "loaded data files"
        );
        Ok(report)
    }

    fn reconcile(&mut self, report: &mut LoadReport) {
        for booking in &self.bookings {
            match self
                .objectives
                .iter_mut()
                .find(|objective| objective.id == booking.objective_id)
            {
                Some(objective) => {
                    if objective.set_available(false) {
                        report.reconciled += 1;
                    }
                }
                None => {
                    warn!(
                        "booking {} references missing objective id {}",
                        booking.id, booking.objective_id
                    );
                    report
                        .orphaned_bookings
                        .push((booking.id, booking.objective_id));
                }
            }
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// All users in load/insertion order.
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// All objectives in load order.
    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    /// All bookings in load/insertion order.
    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// Objectives that can currently be booked.
    pub fn available_objectives(&self) -> impl Iterator<Item = &Objective> {
        self.objectives.iter().filter(|objective| objective.is_available())
    }

    /// Linear lookup by id.
    pub fn find_user_by_id(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    /// Linear lookup by id.
    pub fn find_objective_by_id(&self, id: ObjectiveId) -> Option<&Objective> {
        self.objectives.iter().find(|objective| objective.id == id)
    }

    /// Linear lookup by id.
    pub fn find_booking_by_id(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|booking| booking.id == id)
    }

    /// Whether any user already has `email`, ignoring case and padding.
    pub fn email_exists(&self, email: &str) -> bool {
        self.users.iter().any(|user| user.has_email(email))
    }

    /// Whether the pair already holds a booking.
    pub fn booking_exists_for_user_and_objective(
        &self,
        user_id: UserId,
        objective_id: ObjectiveId,
    ) -> bool {
        self.bookings
            .iter()
            .any(|booking| booking.user_id == user_id && booking.objective_id == objective_id)
    }

    /// `max(existing booking ids) + 1`. Within a session the highest id ever
    /// issued is remembered, so cancelling the newest booking does not free
    /// its id. `None` once the id space is used up.
    pub fn next_booking_id(&self) -> Option<BookingId> {
        self.bookings
            .iter()
            .map(|booking| booking.id)
            .max()
            .unwrap_or(0)
            .max(self.last_booking_id)
            .checked_add(1)
    }

    /// `max(existing user ids) + 1`, with the same session memory as
    /// [`Self::next_booking_id`].
    pub fn next_user_id(&self) -> Option<UserId> {
        self.users
            .iter()
            .map(|user| user.id)
            .max()
            .unwrap_or(0)
            .max(self.last_user_id)
            .checked_add(1)
    }

    /// Flush the users collection.
    pub fn save_users(&self) -> StoreResult<()> {
        self.store.write_users(&self.users)
    }

    /// Flush the objectives collection.
    pub fn save_objectives(&self) -> StoreResult<()> {
        self.store.write_objectives(&self.objectives)
    }

    /// Flush the bookings collection.
    pub fn save_bookings(&self) -> StoreResult<()> {
        self.store.write_bookings(&self.bookings)
    }

    /// Flush all three collections.
    pub fn save_all(&self) -> StoreResult<()> {
        self.save_users()?;
        self.save_objectives()?;
        self.save_bookings()
    }

    /// Append a user, returning the previous id high-water mark.
    pub(crate) fn push_user(&mut self, user: User) -> UserId {
        let previous = self.last_user_id;
        self.last_user_id = previous.max(user.id);
        self.users.push(user);
        previous
    }

    pub(crate) fn restore_last_user_id(&mut self, id: UserId) {
        self.last_user_id = id;
    }

    pub(crate) fn remove_user(&mut self, id: UserId) -> Option<User> {
        let index = self.users.iter().position(|user| user.id == id)?;
        Some(self.users.remove(index))
    }

    /// Append a booking, returning the previous id high-water mark.
    pub(crate) fn push_booking(&mut self, booking: Booking) -> BookingId {
        let previous = self.last_booking_id;
        self.last_booking_id = previous.max(booking.id);
        self.bookings.push(booking);
        previous
    }

    pub(crate) fn restore_last_booking_id(&mut self, id: BookingId) {
        self.last_booking_id = id;
    }

    /// Remove a booking, returning it with the position it occupied.
    pub(crate) fn remove_booking(&mut self, id: BookingId) -> Option<(usize, Booking)> {
        let index = self.bookings.iter().position(|booking| booking.id == id)?;
        Some((index, self.bookings.remove(index)))
    }

    pub(crate) fn insert_booking(&mut self, index: usize, booking: Booking) {
        let index = index.min(self.bookings.len());
        self.bookings.insert(index, booking);
    }

    /// Set an objective's availability, returning the previous flag or `None`
    /// if the objective does not exist.
    pub(crate) fn set_objective_available(
        &mut self,
        id: ObjectiveId,
        available: bool,
    ) -> Option<bool> {
        self.objectives
            .iter_mut()
            .find(|objective| objective.id == id)
            .map(|objective| objective.set_available(available))
    }
}

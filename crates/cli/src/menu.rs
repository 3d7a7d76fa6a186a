//! Interactive menu driving the workflows.

use std::io::{self, BufRead, Write};

use chrono::{Local, NaiveDate};
use mindtrack_core::{
    workflow::{self, BookingRequest, NewUser},
    BookingId, ObjectiveId, RecordStore, Repository, UserId, ValidationError, WorkflowError,
};

use crate::console::Console;

/// Numbered menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Exit,
    ShowObjectives,
    Book,
    Cancel,
    AddUser,
    Export,
}

impl Choice {
    /// Callers read `number` within `0..=5`; anything else maps to exit.
    fn from_number(number: u8) -> Self {
        match number {
            1 => Self::ShowObjectives,
            2 => Self::Book,
            3 => Self::Cancel,
            4 => Self::AddUser,
            5 => Self::Export,
            _ => Self::Exit,
        }
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct Menu<'a, S, R, W> {
    repo: &'a mut Repository<S>,
    console: &'a mut Console<R, W>,
    today: fn() -> NaiveDate,
}

impl<'a, S, R, W> Menu<'a, S, R, W>
where
    S: RecordStore,
    R: BufRead,
    W: Write,
{
    pub fn new(repo: &'a mut Repository<S>, console: &'a mut Console<R, W>) -> Self {
        Self {
            repo,
            console,
            today: local_today,
        }
    }

    #[cfg(test)]
    /// Replace the source of "today" used for date checks and export names.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Loop until the user picks exit or input ends.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            self.print_menu()?;
            let number = self.console.read_int("Choose an option: ", 0u8, 5)?;
            match Choice::from_number(number) {
                Choice::ShowObjectives => self.show_objectives()?,
                Choice::Book => self.create_booking()?,
                Choice::Cancel => self.cancel_booking()?,
                Choice::AddUser => self.add_user()?,
                Choice::Export => self.export_available()?,
                Choice::Exit => {
                    self.console.println("Goodbye!")?;
                    return Ok(());
                }
            }
        }
    }

    fn print_menu(&mut self) -> io::Result<()> {
        self.console.println("\n=== MindTrack ===")?;
        self.console.println("1) Show all objectives")?;
        self.console.println("2) Book an objective")?;
        self.console.println("3) Cancel booking")?;
        self.console.println("4) Add user")?;
        self.console.println("5) Export available objectives")?;
        self.console.println("0) Exit")
    }

    fn show_objectives(&mut self) -> io::Result<()> {
        if self.repo.objectives().is_empty() {
            return self.console.println("No objectives found.");
        }
        for objective in self.repo.objectives() {
            self.console.println(format!(
                "{} | {} | {} | {} | {}",
                objective.id,
                objective.title,
                objective.period,
                objective.coins,
                if objective.is_available() { "YES" } else { "NO" }
            ))?;
        }
        Ok(())
    }

    fn create_booking(&mut self) -> io::Result<()> {
        let available: Vec<String> = self
            .repo
            .available_objectives()
            .map(|objective| {
                format!(
                    "{} | {} | {} | {}",
                    objective.id, objective.title, objective.period, objective.coins
                )
            })
            .collect();
        if available.is_empty() {
            return self.console.println("No objectives available right now.");
        }
        self.console.println("Available objectives:")?;
        for line in available {
            self.console.println(line)?;
        }

        let user_id: UserId = self.console.read_int("User ID: ", 1, UserId::MAX)?;
        if self.repo.find_user_by_id(user_id).is_none() {
            return self.console.println("User not found.");
        }
        let objective_id: ObjectiveId = self.console.read_int("Objective ID: ", 1, ObjectiveId::MAX)?;
        if let Some(reason) = self.objective_rejection(user_id, objective_id) {
            return self.console.println(capitalize(&reason.to_string()));
        }
        let date = self.console.read_date("Booking date (YYYY-MM-DD): ")?;

        let request = BookingRequest {
            user_id,
            objective_id,
            date,
        };
        match workflow::create_booking(&mut *self.repo, &request, (self.today)()) {
            Ok(booking) => self
                .console
                .println(format!("Booking created with ID: {}", booking.id)),
            Err(err) => self.report("booking", err),
        }
    }

    /// Checks that can be answered before asking for a date. The workflow
    /// repeats them.
    fn objective_rejection(
        &self,
        user_id: UserId,
        objective_id: ObjectiveId,
    ) -> Option<ValidationError> {
        match self.repo.find_objective_by_id(objective_id) {
            None => Some(ValidationError::ObjectiveNotFound(objective_id)),
            Some(objective) if !objective.is_available() => {
                Some(ValidationError::ObjectiveUnavailable(objective_id))
            }
            Some(_) if self.repo.booking_exists_for_user_and_objective(user_id, objective_id) => {
                Some(ValidationError::DuplicateBooking {
                    user_id,
                    objective_id,
                })
            }
            Some(_) => None,
        }
    }

    fn cancel_booking(&mut self) -> io::Result<()> {
        if self.repo.bookings().is_empty() {
            return self.console.println("No bookings found.");
        }
        let booking_id: BookingId = self.console.read_int("Booking ID: ", 1, BookingId::MAX)?;
        match workflow::cancel_booking(&mut *self.repo, booking_id) {
            Ok(_) => self.console.println("Booking cancelled."),
            Err(err) => self.report("cancellation", err),
        }
    }

    fn add_user(&mut self) -> io::Result<()> {
        let new_user = NewUser {
            first_name: self.console.read_non_empty("First name: ")?,
            last_name: self.console.read_non_empty("Last name: ")?,
            email: self.console.read_email("Email: ")?,
        };
        match workflow::add_user(&mut *self.repo, &new_user) {
            Ok(user) => self
                .console
                .println(format!("User created with ID: {}", user.id)),
            Err(err) => self.report("user", err),
        }
    }

    fn export_available(&mut self) -> io::Result<()> {
        match workflow::export_available(&*self.repo, (self.today)()) {
            Ok(path) => {
                let shown = path.canonicalize().unwrap_or(path);
                self.console
                    .println(format!("Export created at: {}", shown.display()))
            }
            Err(err) => self.console.println(format!("ERROR: export failed ({err})")),
        }
    }

    fn report(&mut self, what: &str, err: WorkflowError) -> io::Result<()> {
        match err {
            WorkflowError::Validation(reason) => self.console.println(capitalize(&reason.to_string())),
            WorkflowError::Persistence(cause) => self.console.println(format!(
                "ERROR: could not save {what} ({cause}). Changes were rolled back."
            )),
        }
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

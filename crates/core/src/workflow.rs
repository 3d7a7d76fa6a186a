//! Mutating use cases.
//!
//! Every operation validates, mutates the repository in memory, persists the
//! affected files and, if persisting fails, applies the inverse of its
//! mutation before reporting the storage error. Validation failures never
//! touch the repository.

use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{error, info};

use crate::{
    error::{StoreResult, ValidationError, WorkflowError, WorkflowResult},
    models::{Booking, BookingId, ObjectiveId, User, UserId},
    repository::Repository,
    store::{RecordStore, SEP},
};

/// Input for [`create_booking`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    /// Booking user.
    pub user_id: UserId,
    /// Objective to reserve.
    pub objective_id: ObjectiveId,
    /// Requested date; must not be before today.
    pub date: NaiveDate,
}

/// Input for [`add_user`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact address.
    pub email: String,
}

/// An applied in-memory mutation together with what is needed to undo it.
#[derive(Debug)]
enum Change {
    BookingCreated {
        booking_id: BookingId,
        objective_id: ObjectiveId,
        objective_was_available: bool,
        last_booking_id: BookingId,
    },
    BookingCancelled {
        index: usize,
        booking: Booking,
        objective_was_available: Option<bool>,
    },
    UserAdded {
        user_id: UserId,
        last_user_id: UserId,
    },
}

impl Change {
    fn revert<S: RecordStore>(self, repo: &mut Repository<S>) {
        match self {
            Change::BookingCreated {
                booking_id,
                objective_id,
                objective_was_available,
                last_booking_id,
            } => {
                repo.remove_booking(booking_id);
                repo.restore_last_booking_id(last_booking_id);
                repo.set_objective_available(objective_id, objective_was_available);
            }
            Change::BookingCancelled {
                index,
                booking,
                objective_was_available,
            } => {
                let objective_id = booking.objective_id;
                repo.insert_booking(index, booking);
                if let Some(available) = objective_was_available {
                    repo.set_objective_available(objective_id, available);
                }
            }
            Change::UserAdded {
                user_id,
                last_user_id,
            } => {
                repo.remove_user(user_id);
                repo.restore_last_user_id(last_user_id);
            }
        }
    }
}

/// Persist with `persist`; on failure undo `change` and surface the error.
fn commit<S, F>(repo: &mut Repository<S>, change: Change, persist: F) -> WorkflowResult<()>
where
    S: RecordStore,
    F: FnOnce(&Repository<S>) -> StoreResult<()>,
{
    match persist(repo) {
        Ok(()) => Ok(()),
        Err(err) => {
            error!("persisting {change:?} failed, rolling back: {err}");
            change.revert(repo);
            Err(WorkflowError::Persistence(err))
        }
    }
}

/// Reserve an available objective for a user.
///
/// Writes bookings, then objectives. On failure the booking is removed again
/// and the objective made available.
pub fn create_booking<S: RecordStore>(
    repo: &mut Repository<S>,
    request: &BookingRequest,
    today: NaiveDate,
) -> WorkflowResult<Booking> {
    let objective = repo
        .find_objective_by_id(request.objective_id)
        .ok_or(ValidationError::ObjectiveNotFound(request.objective_id))?;
    if !objective.is_available() {
        return Err(ValidationError::ObjectiveUnavailable(request.objective_id).into());
    }
    if repo.find_user_by_id(request.user_id).is_none() {
        return Err(ValidationError::UserNotFound(request.user_id).into());
    }
    if repo.booking_exists_for_user_and_objective(request.user_id, request.objective_id) {
        return Err(ValidationError::DuplicateBooking {
            user_id: request.user_id,
            objective_id: request.objective_id,
        }
        .into());
    }
    if request.date < today {
        return Err(ValidationError::DateInPast {
            date: request.date,
            today,
        }
        .into());
    }

    let booking = Booking {
        id: repo
            .next_booking_id()
            .ok_or(ValidationError::IdSpaceExhausted { kind: "booking" })?,
        user_id: request.user_id,
        objective_id: request.objective_id,
        date: request.date,
    };
    let last_booking_id = repo.push_booking(booking.clone());
    let objective_was_available = repo
        .set_objective_available(booking.objective_id, false)
        .unwrap_or(true);

    let change = Change::BookingCreated {
        booking_id: booking.id,
        objective_id: booking.objective_id,
        objective_was_available,
        last_booking_id,
    };
    commit(repo, change, |repo| {
        repo.save_bookings()?;
        repo.save_objectives()
    })?;

    info!(
        booking = booking.id,
        user = booking.user_id,
        objective = booking.objective_id,
        "booking created"
    );
    Ok(booking)
}

/// Remove a booking and release its objective.
///
/// A booking whose objective no longer exists is still cancelled. On
/// persistence failure the booking is re-inserted at its original position
/// and the objective's previous flag restored.
pub fn cancel_booking<S: RecordStore>(
    repo: &mut Repository<S>,
    booking_id: BookingId,
) -> WorkflowResult<Booking> {
    let (index, booking) = repo
        .remove_booking(booking_id)
        .ok_or(ValidationError::BookingNotFound(booking_id))?;
    let objective_was_available = repo.set_objective_available(booking.objective_id, true);

    let change = Change::BookingCancelled {
        index,
        booking: booking.clone(),
        objective_was_available,
    };
    commit(repo, change, |repo| {
        repo.save_bookings()?;
        repo.save_objectives()
    })?;

    info!(booking = booking.id, "booking cancelled");
    Ok(booking)
}

/// Register a new user with a fresh id.
///
/// Fields are trimmed. The email must not be in use by another user.
pub fn add_user<S: RecordStore>(
    repo: &mut Repository<S>,
    new_user: &NewUser,
) -> WorkflowResult<User> {
    let first_name = clean_field(&new_user.first_name, "first name")?;
    let last_name = clean_field(&new_user.last_name, "last name")?;
    let email = clean_field(&new_user.email, "email")?;
    if repo.email_exists(&email) {
        return Err(ValidationError::DuplicateEmail(email).into());
    }

    let user = User {
        id: repo
            .next_user_id()
            .ok_or(ValidationError::IdSpaceExhausted { kind: "user" })?,
        first_name,
        last_name,
        email,
    };
    let last_user_id = repo.push_user(user.clone());

    let change = Change::UserAdded {
        user_id: user.id,
        last_user_id,
    };
    commit(repo, change, |repo| repo.save_users())?;

    info!(user = user.id, "user created");
    Ok(user)
}

/// Write a snapshot of the currently available objectives.
///
/// Not transactional: nothing in memory changes, so a failure is only
/// reported.
pub fn export_available<S: RecordStore>(
    repo: &Repository<S>,
    today: NaiveDate,
) -> StoreResult<PathBuf> {
    repo.store()
        .export_available_objectives(repo.objectives(), today)
}

fn clean_field(raw: &str, field: &'static str) -> Result<String, ValidationError> {
    let value = raw.trim();
    if value.contains(SEP) || value.contains(['\n', '\r']) {
        return Err(ValidationError::ReservedCharacter { field });
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::Objective,
        testing::{date, ScriptedStore},
    };
    use anyhow::Result;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const TODAY: &str = "2025-05-10";

    fn seeded() -> Result<(TempDir, Repository<ScriptedStore>)> {
        let dir = tempdir()?;
        let store = ScriptedStore::new(dir.path());
        store.seed(
            "id;first_name;last_name;email\n\
             1;Ada;Lovelace;ada@example.com\n\
             2;Alan;Turing;alan@example.com\n",
            "id;title;period;coins;available\n\
             1;Read a book;weekly;10;YES\n\
             2;Run 10k;monthly;25;NO\n\
             3;Meditate;daily;5;YES\n",
            "id;user_id;objective_id;date\n\
             1;2;2;2025-05-01\n\
             3;1;42;2025-05-02\n",
        )?;
        let mut repo = Repository::new(store);
        repo.load_all()?;
        Ok((dir, repo))
    }

    fn snapshot<S: RecordStore>(
        repo: &Repository<S>,
    ) -> (Vec<User>, Vec<Objective>, Vec<Booking>) {
        (
            repo.users().to_vec(),
            repo.objectives().to_vec(),
            repo.bookings().to_vec(),
        )
    }

    fn request(user_id: UserId, objective_id: ObjectiveId, on: &str) -> BookingRequest {
        BookingRequest {
            user_id,
            objective_id,
            date: date(on),
        }
    }

    #[test]
    fn booking_marks_objective_unavailable_and_persists() -> Result<()> {
        let (_dir, mut repo) = seeded()?;

        let booking = create_booking(&mut repo, &request(1, 1, "2025-05-11"), date(TODAY))?;

        assert_eq!(booking.id, 4);
        assert!(!repo.find_objective_by_id(1).unwrap().is_available());
        assert_eq!(repo.store().writes(), vec!["bookings", "objectives"]);
        let bookings = fs::read_to_string(repo.store().inner().bookings_path())?;
        assert!(bookings.ends_with("4;1;1;2025-05-11\n"));
        Ok(())
    }

    #[test]
    fn booking_today_is_allowed_but_yesterday_is_not() -> Result<()> {
        let (_dir, mut repo) = seeded()?;

        let err = create_booking(&mut repo, &request(1, 1, "2025-05-09"), date(TODAY))
            .unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::DateInPast { .. })
        ));
        assert!(repo.find_objective_by_id(1).unwrap().is_available());

        create_booking(&mut repo, &request(1, 1, TODAY), date(TODAY))?;
        Ok(())
    }

    #[test]
    fn booking_validation_never_mutates() -> Result<()> {
        let (_dir, mut repo) = seeded()?;
        let before = snapshot(&repo);

        let cases = [
            (request(1, 99, TODAY), ValidationError::ObjectiveNotFound(99)),
            (request(1, 2, TODAY), ValidationError::ObjectiveUnavailable(2)),
            (request(9, 1, TODAY), ValidationError::UserNotFound(9)),
        ];
        for (req, expected) in cases {
            let err = create_booking(&mut repo, &req, date(TODAY)).unwrap_err();
            assert_eq!(err.as_validation(), Some(&expected));
        }

        assert_eq!(snapshot(&repo), before);
        assert!(repo.store().writes().is_empty());
        Ok(())
    }

    #[test]
    fn duplicate_pair_is_rejected() -> Result<()> {
        let (_dir, mut repo) = seeded()?;
        create_booking(&mut repo, &request(1, 1, TODAY), date(TODAY))?;
        // Make the objective bookable again without removing the booking.
        repo.set_objective_available(1, true);
        let before = snapshot(&repo);

        let err = create_booking(&mut repo, &request(1, 1, TODAY), date(TODAY)).unwrap_err();
        assert_eq!(
            err.as_validation(),
            Some(&ValidationError::DuplicateBooking {
                user_id: 1,
                objective_id: 1
            })
        );
        assert_eq!(snapshot(&repo), before);
        Ok(())
    }

    #[test]
    fn failed_booking_persist_rolls_back() -> Result<()> {
        let (_dir, mut repo) = seeded()?;
        let before = snapshot(&repo);
        repo.store().fail_writes(true);

        let err = create_booking(&mut repo, &request(1, 1, TODAY), date(TODAY)).unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(snapshot(&repo), before);
        assert_eq!(repo.next_booking_id(), Some(4));
        Ok(())
    }

    #[test]
    fn rollback_after_partial_persist_restores_memory() -> Result<()> {
        let (_dir, mut repo) = seeded()?;
        let before = snapshot(&repo);
        repo.store().fail_writes_to("objectives");

        let err = create_booking(&mut repo, &request(2, 3, TODAY), date(TODAY)).unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(snapshot(&repo), before);
        assert_eq!(repo.store().writes(), vec!["bookings"]);
        Ok(())
    }

    #[test]
    fn cancel_releases_objective() -> Result<()> {
        let (_dir, mut repo) = seeded()?;
        let booking = create_booking(&mut repo, &request(1, 3, "2025-06-01"), date(TODAY))?;

        let cancelled = cancel_booking(&mut repo, booking.id)?;
        assert_eq!(cancelled, booking);
        assert!(repo.find_booking_by_id(booking.id).is_none());
        assert!(repo.find_objective_by_id(3).unwrap().is_available());
        let bookings = fs::read_to_string(repo.store().inner().bookings_path())?;
        assert!(!bookings.contains("2025-06-01"));
        assert_eq!(repo.next_booking_id(), Some(5));
        Ok(())
    }

    #[test]
    fn cancel_orphaned_booking_succeeds() -> Result<()> {
        let (_dir, mut repo) = seeded()?;
        let objectives = repo.objectives().to_vec();

        cancel_booking(&mut repo, 3)?;
        assert!(repo.find_booking_by_id(3).is_none());
        assert_eq!(repo.objectives(), objectives.as_slice());
        Ok(())
    }

    #[test]
    fn cancel_unknown_booking_is_rejected() -> Result<()> {
        let (_dir, mut repo) = seeded()?;
        let before = snapshot(&repo);
        let err = cancel_booking(&mut repo, 2).unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::BookingNotFound(2)));
        assert_eq!(snapshot(&repo), before);
        Ok(())
    }

    #[test]
    fn failed_cancel_persist_restores_position_and_flag() -> Result<()> {
        let (_dir, mut repo) = seeded()?;
        let before = snapshot(&repo);
        repo.store().fail_writes(true);

        let err = cancel_booking(&mut repo, 1).unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(snapshot(&repo), before);
        assert!(!repo.find_objective_by_id(2).unwrap().is_available());
        Ok(())
    }

    #[test]
    fn add_user_assigns_next_id_and_trims() -> Result<()> {
        let (_dir, mut repo) = seeded()?;
        let user = add_user(
            &mut repo,
            &NewUser {
                first_name: " Grace ".into(),
                last_name: "Hopper".into(),
                email: " grace@example.com ".into(),
            },
        )?;

        assert_eq!(user.id, 3);
        assert_eq!(user.first_name, "Grace");
        assert_eq!(user.email, "grace@example.com");
        let users = fs::read_to_string(repo.store().inner().users_path())?;
        assert!(users.ends_with("3;Grace;Hopper;grace@example.com\n"));
        Ok(())
    }

    #[test]
    fn add_user_rejects_duplicate_email_and_separators() -> Result<()> {
        let (_dir, mut repo) = seeded()?;
        let before = snapshot(&repo);

        let err = add_user(
            &mut repo,
            &NewUser {
                first_name: "Ada".into(),
                last_name: "Again".into(),
                email: "ADA@example.com ".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::DuplicateEmail(_))
        ));

        let err = add_user(
            &mut repo,
            &NewUser {
                first_name: "Semi;colon".into(),
                last_name: "User".into(),
                email: "semi@example.com".into(),
            },
        )
        .unwrap_err();
        assert_eq!(
            err.as_validation(),
            Some(&ValidationError::ReservedCharacter {
                field: "first name"
            })
        );

        assert_eq!(snapshot(&repo), before);
        Ok(())
    }

    #[test]
    fn failed_user_persist_rolls_back() -> Result<()> {
        let (_dir, mut repo) = seeded()?;
        let before = snapshot(&repo);
        repo.store().fail_writes(true);

        let err = add_user(
            &mut repo,
            &NewUser {
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                email: "grace@example.com".into(),
            },
        )
        .unwrap_err();
        assert!(err.is_persistence());
        assert_eq!(snapshot(&repo), before);
        assert_eq!(repo.next_user_id(), Some(3));
        Ok(())
    }

    #[test]
    fn exhausted_id_space_is_rejected_before_mutation() -> Result<()> {
        let dir = tempdir()?;
        let store = ScriptedStore::new(dir.path());
        store.seed(
            "id;first_name;last_name;email\n4294967295;Ada;Lovelace;ada@example.com\n",
            "id;title;period;coins;available\n1;Read a book;weekly;10;YES\n",
            "id;user_id;objective_id;date\n4294967295;4294967295;7;2025-05-01\n",
        )?;
        let mut repo = Repository::new(store);
        repo.load_all()?;
        let before = snapshot(&repo);
        assert_eq!(repo.next_user_id(), None);

        let err = add_user(
            &mut repo,
            &NewUser {
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                email: "grace@example.com".into(),
            },
        )
        .unwrap_err();
        assert_eq!(
            err.as_validation(),
            Some(&ValidationError::IdSpaceExhausted { kind: "user" })
        );

        let err =
            create_booking(&mut repo, &request(u32::MAX, 1, TODAY), date(TODAY)).unwrap_err();
        assert_eq!(
            err.as_validation(),
            Some(&ValidationError::IdSpaceExhausted { kind: "booking" })
        );

        assert_eq!(snapshot(&repo), before);
        assert!(repo.store().writes().is_empty());
        Ok(())
    }

    #[test]
    fn export_reflects_current_availability() -> Result<()> {
        let (dir, mut repo) = seeded()?;
        create_booking(&mut repo, &request(1, 1, TODAY), date(TODAY))?;

        let path = export_available(&repo, date(TODAY))?;
        assert_eq!(
            path,
            dir.path()
                .join("exports")
                .join("available_objectives_2025-05-10.csv")
        );
        assert_eq!(
            fs::read_to_string(path)?,
            "id;title;period;coins\n3;Meditate;daily;5\n"
        );
        Ok(())
    }
}

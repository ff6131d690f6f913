use std::sync::Arc;

use crate::errors::PersistenceError;
use crate::models::{Booking, BookingInput, BookingPatch, BookingStatus, Mechanic, ShiftsByMechanic};
use crate::services::store::BookingStore;

#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("booking time is outside every shift of mechanic {mechanic_id}")]
    OutsideShift { mechanic_id: String },

    /// The mechanic record itself does not exist. A known mechanic with no
    /// covering shift, or absent from the shift mapping, is `OutsideShift`.
    #[error("mechanic not found: {0}")]
    MechanicNotFound(String),

    #[error("booking not found: {0}")]
    BookingNotFound(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot move booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("booking not found: {0}")]
    BookingNotFound(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// How status updates are checked before they are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Any status may replace any other.
    #[default]
    Permissive,
    /// Only Pending -> Confirmed/Cancelled and Confirmed -> Completed/Cancelled.
    Strict,
}

/// True iff some shift of `mechanic_id` covers the booking's scheduled time.
/// A mechanic missing from the mapping has no shifts.
pub fn can_assign(booking: &Booking, mechanic_id: &str, shifts: &ShiftsByMechanic) -> bool {
    shifts
        .get(mechanic_id)
        .map(|list| list.iter().any(|s| s.covers(&booking.scheduled_time)))
        .unwrap_or(false)
}

pub fn assign_mechanic(
    booking: &Booking,
    mechanic_id: &str,
    shifts: &ShiftsByMechanic,
) -> Result<Booking, AssignmentError> {
    if !can_assign(booking, mechanic_id, shifts) {
        return Err(AssignmentError::OutsideShift {
            mechanic_id: mechanic_id.to_string(),
        });
    }
    let mut updated = booking.clone();
    updated.mechanic_id = Some(mechanic_id.to_string());
    Ok(updated)
}

pub fn transition_status(
    booking: &Booking,
    new_status: BookingStatus,
    policy: TransitionPolicy,
) -> Result<Booking, TransitionError> {
    if policy == TransitionPolicy::Strict && !booking.status.can_transition_to(new_status) {
        return Err(TransitionError::InvalidTransition {
            from: booking.status,
            to: new_status,
        });
    }
    let mut updated = booking.clone();
    updated.status = new_status;
    Ok(updated)
}

/// Fails with `Conflict` when the caller holds a revision other than the stored one.
fn check_revision(booking: &Booking, expected_revision: Option<i64>) -> Result<(), PersistenceError> {
    match expected_revision {
        Some(expected) if expected != booking.revision => Err(PersistenceError::Conflict {
            id: booking.id.clone(),
            expected,
        }),
        _ => Ok(()),
    }
}

/// Applies assignment and status rules to persisted bookings.
///
/// Every write goes through [`BookingStore::persist_booking_fields`] as a
/// single-field update guarded by the booking's revision. When the caller
/// passes no expected revision, the revision read at the start of the
/// operation is used, so a concurrent write in between still fails with
/// [`PersistenceError::Conflict`].
pub struct LifecycleManager {
    store: Arc<dyn BookingStore>,
    policy: TransitionPolicy,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn BookingStore>, policy: TransitionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &dyn BookingStore {
        self.store.as_ref()
    }

    pub async fn create_booking(&self, input: &BookingInput) -> Result<Booking, PersistenceError> {
        let booking = self.store.create_booking(input).await?;
        tracing::info!(
            booking_id = %booking.id,
            customer_id = %booking.customer_id,
            scheduled_time = %booking.scheduled_time,
            "booking created"
        );
        Ok(booking)
    }

    pub async fn assign_mechanic(
        &self,
        booking_id: &str,
        mechanic_id: &str,
        expected_revision: Option<i64>,
    ) -> Result<Booking, AssignmentError> {
        let booking = self
            .store
            .load_booking(booking_id)
            .await?
            .ok_or_else(|| AssignmentError::BookingNotFound(booking_id.to_string()))?;
        check_revision(&booking, expected_revision)?;

        if self.store.load_mechanic(mechanic_id).await?.is_none() {
            return Err(AssignmentError::MechanicNotFound(mechanic_id.to_string()));
        }

        let shifts = self
            .store
            .load_shifts_for_mechanics(&[mechanic_id.to_string()])
            .await?;

        let updated = match assign_mechanic(&booking, mechanic_id, &shifts) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(booking_id, mechanic_id, "assignment rejected: outside shift");
                return Err(e);
            }
        };

        if booking.mechanic_id == updated.mechanic_id {
            return Ok(booking);
        }

        let saved = self
            .store
            .persist_booking_fields(
                booking_id,
                &BookingPatch::mechanic(mechanic_id),
                Some(expected_revision.unwrap_or(booking.revision)),
            )
            .await?;

        tracing::info!(booking_id, mechanic_id, revision = saved.revision, "mechanic assigned");
        Ok(saved)
    }

    pub async fn transition_status(
        &self,
        booking_id: &str,
        new_status: BookingStatus,
        expected_revision: Option<i64>,
    ) -> Result<Booking, TransitionError> {
        let booking = self
            .store
            .load_booking(booking_id)
            .await?
            .ok_or_else(|| TransitionError::BookingNotFound(booking_id.to_string()))?;
        check_revision(&booking, expected_revision)?;

        let updated = transition_status(&booking, new_status, self.policy)?;
        if updated.status == booking.status {
            return Ok(booking);
        }

        if !booking.status.can_transition_to(new_status) {
            tracing::warn!(
                booking_id,
                from = %booking.status,
                to = %new_status,
                "status change skips the booking workflow"
            );
        }

        let saved = self
            .store
            .persist_booking_fields(
                booking_id,
                &BookingPatch::status(new_status),
                Some(expected_revision.unwrap_or(booking.revision)),
            )
            .await?;

        tracing::info!(
            booking_id,
            from = %booking.status,
            to = %saved.status,
            revision = saved.revision,
            "booking status updated"
        );
        Ok(saved)
    }

    /// Active mechanics with a shift covering the booking's scheduled time.
    pub async fn eligible_mechanics(&self, booking_id: &str) -> Result<Vec<Mechanic>, AssignmentError> {
        let booking = self
            .store
            .load_booking(booking_id)
            .await?
            .ok_or_else(|| AssignmentError::BookingNotFound(booking_id.to_string()))?;

        let mechanics: Vec<Mechanic> = self
            .store
            .load_mechanics()
            .await?
            .into_iter()
            .filter(|m| m.is_active)
            .collect();
        let ids: Vec<String> = mechanics.iter().map(|m| m.id.clone()).collect();
        let shifts = self.store.load_shifts_for_mechanics(&ids).await?;

        Ok(mechanics
            .into_iter()
            .filter(|m| can_assign(&booking, &m.id, &shifts))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::db::{self, queries};
    use crate::models::{Shift, Vehicle};
    use crate::services::store::SqliteStore;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn booking_at(s: &str) -> Booking {
        Booking {
            id: "b-1".to_string(),
            customer_id: "c-1".to_string(),
            mechanic_id: None,
            vehicle: Vehicle {
                make: "Toyota".to_string(),
                model: "Corolla".to_string(),
                year: 2018,
            },
            service_type: "Oil Change".to_string(),
            scheduled_time: at(s),
            notes: None,
            status: BookingStatus::Pending,
            revision: 0,
            created_at: at("2025-05-20T12:00:00Z"),
            updated_at: at("2025-05-20T12:00:00Z"),
        }
    }

    fn day_shift() -> ShiftsByMechanic {
        let mut shifts = HashMap::new();
        shifts.insert(
            "m-1".to_string(),
            vec![Shift {
                id: "s-1".to_string(),
                mechanic_id: "m-1".to_string(),
                start: at("2025-06-01T09:00:00Z"),
                end: at("2025-06-01T17:00:00Z"),
            }],
        );
        shifts
    }

    #[test]
    fn test_can_assign_within_shift() {
        assert!(can_assign(&booking_at("2025-06-01T10:30:00Z"), "m-1", &day_shift()));
    }

    #[test]
    fn test_can_assign_after_shift() {
        assert!(!can_assign(&booking_at("2025-06-01T18:00:00Z"), "m-1", &day_shift()));
    }

    #[test]
    fn test_can_assign_at_shift_boundaries() {
        assert!(can_assign(&booking_at("2025-06-01T09:00:00Z"), "m-1", &day_shift()));
        assert!(can_assign(&booking_at("2025-06-01T17:00:00Z"), "m-1", &day_shift()));
    }

    #[test]
    fn test_can_assign_unknown_mechanic() {
        assert!(!can_assign(&booking_at("2025-06-01T10:30:00Z"), "m-404", &day_shift()));
    }

    #[test]
    fn test_can_assign_empty_shift_list() {
        let mut shifts = ShiftsByMechanic::new();
        shifts.insert("m-1".to_string(), vec![]);
        assert!(!can_assign(&booking_at("2025-06-01T10:30:00Z"), "m-1", &shifts));
    }

    #[test]
    fn test_can_assign_any_of_several_shifts() {
        let mut shifts = day_shift();
        shifts.get_mut("m-1").unwrap().push(Shift {
            id: "s-2".to_string(),
            mechanic_id: "m-1".to_string(),
            start: at("2025-06-02T13:00:00Z"),
            end: at("2025-06-02T21:00:00Z"),
        });
        assert!(can_assign(&booking_at("2025-06-02T20:00:00Z"), "m-1", &shifts));
        assert!(!can_assign(&booking_at("2025-06-02T10:00:00Z"), "m-1", &shifts));
    }

    #[test]
    fn test_can_assign_ignores_inverted_shift() {
        let mut shifts = ShiftsByMechanic::new();
        shifts.insert(
            "m-1".to_string(),
            vec![Shift {
                id: "s-1".to_string(),
                mechanic_id: "m-1".to_string(),
                start: at("2025-06-01T17:00:00Z"),
                end: at("2025-06-01T09:00:00Z"),
            }],
        );
        assert!(!can_assign(&booking_at("2025-06-01T12:00:00Z"), "m-1", &shifts));
    }

    #[test]
    fn test_can_assign_compares_instants_across_offsets() {
        let booking = Booking {
            scheduled_time: DateTime::parse_from_rfc3339("2025-06-01T11:30:00+02:00")
                .unwrap()
                .with_timezone(&Utc),
            ..booking_at("2025-06-01T00:00:00Z")
        };
        assert!(can_assign(&booking, "m-1", &day_shift()));
    }

    #[test]
    fn test_assign_mechanic_outside_shift_leaves_booking() {
        let booking = booking_at("2025-06-01T18:00:00Z");
        let err = assign_mechanic(&booking, "m-1", &day_shift()).unwrap_err();
        assert!(matches!(err, AssignmentError::OutsideShift { .. }));
        assert_eq!(booking.mechanic_id, None);
    }

    #[test]
    fn test_assign_mechanic_is_idempotent() {
        let booking = booking_at("2025-06-01T10:30:00Z");
        let once = assign_mechanic(&booking, "m-1", &day_shift()).unwrap();
        let twice = assign_mechanic(&once, "m-1", &day_shift()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.mechanic_id.as_deref(), Some("m-1"));
        assert_eq!(twice.status, BookingStatus::Pending);
    }

    #[test]
    fn test_transition_permissive_allows_anything() {
        let mut booking = booking_at("2025-06-01T10:30:00Z");
        booking.status = BookingStatus::Cancelled;
        let updated =
            transition_status(&booking, BookingStatus::Pending, TransitionPolicy::Permissive).unwrap();
        assert_eq!(updated.status, BookingStatus::Pending);
    }

    #[test]
    fn test_transition_strict_rejects_skipping_confirmation() {
        let booking = booking_at("2025-06-01T10:30:00Z");
        let err = transition_status(&booking, BookingStatus::Completed, TransitionPolicy::Strict)
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::InvalidTransition {
                from: BookingStatus::Pending,
                to: BookingStatus::Completed
            }
        ));
    }

    #[test]
    fn test_transition_strict_follows_workflow() {
        let booking = booking_at("2025-06-01T10:30:00Z");
        let confirmed =
            transition_status(&booking, BookingStatus::Confirmed, TransitionPolicy::Strict).unwrap();
        let completed =
            transition_status(&confirmed, BookingStatus::Completed, TransitionPolicy::Strict).unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);
    }

    // ── LifecycleManager against SQLite ──

    fn seeded_manager(policy: TransitionPolicy) -> (LifecycleManager, Arc<std::sync::Mutex<rusqlite::Connection>>) {
        let conn = db::init_db(":memory:").unwrap();
        queries::insert_customer(&conn, &crate::models::Customer {
            customer_id: "c-1".to_string(),
            first_name: "Sam".to_string(),
            last_name: "Driver".to_string(),
            email: "sam@example.com".to_string(),
            phone: None,
            date_of_birth: None,
            is_active: true,
        })
        .unwrap();
        for (id, active) in [("m-1", true), ("m-2", true), ("m-3", false)] {
            queries::insert_mechanic(&conn, &Mechanic {
                id: id.to_string(),
                name: format!("Mechanic {id}"),
                email: format!("{id}@garage.test"),
                specialization: None,
                is_active: active,
            })
            .unwrap();
        }
        for (id, mech) in [("s-1", "m-1"), ("s-3", "m-3")] {
            queries::insert_shift(&conn, &Shift {
                id: id.to_string(),
                mechanic_id: mech.to_string(),
                start: at("2025-06-01T09:00:00Z"),
                end: at("2025-06-01T17:00:00Z"),
            })
            .unwrap();
        }
        let db = Arc::new(std::sync::Mutex::new(conn));
        let store = Arc::new(SqliteStore::new(db.clone()));
        (LifecycleManager::new(store, policy), db)
    }

    fn input_at(s: &str) -> BookingInput {
        BookingInput {
            customer_id: "c-1".to_string(),
            vehicle: Vehicle {
                make: "Honda".to_string(),
                model: "Civic".to_string(),
                year: 2020,
            },
            service_type: "Brake Inspection".to_string(),
            scheduled_time: at(s),
            notes: Some("squeaky brakes".to_string()),
        }
    }

    #[tokio::test]
    async fn test_manager_assigns_within_shift() {
        let (manager, _) = seeded_manager(TransitionPolicy::Permissive);
        let booking = manager.create_booking(&input_at("2025-06-01T10:30:00Z")).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);

        let saved = manager.assign_mechanic(&booking.id, "m-1", None).await.unwrap();
        assert_eq!(saved.mechanic_id.as_deref(), Some("m-1"));
        assert_eq!(saved.status, BookingStatus::Pending);
        assert_eq!(saved.revision, booking.revision + 1);
    }

    #[tokio::test]
    async fn test_manager_rejects_outside_shift_without_writing() {
        let (manager, _) = seeded_manager(TransitionPolicy::Permissive);
        let booking = manager.create_booking(&input_at("2025-06-01T18:00:00Z")).await.unwrap();

        let err = manager.assign_mechanic(&booking.id, "m-1", None).await.unwrap_err();
        assert!(matches!(err, AssignmentError::OutsideShift { .. }));

        let stored = manager.store().load_booking(&booking.id).await.unwrap().unwrap();
        assert_eq!(stored.mechanic_id, None);
        assert_eq!(stored.revision, booking.revision);
    }

    #[tokio::test]
    async fn test_manager_mechanic_without_shifts() {
        let (manager, _) = seeded_manager(TransitionPolicy::Permissive);
        let booking = manager.create_booking(&input_at("2025-06-01T10:30:00Z")).await.unwrap();
        let err = manager.assign_mechanic(&booking.id, "m-2", None).await.unwrap_err();
        assert!(matches!(err, AssignmentError::OutsideShift { .. }));
    }

    #[tokio::test]
    async fn test_manager_unknown_mechanic() {
        let (manager, _) = seeded_manager(TransitionPolicy::Permissive);
        let booking = manager.create_booking(&input_at("2025-06-01T10:30:00Z")).await.unwrap();
        let err = manager.assign_mechanic(&booking.id, "m-404", None).await.unwrap_err();
        assert!(matches!(err, AssignmentError::MechanicNotFound(_)));
    }

    #[tokio::test]
    async fn test_manager_assignment_is_idempotent() {
        let (manager, _) = seeded_manager(TransitionPolicy::Permissive);
        let booking = manager.create_booking(&input_at("2025-06-01T10:30:00Z")).await.unwrap();
        let first = manager.assign_mechanic(&booking.id, "m-1", None).await.unwrap();
        let second = manager.assign_mechanic(&booking.id, "m-1", None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_manager_stale_revision_conflicts() {
        let (manager, _) = seeded_manager(TransitionPolicy::Permissive);
        let booking = manager.create_booking(&input_at("2025-06-01T10:30:00Z")).await.unwrap();

        // A status change lands first and bumps the revision.
        manager
            .transition_status(&booking.id, BookingStatus::Confirmed, Some(booking.revision))
            .await
            .unwrap();

        let err = manager
            .assign_mechanic(&booking.id, "m-1", Some(booking.revision))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AssignmentError::Persistence(PersistenceError::Conflict { .. })
        ));

        let stored = manager.store().load_booking(&booking.id).await.unwrap().unwrap();
        assert_eq!(stored.mechanic_id, None);
        assert_eq!(stored.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_manager_stale_revision_conflicts_even_when_nothing_changes() {
        let (manager, _) = seeded_manager(TransitionPolicy::Permissive);
        let booking = manager.create_booking(&input_at("2025-06-01T10:30:00Z")).await.unwrap();
        let assigned = manager.assign_mechanic(&booking.id, "m-1", Some(0)).await.unwrap();
        let cancelled = manager
            .transition_status(&booking.id, BookingStatus::Cancelled, Some(assigned.revision))
            .await
            .unwrap();
        assert_eq!(cancelled.revision, 2);

        let err = manager
            .assign_mechanic(&booking.id, "m-1", Some(0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AssignmentError::Persistence(PersistenceError::Conflict { expected: 0, .. })
        ));

        let err = manager
            .transition_status(&booking.id, BookingStatus::Cancelled, Some(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::Persistence(PersistenceError::Conflict { expected: 1, .. })
        ));

        // The current revision still takes the no-op path without a write.
        let same = manager
            .transition_status(&booking.id, BookingStatus::Cancelled, Some(2))
            .await
            .unwrap();
        assert_eq!(same.revision, 2);
    }

    #[tokio::test]
    async fn test_manager_malformed_shift_bound_is_an_error() {
        let (manager, db) = seeded_manager(TransitionPolicy::Permissive);
        let booking = manager.create_booking(&input_at("2025-06-01T10:30:00Z")).await.unwrap();
        db.lock()
            .unwrap()
            .execute("UPDATE shifts SET start_time = 'garbage' WHERE id = 's-1'", [])
            .unwrap();

        let err = manager.assign_mechanic(&booking.id, "m-1", None).await.unwrap_err();
        assert!(matches!(
            err,
            AssignmentError::Persistence(PersistenceError::Malformed(_))
        ));

        let stored = manager.store().load_booking(&booking.id).await.unwrap().unwrap();
        assert_eq!(stored.mechanic_id, None);
    }

    #[tokio::test]
    async fn test_manager_strict_policy() {
        let (manager, _) = seeded_manager(TransitionPolicy::Strict);
        let booking = manager.create_booking(&input_at("2025-06-01T10:30:00Z")).await.unwrap();

        let err = manager
            .transition_status(&booking.id, BookingStatus::Completed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));

        manager.transition_status(&booking.id, BookingStatus::Confirmed, None).await.unwrap();
        let done = manager
            .transition_status(&booking.id, BookingStatus::Completed, None)
            .await
            .unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
    }

    #[tokio::test]
    async fn test_manager_missing_booking() {
        let (manager, _) = seeded_manager(TransitionPolicy::Permissive);
        let err = manager
            .transition_status("nope", BookingStatus::Confirmed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::BookingNotFound(_)));
    }

    #[tokio::test]
    async fn test_eligible_mechanics_skips_inactive() {
        let (manager, _) = seeded_manager(TransitionPolicy::Permissive);
        let booking = manager.create_booking(&input_at("2025-06-01T12:00:00Z")).await.unwrap();
        let eligible = manager.eligible_mechanics(&booking.id).await.unwrap();
        let ids: Vec<&str> = eligible.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m-1"]);
    }

    // ── Failure propagation ──

    struct FailingStore {
        writes: Mutex<usize>,
        booking: Booking,
    }

    #[async_trait]
    impl BookingStore for FailingStore {
        async fn load_shifts_for_mechanics(
            &self,
            _mechanic_ids: &[String],
        ) -> Result<ShiftsByMechanic, PersistenceError> {
            Ok(day_shift())
        }
        async fn load_all_bookings(&self) -> Result<Vec<Booking>, PersistenceError> {
            Ok(vec![self.booking.clone()])
        }
        async fn load_bookings_for_customer(&self, _id: &str) -> Result<Vec<Booking>, PersistenceError> {
            Ok(vec![])
        }
        async fn load_bookings_for_mechanic(&self, _id: &str) -> Result<Vec<Booking>, PersistenceError> {
            Ok(vec![])
        }
        async fn load_booking(&self, _id: &str) -> Result<Option<Booking>, PersistenceError> {
            Ok(Some(self.booking.clone()))
        }
        async fn load_mechanic(&self, id: &str) -> Result<Option<Mechanic>, PersistenceError> {
            Ok(Some(Mechanic {
                id: id.to_string(),
                name: "Rita".to_string(),
                email: "rita@garage.test".to_string(),
                specialization: None,
                is_active: true,
            }))
        }
        async fn load_mechanics(&self) -> Result<Vec<Mechanic>, PersistenceError> {
            Ok(vec![])
        }
        async fn persist_booking_fields(
            &self,
            _id: &str,
            _patch: &BookingPatch,
            _expected_revision: Option<i64>,
        ) -> Result<Booking, PersistenceError> {
            *self.writes.lock().unwrap() += 1;
            Err(PersistenceError::Malformed("store offline".to_string()))
        }
        async fn create_booking(&self, _input: &BookingInput) -> Result<Booking, PersistenceError> {
            Err(PersistenceError::Malformed("store offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_propagates_once() {
        let store = Arc::new(FailingStore {
            writes: Mutex::new(0),
            booking: booking_at("2025-06-01T10:30:00Z"),
        });
        let manager = LifecycleManager::new(store.clone(), TransitionPolicy::Permissive);

        let err = manager.assign_mechanic("b-1", "m-1", None).await.unwrap_err();
        assert!(matches!(err, AssignmentError::Persistence(_)));
        assert_eq!(*store.writes.lock().unwrap(), 1);
    }
}

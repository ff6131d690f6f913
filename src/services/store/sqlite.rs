use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;

use super::BookingStore;
use crate::db::queries::{self, BookingFilter};
use crate::errors::PersistenceError;
use crate::models::{Booking, BookingInput, BookingPatch, BookingStatus, Mechanic, ShiftsByMechanic};

/// [`BookingStore`] over the shared SQLite connection.
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves SQLite itself consistent.
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BookingStore for SqliteStore {
    async fn load_shifts_for_mechanics(
        &self,
        mechanic_ids: &[String],
    ) -> Result<ShiftsByMechanic, PersistenceError> {
        queries::get_shifts_for_mechanics(&self.conn(), mechanic_ids)
    }

    async fn load_all_bookings(&self) -> Result<Vec<Booking>, PersistenceError> {
        queries::get_bookings(&self.conn(), BookingFilter::All)
    }

    async fn load_bookings_for_customer(&self, customer_id: &str) -> Result<Vec<Booking>, PersistenceError> {
        queries::get_bookings(&self.conn(), BookingFilter::Customer(customer_id))
    }

    async fn load_bookings_for_mechanic(&self, mechanic_id: &str) -> Result<Vec<Booking>, PersistenceError> {
        queries::get_bookings(&self.conn(), BookingFilter::Mechanic(mechanic_id))
    }

    async fn load_booking(&self, booking_id: &str) -> Result<Option<Booking>, PersistenceError> {
        queries::get_booking_by_id(&self.conn(), booking_id)
    }

    async fn load_mechanic(&self, mechanic_id: &str) -> Result<Option<Mechanic>, PersistenceError> {
        queries::get_mechanic(&self.conn(), mechanic_id)
    }

    async fn load_mechanics(&self) -> Result<Vec<Mechanic>, PersistenceError> {
        queries::list_mechanics(&self.conn())
    }

    async fn persist_booking_fields(
        &self,
        booking_id: &str,
        patch: &BookingPatch,
        expected_revision: Option<i64>,
    ) -> Result<Booking, PersistenceError> {
        queries::update_booking_fields(&self.conn(), booking_id, patch, expected_revision)
    }

    async fn create_booking(&self, input: &BookingInput) -> Result<Booking, PersistenceError> {
        let conn = self.conn();
        if queries::get_customer(&conn, &input.customer_id)?.is_none() {
            return Err(PersistenceError::NotFound(format!(
                "customer {}",
                input.customer_id
            )));
        }

        let now = Utc::now();
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: input.customer_id.clone(),
            mechanic_id: None,
            vehicle: input.vehicle.clone(),
            service_type: input.service_type.clone(),
            scheduled_time: input.scheduled_time,
            notes: input.notes.clone(),
            status: BookingStatus::Pending,
            revision: 0,
            created_at: now,
            updated_at: now,
        };
        queries::insert_booking(&conn, &booking)?;
        Ok(booking)
    }
}

pub mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::errors::PersistenceError;
use crate::models::{Booking, BookingInput, BookingPatch, Mechanic, ShiftsByMechanic};

/// Data access the lifecycle manager depends on.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn load_shifts_for_mechanics(
        &self,
        mechanic_ids: &[String],
    ) -> Result<ShiftsByMechanic, PersistenceError>;

    async fn load_all_bookings(&self) -> Result<Vec<Booking>, PersistenceError>;

    async fn load_bookings_for_customer(&self, customer_id: &str) -> Result<Vec<Booking>, PersistenceError>;

    async fn load_bookings_for_mechanic(&self, mechanic_id: &str) -> Result<Vec<Booking>, PersistenceError>;

    async fn load_booking(&self, booking_id: &str) -> Result<Option<Booking>, PersistenceError>;

    async fn load_mechanic(&self, mechanic_id: &str) -> Result<Option<Mechanic>, PersistenceError>;

    async fn load_mechanics(&self) -> Result<Vec<Mechanic>, PersistenceError>;

    /// Writes only the fields set in `patch`. With `expected_revision`, the
    /// write fails with [`PersistenceError::Conflict`] unless the stored
    /// revision still matches.
    async fn persist_booking_fields(
        &self,
        booking_id: &str,
        patch: &BookingPatch,
        expected_revision: Option<i64>,
    ) -> Result<Booking, PersistenceError>;

    /// Stores a new booking with status Pending and revision 0.
    async fn create_booking(&self, input: &BookingInput) -> Result<Booking, PersistenceError>;
}

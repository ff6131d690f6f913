pub mod booking;
pub mod customer;
pub mod inventory;
pub mod invoice;
pub mod mechanic;
pub mod money;

pub use booking::{Booking, BookingInput, BookingPatch, BookingStatus, Vehicle};
pub use customer::{Customer, CustomerRegistration, CustomerUpdate};
pub use inventory::{InventoryItem, NewInventoryItem};
pub use invoice::{Invoice, LaborCharge, PartLine, PaymentStatus};
pub use mechanic::{Mechanic, Shift, ShiftsByMechanic};
pub use money::Money;

// models/src/lib.rs
// Shared record types for the lab booking workspace.

pub mod errors;
pub mod identifiers;
pub mod medical;

pub use errors::{ValidationError, ValidationResult};
pub use identifiers::{BookingCode, RecordId};
pub use medical::{
    Booking, BookingUpdate, Identity, IdentityKind, MedicalTest, Role, TestResult,
};

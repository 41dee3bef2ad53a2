// models/src/medical/mod.rs

pub mod booking;
pub mod identity;

pub use booking::{round_to_cents, Booking, BookingUpdate, TestResult};
pub use identity::{
    normalize_email, ContactView, Identity, IdentityBase, IdentityKind, IdentityView,
    PatientProfile, Role, StaffProfile,
};
pub use medical_test::{
    MedicalTest, MedicalTestPatch, MedicalTestSummary, NewMedicalTest, NormalRange, ResultFlag,
};

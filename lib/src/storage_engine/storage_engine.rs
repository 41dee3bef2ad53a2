// lib/src/storage_engine/storage_engine.rs

use async_trait::async_trait;

use models::identifiers::{BookingCode, RecordId};
use models::medical::{Booking, Identity, MedicalTest, Role};

use crate::config::StorageEngineType;
use crate::errors::Result;

/// Read-modify-write callback applied atomically by the storage engines.
/// It may run more than once when a concurrent writer wins the race, so it
/// must not have side effects beyond the record it is handed.
pub type Mutation<'a, T> = &'a (dyn Fn(&mut T) -> Result<()> + Send + Sync);

#[async_trait]
pub trait IdentityStorageEngine: Send + Sync + 'static {
    /// Adds a new identity. Fails with `Conflict` when a staff record already
    /// uses the same email.
    async fn add_identity(&self, identity: &Identity) -> Result<()>;
    async fn get_identity(&self, id: &RecordId) -> Result<Option<Identity>>;
    async fn get_staff_by_email(&self, email: &str) -> Result<Option<Identity>>;
    /// Retrieves the staff record holding the given reset token digest.
    async fn get_staff_by_reset_token(&self, token_hash: &str) -> Result<Option<Identity>>;
    /// Lists identities whose role is in `roles`, oldest first.
    async fn list_identities(&self, roles: &[Role]) -> Result<Vec<Identity>>;
    /// Atomically applies `mutation`. Staff emails are immutable.
    async fn update_identity(&self, id: &RecordId, mutation: Mutation<'_, Identity>) -> Result<Identity>;
}

#[async_trait]
pub trait CatalogStorageEngine: Send + Sync + 'static {
    /// Fails with `Conflict` when the title (case-insensitive) is taken.
    async fn add_medical_test(&self, test: &MedicalTest) -> Result<()>;
    async fn get_medical_test(&self, id: &RecordId) -> Result<Option<MedicalTest>>;
    async fn list_medical_tests(&self) -> Result<Vec<MedicalTest>>;
    /// Atomically applies `mutation`, re-indexing the title when it changes.
    async fn update_medical_test(
        &self,
        id: &RecordId,
        mutation: Mutation<'_, MedicalTest>,
    ) -> Result<MedicalTest>;
    async fn delete_medical_test(&self, id: &RecordId) -> Result<Option<MedicalTest>>;
}

/// Filter for booking listings; `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub patient_id: Option<RecordId>,
    pub doctor_id: Option<RecordId>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.patient_id.map_or(true, |id| booking.patient_id == id)
            && self.doctor_id.map_or(true, |id| booking.doctor_id == Some(id))
    }
}

#[async_trait]
pub trait BookingStorageEngine: Send + Sync + 'static {
    /// Fails with `Conflict` when the booking code is already taken.
    async fn add_booking(&self, booking: &Booking) -> Result<()>;
    async fn get_booking(&self, id: &RecordId) -> Result<Option<Booking>>;
    async fn get_booking_by_code(&self, code: &BookingCode) -> Result<Option<Booking>>;
    /// Bookings matching `filter`, newest first.
    async fn find_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>>;
    /// Atomically applies `mutation`. Booking codes are immutable.
    async fn update_booking(&self, id: &RecordId, mutation: Mutation<'_, Booking>) -> Result<Booking>;
    async fn delete_booking(&self, id: &RecordId) -> Result<Option<Booking>>;
}

/// The complete persistence surface used by the services.
#[async_trait]
pub trait LabStorageEngine: IdentityStorageEngine + CatalogStorageEngine + BookingStorageEngine {
    fn get_type(&self) -> StorageEngineType;
    /// Persists buffered writes; called on shutdown.
    async fn flush(&self) -> Result<()>;
}

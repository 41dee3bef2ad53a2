// lib/src/storage_engine/inmemory_storage.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use models::identifiers::{BookingCode, RecordId};
use models::medical::{normalize_email, Booking, Identity, MedicalTest, Role};

use super::storage_engine::{
    BookingFilter, BookingStorageEngine, CatalogStorageEngine, IdentityStorageEngine,
    LabStorageEngine, Mutation,
};
use crate::config::StorageEngineType;
use crate::errors::{LabError, Result};

#[derive(Debug, Default)]
struct Collections {
    identities: HashMap<RecordId, Identity>,
    staff_emails: HashMap<String, RecordId>,
    medical_tests: HashMap<RecordId, MedicalTest>,
    test_titles: HashMap<String, RecordId>,
    bookings: HashMap<RecordId, Booking>,
    booking_codes: HashMap<BookingCode, RecordId>,
}

/// Volatile storage used by tests and `--storage-engine inmemory`. A single
/// write lock covers all collections, so index checks and record writes are
/// always applied together.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorage {
    collections: Arc<RwLock<Collections>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStorageEngine for InMemoryStorage {
    async fn add_identity(&self, identity: &Identity) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(email) = identity.staff_email() {
            if collections.staff_emails.contains_key(email) {
                return Err(LabError::Conflict(format!("Email {} is already registered", email)));
            }
            collections.staff_emails.insert(email.to_string(), identity.id());
        }
        collections.identities.insert(identity.id(), identity.clone());
        Ok(())
    }

    async fn get_identity(&self, id: &RecordId) -> Result<Option<Identity>> {
        Ok(self.collections.read().await.identities.get(id).cloned())
    }

    async fn get_staff_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let collections = self.collections.read().await;
        Ok(collections
            .staff_emails
            .get(&normalize_email(email))
            .and_then(|id| collections.identities.get(id))
            .cloned())
    }

    async fn get_staff_by_reset_token(&self, token_hash: &str) -> Result<Option<Identity>> {
        let collections = self.collections.read().await;
        Ok(collections
            .identities
            .values()
            .find(|identity| {
                identity
                    .staff()
                    .and_then(|profile| profile.reset_token_hash.as_deref())
                    == Some(token_hash)
            })
            .cloned())
    }

    async fn list_identities(&self, roles: &[Role]) -> Result<Vec<Identity>> {
        let collections = self.collections.read().await;
        let mut identities: Vec<Identity> = collections
            .identities
            .values()
            .filter(|identity| roles.contains(&identity.role()))
            .cloned()
            .collect();
        identities.sort_by_key(|identity| identity.base.created_at);
        Ok(identities)
    }

    async fn update_identity(&self, id: &RecordId, mutation: Mutation<'_, Identity>) -> Result<Identity> {
        let mut collections = self.collections.write().await;
        let current = collections
            .identities
            .get(id)
            .ok_or_else(|| LabError::NotFound(format!("Identity {} not found", id)))?;
        let mut record = current.clone();
        mutation(&mut record)?;
        if record.staff_email() != current.staff_email() {
            return Err(LabError::InvalidInput("Staff email cannot be changed".to_string()));
        }
        collections.identities.insert(*id, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl CatalogStorageEngine for InMemoryStorage {
    async fn add_medical_test(&self, test: &MedicalTest) -> Result<()> {
        let mut collections = self.collections.write().await;
        let title_key = MedicalTest::title_key(&test.title);
        if collections.test_titles.contains_key(&title_key) {
            return Err(LabError::Conflict(format!("Medical test '{}' already exists", test.title)));
        }
        collections.test_titles.insert(title_key, test.id);
        collections.medical_tests.insert(test.id, test.clone());
        Ok(())
    }

    async fn get_medical_test(&self, id: &RecordId) -> Result<Option<MedicalTest>> {
        Ok(self.collections.read().await.medical_tests.get(id).cloned())
    }

    async fn list_medical_tests(&self) -> Result<Vec<MedicalTest>> {
        let collections = self.collections.read().await;
        let mut tests: Vec<MedicalTest> = collections.medical_tests.values().cloned().collect();
        tests.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        Ok(tests)
    }

    async fn update_medical_test(
        &self,
        id: &RecordId,
        mutation: Mutation<'_, MedicalTest>,
    ) -> Result<MedicalTest> {
        let mut collections = self.collections.write().await;
        let mut record = collections
            .medical_tests
            .get(id)
            .cloned()
            .ok_or_else(|| LabError::NotFound(format!("Medical test {} not found", id)))?;
        let old_title = MedicalTest::title_key(&record.title);
        mutation(&mut record)?;
        let new_title = MedicalTest::title_key(&record.title);
        if new_title != old_title {
            if matches!(collections.test_titles.get(&new_title), Some(owner) if owner != id) {
                return Err(LabError::Conflict(format!(
                    "Medical test '{}' already exists",
                    record.title
                )));
            }
            collections.test_titles.remove(&old_title);
            collections.test_titles.insert(new_title, *id);
        }
        collections.medical_tests.insert(*id, record.clone());
        Ok(record)
    }

    async fn delete_medical_test(&self, id: &RecordId) -> Result<Option<MedicalTest>> {
        let mut collections = self.collections.write().await;
        let removed = collections.medical_tests.remove(id);
        if let Some(test) = &removed {
            collections.test_titles.remove(&MedicalTest::title_key(&test.title));
        }
        Ok(removed)
    }
}

#[async_trait]
impl BookingStorageEngine for InMemoryStorage {
    async fn add_booking(&self, booking: &Booking) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.booking_codes.contains_key(&booking.booking_code) {
            return Err(LabError::Conflict(format!(
                "Booking code {} is already in use",
                booking.booking_code
            )));
        }
        collections.booking_codes.insert(booking.booking_code.clone(), booking.id);
        collections.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: &RecordId) -> Result<Option<Booking>> {
        Ok(self.collections.read().await.bookings.get(id).cloned())
    }

    async fn get_booking_by_code(&self, code: &BookingCode) -> Result<Option<Booking>> {
        let collections = self.collections.read().await;
        Ok(collections
            .booking_codes
            .get(code)
            .and_then(|id| collections.bookings.get(id))
            .cloned())
    }

    async fn find_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
        let collections = self.collections.read().await;
        let mut bookings: Vec<Booking> = collections
            .bookings
            .values()
            .filter(|booking| filter.matches(booking))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn update_booking(&self, id: &RecordId, mutation: Mutation<'_, Booking>) -> Result<Booking> {
        let mut collections = self.collections.write().await;
        let current = collections
            .bookings
            .get(id)
            .ok_or_else(|| LabError::NotFound(format!("Booking {} not found", id)))?;
        let mut record = current.clone();
        mutation(&mut record)?;
        if record.booking_code != current.booking_code {
            return Err(LabError::InvalidInput("Booking code cannot be changed".to_string()));
        }
        collections.bookings.insert(*id, record.clone());
        Ok(record)
    }

    async fn delete_booking(&self, id: &RecordId) -> Result<Option<Booking>> {
        let mut collections = self.collections.write().await;
        let removed = collections.bookings.remove(id);
        if let Some(booking) = &removed {
            collections.booking_codes.remove(&booking.booking_code);
        }
        Ok(removed)
    }
}

#[async_trait]
impl LabStorageEngine for InMemoryStorage {
    fn get_type(&self) -> StorageEngineType {
        StorageEngineType::InMemory
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

// lib/src/storage_engine/sled_storage.rs
// Sled-backed collections. Every write that touches a unique index runs in a
// multi-tree transaction together with the record itself.

use std::path::Path;

use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult};
use sled::{Db, Transactional, Tree};
use tracing::debug;

use models::identifiers::{BookingCode, RecordId};
use models::medical::{normalize_email, Booking, Identity, MedicalTest, Role};

use crate::config::StorageEngineType;
use crate::errors::{LabError, Result};
use crate::storage_engine::storage_engine::{
    BookingFilter, BookingStorageEngine, CatalogStorageEngine, IdentityStorageEngine,
    LabStorageEngine, Mutation,
};
use crate::storage_engine::{decode_record, encode_record};

const IDENTITIES_TREE: &str = "identities";
const STAFF_EMAIL_INDEX: &str = "staff_email_index";
const MEDICAL_TESTS_TREE: &str = "medical_tests";
const TEST_TITLE_INDEX: &str = "medical_test_title_index";
const BOOKINGS_TREE: &str = "bookings";
const BOOKING_CODE_INDEX: &str = "booking_code_index";

pub struct SledStorage {
    db: Db,
    identities: Tree,
    staff_emails: Tree,
    medical_tests: Tree,
    test_titles: Tree,
    bookings: Tree,
    booking_codes: Tree,
}

impl SledStorage {
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A throwaway database removed when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> Result<Self> {
        Ok(Self {
            identities: db.open_tree(IDENTITIES_TREE)?,
            staff_emails: db.open_tree(STAFF_EMAIL_INDEX)?,
            medical_tests: db.open_tree(MEDICAL_TESTS_TREE)?,
            test_titles: db.open_tree(TEST_TITLE_INDEX)?,
            bookings: db.open_tree(BOOKINGS_TREE)?,
            booking_codes: db.open_tree(BOOKING_CODE_INDEX)?,
            db,
        })
    }

    fn get_record<T: serde::de::DeserializeOwned>(tree: &Tree, key: &[u8]) -> Result<Option<T>> {
        match tree.get(key)? {
            Some(bytes) => Ok(Some(decode_record(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: serde::de::DeserializeOwned>(tree: &Tree) -> Result<Vec<T>> {
        let mut records = Vec::with_capacity(tree.len());
        for item in tree.iter() {
            let (_key, value) = item?;
            records.push(decode_record(&value)?);
        }
        Ok(records)
    }
}

fn abort<T>(err: LabError) -> ConflictableTransactionResult<T, LabError> {
    Err(ConflictableTransactionError::Abort(err))
}

fn encode_tx<T: serde::Serialize>(record: &T) -> ConflictableTransactionResult<Vec<u8>, LabError> {
    encode_record(record).map_err(ConflictableTransactionError::Abort)
}

fn decode_tx<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> ConflictableTransactionResult<T, LabError> {
    decode_record(bytes).map_err(ConflictableTransactionError::Abort)
}

#[async_trait]
impl IdentityStorageEngine for SledStorage {
    async fn add_identity(&self, identity: &Identity) -> Result<()> {
        let id = identity.id();
        let key: &[u8] = id.as_bytes();
        let value = encode_record(identity)?;
        let email = identity.staff_email().map(str::to_string);

        (&self.identities, &self.staff_emails).transaction(
            |(identities, emails)| -> ConflictableTransactionResult<(), LabError> {
                if let Some(email) = &email {
                    if emails.get(email.as_bytes())?.is_some() {
                        return abort(LabError::Conflict(format!(
                            "Email {} is already registered",
                            email
                        )));
                    }
                    emails.insert(email.as_bytes(), key)?;
                }
                identities.insert(key, value.as_slice())?;
                Ok(())
            },
        )?;
        debug!(id = %id, role = %identity.role(), "Identity stored");
        Ok(())
    }

    async fn get_identity(&self, id: &RecordId) -> Result<Option<Identity>> {
        Self::get_record(&self.identities, id.as_bytes())
    }

    async fn get_staff_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let email = normalize_email(email);
        match self.staff_emails.get(email.as_bytes())? {
            Some(id) => Self::get_record(&self.identities, &id),
            None => Ok(None),
        }
    }

    async fn get_staff_by_reset_token(&self, token_hash: &str) -> Result<Option<Identity>> {
        for item in self.identities.iter() {
            let (_key, value) = item?;
            let identity: Identity = decode_record(&value)?;
            let holds_token = identity
                .staff()
                .and_then(|profile| profile.reset_token_hash.as_deref())
                .map_or(false, |hash| hash == token_hash);
            if holds_token {
                return Ok(Some(identity));
            }
        }
        Ok(None)
    }

    async fn list_identities(&self, roles: &[Role]) -> Result<Vec<Identity>> {
        let mut identities: Vec<Identity> = Self::scan(&self.identities)?;
        identities.retain(|identity| roles.contains(&identity.role()));
        identities.sort_by_key(|identity| identity.base.created_at);
        Ok(identities)
    }

    async fn update_identity(&self, id: &RecordId, mutation: Mutation<'_, Identity>) -> Result<Identity> {
        let key: &[u8] = id.as_bytes();
        let updated = self.identities.transaction(
            |identities| -> ConflictableTransactionResult<Identity, LabError> {
                let Some(current) = identities.get(key)? else {
                    return abort(LabError::NotFound(format!("Identity {} not found", id)));
                };
                let mut record: Identity = decode_tx(&current)?;
                let email_before = record.staff_email().map(str::to_string);
                mutation(&mut record).map_err(ConflictableTransactionError::Abort)?;
                if record.staff_email().map(str::to_string) != email_before {
                    return abort(LabError::InvalidInput("Staff email cannot be changed".to_string()));
                }
                identities.insert(key, encode_tx(&record)?)?;
                Ok(record)
            },
        )?;
        Ok(updated)
    }
}

#[async_trait]
impl CatalogStorageEngine for SledStorage {
    async fn add_medical_test(&self, test: &MedicalTest) -> Result<()> {
        let key: &[u8] = test.id.as_bytes();
        let value = encode_record(test)?;
        let title_key = MedicalTest::title_key(&test.title);

        (&self.medical_tests, &self.test_titles).transaction(
            |(tests, titles)| -> ConflictableTransactionResult<(), LabError> {
                if titles.get(title_key.as_bytes())?.is_some() {
                    return abort(LabError::Conflict(format!(
                        "Medical test '{}' already exists",
                        test.title
                    )));
                }
                titles.insert(title_key.as_bytes(), key)?;
                tests.insert(key, value.as_slice())?;
                Ok(())
            },
        )?;
        Ok(())
    }

    async fn get_medical_test(&self, id: &RecordId) -> Result<Option<MedicalTest>> {
        Self::get_record(&self.medical_tests, id.as_bytes())
    }

    async fn list_medical_tests(&self) -> Result<Vec<MedicalTest>> {
        let mut tests: Vec<MedicalTest> = Self::scan(&self.medical_tests)?;
        tests.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        Ok(tests)
    }

    async fn update_medical_test(
        &self,
        id: &RecordId,
        mutation: Mutation<'_, MedicalTest>,
    ) -> Result<MedicalTest> {
        let key: &[u8] = id.as_bytes();
        let updated = (&self.medical_tests, &self.test_titles).transaction(
            |(tests, titles)| -> ConflictableTransactionResult<MedicalTest, LabError> {
                let Some(current) = tests.get(key)? else {
                    return abort(LabError::NotFound(format!("Medical test {} not found", id)));
                };
                let mut record: MedicalTest = decode_tx(&current)?;
                let old_title = MedicalTest::title_key(&record.title);
                mutation(&mut record).map_err(ConflictableTransactionError::Abort)?;
                let new_title = MedicalTest::title_key(&record.title);
                if new_title != old_title {
                    if let Some(owner) = titles.get(new_title.as_bytes())? {
                        if &*owner != key {
                            return abort(LabError::Conflict(format!(
                                "Medical test '{}' already exists",
                                record.title
                            )));
                        }
                    }
                    titles.remove(old_title.as_bytes())?;
                    titles.insert(new_title.as_bytes(), key)?;
                }
                tests.insert(key, encode_tx(&record)?)?;
                Ok(record)
            },
        )?;
        Ok(updated)
    }

    async fn delete_medical_test(&self, id: &RecordId) -> Result<Option<MedicalTest>> {
        let key: &[u8] = id.as_bytes();
        let removed = (&self.medical_tests, &self.test_titles).transaction(
            |(tests, titles)| -> ConflictableTransactionResult<Option<MedicalTest>, LabError> {
                let Some(current) = tests.remove(key)? else {
                    return Ok(None);
                };
                let record: MedicalTest = decode_tx(&current)?;
                titles.remove(MedicalTest::title_key(&record.title).as_bytes())?;
                Ok(Some(record))
            },
        )?;
        Ok(removed)
    }
}

#[async_trait]
impl BookingStorageEngine for SledStorage {
    async fn add_booking(&self, booking: &Booking) -> Result<()> {
        let key: &[u8] = booking.id.as_bytes();
        let value = encode_record(booking)?;
        let code = booking.booking_code.as_ref().as_bytes();

        (&self.bookings, &self.booking_codes).transaction(
            |(bookings, codes)| -> ConflictableTransactionResult<(), LabError> {
                if codes.get(code)?.is_some() {
                    return abort(LabError::Conflict(format!(
                        "Booking code {} is already in use",
                        booking.booking_code
                    )));
                }
                codes.insert(code, key)?;
                bookings.insert(key, value.as_slice())?;
                Ok(())
            },
        )?;
        Ok(())
    }

    async fn get_booking(&self, id: &RecordId) -> Result<Option<Booking>> {
        Self::get_record(&self.bookings, id.as_bytes())
    }

    async fn get_booking_by_code(&self, code: &BookingCode) -> Result<Option<Booking>> {
        match self.booking_codes.get(code.as_ref().as_bytes())? {
            Some(id) => Self::get_record(&self.bookings, &id),
            None => Ok(None),
        }
    }

    async fn find_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
        let mut bookings: Vec<Booking> = Self::scan(&self.bookings)?;
        bookings.retain(|booking| filter.matches(booking));
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn update_booking(&self, id: &RecordId, mutation: Mutation<'_, Booking>) -> Result<Booking> {
        let key: &[u8] = id.as_bytes();
        let updated = self.bookings.transaction(
            |bookings| -> ConflictableTransactionResult<Booking, LabError> {
                let Some(current) = bookings.get(key)? else {
                    return abort(LabError::NotFound(format!("Booking {} not found", id)));
                };
                let mut record: Booking = decode_tx(&current)?;
                let code_before = record.booking_code.clone();
                mutation(&mut record).map_err(ConflictableTransactionError::Abort)?;
                if record.booking_code != code_before {
                    return abort(LabError::InvalidInput("Booking code cannot be changed".to_string()));
                }
                bookings.insert(key, encode_tx(&record)?)?;
                Ok(record)
            },
        )?;
        Ok(updated)
    }

    async fn delete_booking(&self, id: &RecordId) -> Result<Option<Booking>> {
        let key: &[u8] = id.as_bytes();
        let removed = (&self.bookings, &self.booking_codes).transaction(
            |(bookings, codes)| -> ConflictableTransactionResult<Option<Booking>, LabError> {
                let Some(current) = bookings.remove(key)? else {
                    return Ok(None);
                };
                let record: Booking = decode_tx(&current)?;
                codes.remove(record.booking_code.as_ref().as_bytes())?;
                Ok(Some(record))
            },
        )?;
        Ok(removed)
    }
}

#[async_trait]
impl LabStorageEngine for SledStorage {
    fn get_type(&self) -> StorageEngineType {
        StorageEngineType::Sled
    }

    async fn flush(&self) -> Result<()> {
        let bytes = self.db.flush_async().await?;
        debug!("Flushed {} bytes to sled", bytes);
        Ok(())
    }
}

// lib/src/booking/booking_engine.rs
// Booking lifecycle: creation with catalog pricing, partial payments, result
// replacement and the post-commit result notification.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use models::errors::ValidationError;
use models::identifiers::{BookingCode, RecordId};
use models::medical::{
    round_to_cents, Booking, BookingUpdate, ContactView, Identity, MedicalTest, Role, TestResult,
};

use crate::booking::booking_code::{BookingCodeGenerator, TimeRandomGenerator};
use crate::booking::views::BookingView;
use crate::catalog::Catalog;
use crate::errors::{LabError, Result};
use crate::notifications::{dispatch_detached, Notification, Notifier};
use crate::storage_engine::{BookingFilter, IdentityStorageEngine, LabStorageEngine};

const BOOKING_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub patient_id: RecordId,
    pub doctor_id: Option<RecordId>,
    pub medical_tests: Vec<RecordId>,
    pub amount_paid: Option<f64>,
}

/// Requested changes to a booking. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingPatch {
    pub patient_id: Option<RecordId>,
    pub doctor_id: Option<RecordId>,
    pub medical_tests: Option<Vec<RecordId>>,
    pub total_price: Option<f64>,
    pub amount_paid: Option<f64>,
    pub results: Option<Vec<TestResult>>,
}

#[derive(Clone)]
pub struct BookingEngine {
    storage: Arc<dyn LabStorageEngine>,
    catalog: Catalog,
    notifier: Arc<dyn Notifier>,
    codes: Arc<dyn BookingCodeGenerator>,
    public_base_url: String,
}

impl BookingEngine {
    pub fn new(
        storage: Arc<dyn LabStorageEngine>,
        notifier: Arc<dyn Notifier>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            catalog: Catalog::new(storage.clone()),
            storage,
            notifier,
            codes: Arc::new(TimeRandomGenerator),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn with_code_generator(mut self, codes: Arc<dyn BookingCodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    async fn require_identity(&self, id: &RecordId, role: Role) -> Result<Identity> {
        match self.storage.get_identity(id).await? {
            Some(identity) if identity.role() == role => Ok(identity),
            _ => Err(LabError::NotFound(format!("No {} with id {}", role, id))),
        }
    }

    fn price_of(tests: &[MedicalTest]) -> f64 {
        round_to_cents(tests.iter().map(|test| test.price).sum())
    }

    pub async fn create_booking(&self, input: NewBooking) -> Result<Booking> {
        if input.medical_tests.is_empty() {
            return Err(ValidationError::EmptyTestList.into());
        }
        self.require_identity(&input.patient_id, Role::Patient).await?;
        if let Some(doctor_id) = &input.doctor_id {
            self.require_identity(doctor_id, Role::Doctor).await?;
        }
        let tests = self.catalog.resolve(&input.medical_tests).await?;
        let total_price = Self::price_of(&tests);

        for attempt in 1..=BOOKING_CODE_ATTEMPTS {
            let code = self.codes.generate()?;
            let booking = Booking::new(
                input.patient_id,
                input.doctor_id,
                input.medical_tests.clone(),
                code,
                total_price,
                input.amount_paid,
            )?;
            match self.storage.add_booking(&booking).await {
                Ok(()) => {
                    info!(
                        code = %booking.booking_code,
                        total = booking.total_price,
                        remaining = booking.amount_remaining,
                        "Booking created"
                    );
                    return Ok(booking);
                }
                Err(e) if e.is_conflict() => {
                    warn!(attempt, code = %booking.booking_code, "Booking code collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
        Err(LabError::Conflict(format!(
            "Could not allocate a unique booking code after {} attempts",
            BOOKING_CODE_ATTEMPTS
        )))
    }

    /// Applies `patch` atomically. A new test list re-derives the total from the
    /// catalog unless an explicit total accompanies it, and drops results for
    /// tests that are no longer booked.
    pub async fn update_booking(&self, id: &RecordId, patch: BookingPatch) -> Result<Booking> {
        if let Some(patient_id) = &patch.patient_id {
            self.require_identity(patient_id, Role::Patient).await?;
        }
        if let Some(doctor_id) = &patch.doctor_id {
            self.require_identity(doctor_id, Role::Doctor).await?;
        }
        let mut update = BookingUpdate {
            patient_id: patch.patient_id,
            doctor_id: patch.doctor_id,
            medical_tests: None,
            total_price: patch.total_price,
            amount_paid: patch.amount_paid,
            results: patch.results,
        };
        if let Some(ids) = patch.medical_tests {
            if ids.is_empty() {
                return Err(ValidationError::EmptyTestList.into());
            }
            let tests = self.catalog.resolve(&ids).await?;
            update.total_price = update.total_price.or(Some(Self::price_of(&tests)));
            update.medical_tests = Some(ids);
        }

        let updated = self
            .storage
            .update_booking(id, &|record: &mut Booking| -> Result<()> {
                let mut effective = update.clone();
                if effective.results.is_none() {
                    if let Some(tests) = &effective.medical_tests {
                        let booked: HashSet<RecordId> = tests.iter().copied().collect();
                        effective.results = Some(
                            record
                                .results
                                .iter()
                                .filter(|result| booked.contains(&result.test_id))
                                .cloned()
                                .collect(),
                        );
                    }
                }
                Ok(record.apply_update(&effective)?)
            })
            .await?;
        if update.touches_payment() {
            info!(
                code = %updated.booking_code,
                paid = updated.amount_paid,
                remaining = updated.amount_remaining,
                "Booking payment updated"
            );
        }
        Ok(updated)
    }

    pub async fn get_booking(&self, id: &RecordId) -> Result<Booking> {
        self.storage
            .get_booking(id)
            .await?
            .ok_or_else(|| LabError::NotFound(format!("Booking {} not found", id)))
    }

    /// Looks a booking up by its public code. Malformed codes are simply unknown.
    pub async fn get_booking_by_code(&self, code: &str) -> Result<Booking> {
        let not_found = || LabError::NotFound(format!("Booking {} not found", code.trim()));
        let code: BookingCode = code.parse().map_err(|_| not_found())?;
        self.storage.get_booking_by_code(&code).await?.ok_or_else(not_found)
    }

    /// Public lookup: details are only disclosed once the balance is settled.
    pub async fn disclose_booking_by_code(&self, code: &str) -> Result<Booking> {
        let booking = self.get_booking_by_code(code).await?;
        if !booking.is_settled() {
            debug!(code = %booking.booking_code, "Disclosure refused, balance outstanding");
            return Err(LabError::PaymentRequired(format!(
                "Booking {} has an outstanding balance of {:.2}",
                booking.booking_code, booking.amount_remaining
            )));
        }
        Ok(booking)
    }

    pub async fn list_bookings(&self) -> Result<Vec<Booking>> {
        self.storage.find_bookings(&BookingFilter::default()).await
    }

    pub async fn bookings_for_patient(&self, patient_id: &RecordId) -> Result<Vec<Booking>> {
        let filter = BookingFilter { patient_id: Some(*patient_id), doctor_id: None };
        self.storage.find_bookings(&filter).await
    }

    pub async fn bookings_for_doctor(&self, doctor_id: &RecordId) -> Result<Vec<Booking>> {
        let filter = BookingFilter { patient_id: None, doctor_id: Some(*doctor_id) };
        self.storage.find_bookings(&filter).await
    }

    pub async fn delete_booking(&self, id: &RecordId) -> Result<Booking> {
        let removed = self
            .storage
            .delete_booking(id)
            .await?
            .ok_or_else(|| LabError::NotFound(format!("Booking {} not found", id)))?;
        info!(code = %removed.booking_code, "Booking deleted");
        Ok(removed)
    }

    /// Replaces the booking's results and records `doctor` as the reporting
    /// doctor. The patient is notified after the write commits.
    pub async fn add_result(
        &self,
        booking_id: &RecordId,
        doctor: &Identity,
        results: Vec<TestResult>,
    ) -> Result<Booking> {
        if doctor.role() != Role::Doctor {
            return Err(LabError::Unauthorized("Only doctors can report results".to_string()));
        }
        let doctor_id = doctor.id();
        let updated = self
            .storage
            .update_booking(booking_id, &|record: &mut Booking| -> Result<()> {
                record.replace_results(results.clone())?;
                record.doctor_id = Some(doctor_id);
                record.touch();
                Ok(())
            })
            .await?;
        info!(
            code = %updated.booking_code,
            doctor = %doctor_id,
            results = updated.results.len(),
            "Results recorded"
        );
        self.notify_result_ready(&updated).await;
        Ok(updated)
    }

    /// Queues the result notifications for the booking's patient and returns
    /// the detached send tasks.
    pub async fn notify_result_ready(&self, booking: &Booking) -> Vec<JoinHandle<()>> {
        let patient = match self.storage.get_identity(&booking.patient_id).await {
            Ok(Some(patient)) => patient,
            Ok(None) => {
                warn!(code = %booking.booking_code, "Patient missing, result notification skipped");
                return Vec::new();
            }
            Err(e) => {
                warn!(code = %booking.booking_code, "Could not load patient for notification: {}", e);
                return Vec::new();
            }
        };
        let link = format!(
            "{}/api/bookings/code/{}",
            self.public_base_url.trim_end_matches('/'),
            booking.booking_code
        );
        let body = format!(
            "Dear {}, your results for booking {} are ready: {}",
            patient.base.name, booking.booking_code, link
        );

        let mut handles = vec![dispatch_detached(
            self.notifier.clone(),
            Notification::sms(patient.base.mobile.clone(), body.clone()),
        )];
        if let Some(email) = patient.email() {
            handles.push(dispatch_detached(
                self.notifier.clone(),
                Notification::email(email, "Your test results are ready", body),
            ));
        }
        handles
    }

    /// Populates patient, doctor and test references.
    pub async fn present(&self, booking: &Booking) -> Result<BookingView> {
        let mut views = self.present_all(std::slice::from_ref(booking)).await?;
        views
            .pop()
            .ok_or_else(|| LabError::Upstream("Booking view could not be built".to_string()))
    }

    pub async fn present_all(&self, bookings: &[Booking]) -> Result<Vec<BookingView>> {
        let tests: HashMap<RecordId, MedicalTest> = self
            .catalog
            .list_tests()
            .await?
            .into_iter()
            .map(|test| (test.id, test))
            .collect();
        let mut contacts = HashMap::new();
        let mut views = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let patient = self.contact(&mut contacts, Some(booking.patient_id)).await?;
            let doctor = self.contact(&mut contacts, booking.doctor_id).await?;
            views.push(BookingView::build(booking, patient, doctor, &tests));
        }
        Ok(views)
    }

    async fn contact(
        &self,
        cache: &mut HashMap<RecordId, Option<ContactView>>,
        id: Option<RecordId>,
    ) -> Result<Option<ContactView>> {
        let Some(id) = id else {
            return Ok(None);
        };
        if let Some(hit) = cache.get(&id) {
            return Ok(hit.clone());
        }
        let contact = self.storage.get_identity(&id).await?.map(|identity| identity.contact());
        cache.insert(id, contact.clone());
        Ok(contact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::notifications::{Channel, OutboxNotifier};
    use crate::storage_engine::{InMemoryStorage, SledStorage};
    use models::medical::{NewMedicalTest, NormalRange};

    struct Fixture {
        engine: BookingEngine,
        outbox: OutboxNotifier,
        patient: Identity,
        doctor: Identity,
        cbc: MedicalTest,
        lipid: MedicalTest,
        glucose: MedicalTest,
    }

    fn new_test(title: &str, price: f64) -> NewMedicalTest {
        NewMedicalTest {
            title: title.to_string(),
            image: None,
            price,
            has_offer: false,
            offer_price: None,
            instructions: vec![],
            normal_range: NormalRange { min: 1.0, max: 10.0, unit: String::new() },
        }
    }

    async fn fixture_with(storage: Arc<dyn LabStorageEngine>) -> Fixture {
        let outbox = OutboxNotifier::new();
        let engine = BookingEngine::new(storage.clone(), Arc::new(outbox.clone()), "http://lab.example/");
        let patient = Identity::new_patient("Ali Hassan".into(), "+201111111111".into(), Some("ali@example.com"));
        let doctor = Identity::new_staff(Role::Doctor, "Dr. Mona".into(), "0100".into(), "mona@lab.example", "h".into())
            .unwrap();
        storage.add_identity(&patient).await.unwrap();
        storage.add_identity(&doctor).await.unwrap();
        let cbc = engine.catalog().create_test(new_test("CBC", 100.0)).await.unwrap();
        let lipid = engine.catalog().create_test(new_test("Lipid Panel", 150.0)).await.unwrap();
        let glucose = engine.catalog().create_test(new_test("Fasting Glucose", 50.0)).await.unwrap();
        Fixture { engine, outbox, patient, doctor, cbc, lipid, glucose }
    }

    async fn fixture() -> Fixture {
        fixture_with(Arc::new(InMemoryStorage::new())).await
    }

    fn booking_of(f: &Fixture, tests: Vec<RecordId>, paid: Option<f64>) -> NewBooking {
        NewBooking { patient_id: f.patient.id(), doctor_id: None, medical_tests: tests, amount_paid: paid }
    }

    #[tokio::test]
    async fn total_comes_from_catalog_and_remaining_is_derived() {
        let f = fixture().await;
        let booking = f.engine.create_booking(booking_of(&f, vec![f.cbc.id], Some(40.0))).await.unwrap();
        assert_eq!(booking.total_price, 100.0);
        assert_eq!(booking.amount_remaining, 60.0);

        let updated = f
            .engine
            .update_booking(&booking.id, BookingPatch { amount_paid: Some(100.0), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.amount_remaining, 0.0);
    }

    #[tokio::test]
    async fn unknown_test_persists_nothing() {
        let f = fixture().await;
        let err = f
            .engine
            .create_booking(booking_of(&f, vec![f.cbc.id, RecordId::new()], None))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(f.engine.list_bookings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_test_list_is_invalid() {
        let f = fixture().await;
        let err = f.engine.create_booking(booking_of(&f, vec![], None)).await.unwrap_err();
        assert!(matches!(err, LabError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn overpayment_is_rejected() {
        let f = fixture().await;
        let err = f.engine.create_booking(booking_of(&f, vec![f.glucose.id], Some(60.0))).await.unwrap_err();
        assert!(matches!(err, LabError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn patient_reference_must_exist() {
        let f = fixture().await;
        let mut input = booking_of(&f, vec![f.cbc.id], None);
        input.patient_id = f.doctor.id();
        assert!(f.engine.create_booking(input).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn code_lookup_returns_the_booked_tests() {
        let f = fixture().await;
        let booking = f
            .engine
            .create_booking(booking_of(&f, vec![f.cbc.id, f.lipid.id], None))
            .await
            .unwrap();
        let found = f.engine.get_booking_by_code(&booking.booking_code).await.unwrap();
        assert_eq!(found.medical_tests, vec![f.cbc.id, f.lipid.id]);
        assert_eq!(found.total_price, 250.0);

        assert!(f.engine.get_booking_by_code("BKG-0000000000").await.unwrap_err().is_not_found());
        assert!(f.engine.get_booking_by_code("not-a-code").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn disclosure_waits_for_full_payment() {
        let f = fixture().await;
        let booking = f.engine.create_booking(booking_of(&f, vec![f.cbc.id], Some(40.0))).await.unwrap();
        let err = f.engine.disclose_booking_by_code(&booking.booking_code).await.unwrap_err();
        assert!(matches!(err, LabError::PaymentRequired(_)));

        f.engine
            .update_booking(&booking.id, BookingPatch { amount_paid: Some(100.0), ..Default::default() })
            .await
            .unwrap();
        let disclosed = f.engine.disclose_booking_by_code(&booking.booking_code).await.unwrap();
        assert_eq!(disclosed.id, booking.id);
    }

    #[tokio::test]
    async fn changing_tests_reprices_and_prunes_results() {
        let f = fixture().await;
        let booking = f
            .engine
            .create_booking(booking_of(&f, vec![f.cbc.id, f.lipid.id], Some(100.0)))
            .await
            .unwrap();
        f.engine
            .add_result(
                &booking.id,
                &f.doctor,
                vec![
                    TestResult { test_id: f.cbc.id, value: 5.0, note: None },
                    TestResult { test_id: f.lipid.id, value: 6.0, note: None },
                ],
            )
            .await
            .unwrap();

        let updated = f
            .engine
            .update_booking(
                &booking.id,
                BookingPatch { medical_tests: Some(vec![f.cbc.id, f.glucose.id]), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(updated.total_price, 150.0);
        assert_eq!(updated.amount_remaining, 50.0);
        assert_eq!(updated.results.len(), 1);
        assert_eq!(updated.results[0].test_id, f.cbc.id);

        let explicit = f
            .engine
            .update_booking(
                &booking.id,
                BookingPatch {
                    medical_tests: Some(vec![f.lipid.id]),
                    total_price: Some(120.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(explicit.total_price, 120.0);
        assert_eq!(explicit.amount_remaining, 20.0);
    }

    #[tokio::test]
    async fn update_below_paid_amount_is_rejected() {
        let f = fixture().await;
        let booking = f.engine.create_booking(booking_of(&f, vec![f.lipid.id], Some(140.0))).await.unwrap();
        let err = f
            .engine
            .update_booking(&booking.id, BookingPatch { total_price: Some(100.0), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::InvalidInput(_)));
        let stored = f.engine.get_booking(&booking.id).await.unwrap();
        assert_eq!(stored.total_price, 150.0);
    }

    #[tokio::test]
    async fn update_of_unknown_booking_is_not_found() {
        let f = fixture().await;
        let err = f
            .engine
            .update_booking(&RecordId::new(), BookingPatch { amount_paid: Some(1.0), ..Default::default() })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn results_are_replaced_and_patient_notified() {
        let f = fixture().await;
        let booking = f
            .engine
            .create_booking(booking_of(&f, vec![f.cbc.id, f.lipid.id, f.glucose.id], None))
            .await
            .unwrap();
        let entry = |test_id, value| TestResult { test_id, value, note: None };

        f.engine.add_result(&booking.id, &f.doctor, vec![entry(f.cbc.id, 4.0)]).await.unwrap();
        let updated = f
            .engine
            .add_result(&booking.id, &f.doctor, vec![entry(f.lipid.id, 2.0), entry(f.glucose.id, 3.0)])
            .await
            .unwrap();
        assert_eq!(updated.results, vec![entry(f.lipid.id, 2.0), entry(f.glucose.id, 3.0)]);
        assert_eq!(updated.doctor_id, Some(f.doctor.id()));

        for handle in f.engine.notify_result_ready(&updated).await {
            handle.await.unwrap();
        }
        let sms = f.outbox.last_to("+201111111111").await.unwrap();
        assert_eq!(sms.channel, Channel::Sms);
        assert!(sms.body.contains(&format!("http://lab.example/api/bookings/code/{}", updated.booking_code)));
        let email = f.outbox.last_to("ali@example.com").await.unwrap();
        assert_eq!(email.channel, Channel::Email);
    }

    #[tokio::test]
    async fn result_for_unbooked_test_is_rejected() {
        let f = fixture().await;
        let booking = f.engine.create_booking(booking_of(&f, vec![f.cbc.id], None)).await.unwrap();
        let err = f
            .engine
            .add_result(&booking.id, &f.doctor, vec![TestResult { test_id: f.lipid.id, value: 1.0, note: None }])
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::InvalidInput(_)));
    }

    struct ScriptedCodes {
        codes: Mutex<Vec<BookingCode>>,
        calls: AtomicUsize,
    }

    impl BookingCodeGenerator for ScriptedCodes {
        fn generate(&self) -> Result<BookingCode> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut codes = self.codes.lock().unwrap();
            Ok(if codes.len() > 1 { codes.remove(0) } else { codes[0].clone() })
        }
    }

    #[tokio::test]
    async fn code_collision_regenerates() {
        let storage: Arc<dyn LabStorageEngine> = Arc::new(SledStorage::temporary().unwrap());
        let f = fixture_with(storage).await;
        let taken = BookingCode::from_parts(123456, 1111).unwrap();
        let fresh = BookingCode::from_parts(123456, 2222).unwrap();
        let scripted = Arc::new(ScriptedCodes {
            codes: Mutex::new(vec![taken.clone(), taken.clone(), fresh.clone()]),
            calls: AtomicUsize::new(0),
        });
        let engine = f.engine.clone().with_code_generator(scripted.clone());

        let first = engine.create_booking(booking_of(&f, vec![f.cbc.id], None)).await.unwrap();
        assert_eq!(first.booking_code, taken);
        let second = engine.create_booking(booking_of(&f, vec![f.cbc.id], None)).await.unwrap();
        assert_eq!(second.booking_code, fresh);
        assert_eq!(scripted.calls.load(Ordering::SeqCst), 3);

        // The script now repeats a code that is already in use.
        let err = engine.create_booking(booking_of(&f, vec![f.cbc.id], None)).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn views_populate_references() {
        let f = fixture().await;
        let mut input = booking_of(&f, vec![f.cbc.id], None);
        input.doctor_id = Some(f.doctor.id());
        let booking = f.engine.create_booking(input).await.unwrap();
        let view = f.engine.present(&booking).await.unwrap();
        assert_eq!(view.patient.as_ref().map(|p| p.name.as_str()), Some("Ali Hassan"));
        assert_eq!(view.doctor.as_ref().map(|d| d.id), Some(f.doctor.id()));
        assert_eq!(view.medical_tests[0].title, "CBC");
    }

    #[tokio::test]
    async fn patient_and_doctor_listings() {
        let f = fixture().await;
        let mut with_doctor = booking_of(&f, vec![f.cbc.id], None);
        with_doctor.doctor_id = Some(f.doctor.id());
        f.engine.create_booking(with_doctor).await.unwrap();
        f.engine.create_booking(booking_of(&f, vec![f.lipid.id], None)).await.unwrap();

        assert_eq!(f.engine.bookings_for_patient(&f.patient.id()).await.unwrap().len(), 2);
        assert_eq!(f.engine.bookings_for_doctor(&f.doctor.id()).await.unwrap().len(), 1);
        let removed = f.engine.list_bookings().await.unwrap().remove(0);
        f.engine.delete_booking(&removed.id).await.unwrap();
        assert!(f.engine.delete_booking(&removed.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn catalog_sums_are_payable_in_full() {
        let storage: Arc<dyn LabStorageEngine> = Arc::new(SledStorage::temporary().unwrap());
        let f = fixture_with(storage).await;
        let ferritin = f.engine.catalog().create_test(new_test("Ferritin", 10.1)).await.unwrap();
        let b12 = f.engine.catalog().create_test(new_test("Vitamin B12", 20.2)).await.unwrap();

        let booking = f
            .engine
            .create_booking(booking_of(&f, vec![ferritin.id, b12.id], Some(30.3)))
            .await
            .unwrap();
        assert_eq!(booking.total_price, 30.3);
        assert_eq!(booking.amount_remaining, 0.0);
        f.engine.disclose_booking_by_code(&booking.booking_code).await.unwrap();

        let partial = f
            .engine
            .create_booking(booking_of(&f, vec![ferritin.id, b12.id], Some(10.1)))
            .await
            .unwrap();
        let settled = f
            .engine
            .update_booking(&partial.id, BookingPatch { amount_paid: Some(30.3), ..Default::default() })
            .await
            .unwrap();
        assert!(settled.is_settled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_payment_and_price_updates_both_land() {
        let storage: Arc<dyn LabStorageEngine> = Arc::new(SledStorage::temporary().unwrap());
        let f = fixture_with(storage).await;
        let booking = f
            .engine
            .create_booking(booking_of(&f, vec![f.cbc.id, f.lipid.id], None))
            .await
            .unwrap();

        for _ in 0..20 {
            f.engine
                .update_booking(
                    &booking.id,
                    BookingPatch { total_price: Some(250.0), amount_paid: Some(0.0), ..Default::default() },
                )
                .await
                .unwrap();

            let (engine, id) = (f.engine.clone(), booking.id);
            let pay = tokio::spawn(async move {
                engine
                    .update_booking(&id, BookingPatch { amount_paid: Some(40.0), ..Default::default() })
                    .await
            });
            let (engine, id) = (f.engine.clone(), booking.id);
            let reprice = tokio::spawn(async move {
                engine
                    .update_booking(&id, BookingPatch { total_price: Some(300.0), ..Default::default() })
                    .await
            });
            pay.await.unwrap().unwrap();
            reprice.await.unwrap().unwrap();

            let current = f.engine.get_booking(&booking.id).await.unwrap();
            assert_eq!(current.amount_paid, 40.0);
            assert_eq!(current.total_price, 300.0);
            assert_eq!(current.amount_remaining, 260.0);
        }
    }
}

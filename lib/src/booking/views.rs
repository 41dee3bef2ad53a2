// lib/src/booking/views.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use models::identifiers::{BookingCode, RecordId};
use models::medical::{Booking, ContactView, MedicalTest, MedicalTestSummary, ResultFlag};

/// A booking with its references populated for clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: RecordId,
    pub booking_code: BookingCode,
    pub patient: Option<ContactView>,
    pub doctor: Option<ContactView>,
    pub medical_tests: Vec<MedicalTestSummary>,
    pub total_price: f64,
    pub amount_paid: f64,
    pub amount_remaining: f64,
    pub results: Vec<ResultView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A result value interpreted against the test's normal range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub test_id: RecordId,
    pub title: Option<String>,
    pub value: f64,
    pub unit: Option<String>,
    pub flag: Option<ResultFlag>,
    pub note: Option<String>,
}

impl BookingView {
    /// Tests missing from `tests` are left out; their results keep the raw value only.
    pub fn build(
        booking: &Booking,
        patient: Option<ContactView>,
        doctor: Option<ContactView>,
        tests: &HashMap<RecordId, MedicalTest>,
    ) -> Self {
        let medical_tests = booking
            .medical_tests
            .iter()
            .filter_map(|id| tests.get(id))
            .map(MedicalTest::summary)
            .collect();
        let results = booking
            .results
            .iter()
            .map(|result| {
                let test = tests.get(&result.test_id);
                ResultView {
                    test_id: result.test_id,
                    title: test.map(|t| t.title.clone()),
                    value: result.value,
                    unit: test
                        .map(|t| t.normal_range.unit.clone())
                        .filter(|unit| !unit.is_empty()),
                    flag: test.map(|t| t.normal_range.classify(result.value)),
                    note: result.note.clone(),
                }
            })
            .collect();

        Self {
            id: booking.id,
            booking_code: booking.booking_code.clone(),
            patient,
            doctor,
            medical_tests,
            total_price: booking.total_price,
            amount_paid: booking.amount_paid,
            amount_remaining: booking.amount_remaining,
            results,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

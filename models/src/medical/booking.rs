// models/src/medical/booking.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};
use crate::identifiers::{BookingCode, RecordId};

/// One measured value attached to a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_id: RecordId,
    pub value: f64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub doctor_id: Option<RecordId>,
    pub medical_tests: Vec<RecordId>,
    pub booking_code: BookingCode,
    pub total_price: f64,
    pub amount_paid: f64,
    /// Always `total_price - amount_paid`; only [`Booking::settle`] writes it.
    pub amount_remaining: f64,
    pub results: Vec<TestResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated change set for an existing booking. Test references have
/// already been resolved by the caller, so `total_price` carries either the
/// caller's explicit total or the freshly summed catalog prices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingUpdate {
    pub patient_id: Option<RecordId>,
    pub doctor_id: Option<RecordId>,
    pub medical_tests: Option<Vec<RecordId>>,
    pub total_price: Option<f64>,
    pub amount_paid: Option<f64>,
    pub results: Option<Vec<TestResult>>,
}

impl BookingUpdate {
    pub fn touches_payment(&self) -> bool {
        self.total_price.is_some() || self.amount_paid.is_some()
    }
}

impl Booking {
    pub fn new(
        patient_id: RecordId,
        doctor_id: Option<RecordId>,
        medical_tests: Vec<RecordId>,
        booking_code: BookingCode,
        total_price: f64,
        amount_paid: Option<f64>,
    ) -> ValidationResult<Self> {
        if medical_tests.is_empty() {
            return Err(ValidationError::EmptyTestList);
        }
        let now = Utc::now();
        let mut booking = Self {
            id: RecordId::new(),
            patient_id,
            doctor_id,
            medical_tests,
            booking_code,
            total_price,
            amount_paid: amount_paid.unwrap_or(0.0),
            amount_remaining: 0.0,
            results: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        booking.settle()?;
        Ok(booking)
    }

    /// Checks the payment fields and recomputes the remaining balance. All
    /// three amounts are kept rounded to cents.
    pub fn settle(&mut self) -> ValidationResult<()> {
        check_amount("totalPrice", self.total_price)?;
        check_amount("amountPaid", self.amount_paid)?;
        self.total_price = round_to_cents(self.total_price);
        self.amount_paid = round_to_cents(self.amount_paid);
        if self.amount_paid > self.total_price {
            return Err(ValidationError::Overpayment {
                paid: self.amount_paid,
                total: self.total_price,
            });
        }
        self.amount_remaining = round_to_cents(self.total_price - self.amount_paid);
        Ok(())
    }

    pub fn is_settled(&self) -> bool {
        self.amount_remaining <= 0.0
    }

    /// Replaces the whole result list. Every entry must reference one of the
    /// booked tests and carry a finite value.
    pub fn replace_results(&mut self, results: Vec<TestResult>) -> ValidationResult<()> {
        let booked: HashSet<RecordId> = self.medical_tests.iter().copied().collect();
        for result in &results {
            if !booked.contains(&result.test_id) {
                return Err(ValidationError::ResultForUnbookedTest(result.test_id.to_string()));
            }
            if !result.value.is_finite() {
                return Err(ValidationError::InvalidResultValue(result.test_id.to_string()));
            }
        }
        self.results = results;
        Ok(())
    }

    /// Applies `update` all-or-nothing. The balance is re-derived whenever the
    /// update touches either payment field.
    pub fn apply_update(&mut self, update: &BookingUpdate) -> ValidationResult<()> {
        let mut next = self.clone();
        if let Some(patient_id) = update.patient_id {
            next.patient_id = patient_id;
        }
        if let Some(doctor_id) = update.doctor_id {
            next.doctor_id = Some(doctor_id);
        }
        if let Some(tests) = &update.medical_tests {
            if tests.is_empty() {
                return Err(ValidationError::EmptyTestList);
            }
            next.medical_tests = tests.clone();
        }
        if let Some(results) = &update.results {
            next.replace_results(results.clone())?;
        }
        if let Some(total) = update.total_price {
            next.total_price = total;
        }
        if let Some(paid) = update.amount_paid {
            next.amount_paid = paid;
        }
        next.settle()?;
        next.touch();
        *self = next;
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Rounds a monetary amount to two decimal places.
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn check_amount(field: &'static str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidAmount {
            field,
            expectation: "a finite number greater than or equal to 0",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> BookingCode {
        BookingCode::from_parts(123456, 7890).unwrap()
    }

    fn booking(paid: Option<f64>) -> Booking {
        Booking::new(RecordId::new(), None, vec![RecordId::new()], code(), 100.0, paid).unwrap()
    }

    #[test]
    fn remaining_is_derived_on_creation() {
        let booking = booking(Some(40.0));
        assert_eq!(booking.total_price, 100.0);
        assert_eq!(booking.amount_remaining, 60.0);
        assert!(!booking.is_settled());
    }

    #[test]
    fn missing_payment_defaults_to_zero() {
        let booking = booking(None);
        assert_eq!(booking.amount_paid, 0.0);
        assert_eq!(booking.amount_remaining, 100.0);
    }

    #[test]
    fn overpayment_is_rejected() {
        let result = Booking::new(RecordId::new(), None, vec![RecordId::new()], code(), 100.0, Some(120.0));
        assert_eq!(
            result.unwrap_err(),
            ValidationError::Overpayment { paid: 120.0, total: 100.0 }
        );
    }

    #[test]
    fn inexact_sums_settle_in_cents() {
        let total = 10.1 + 20.2;
        let mut booking = Booking::new(RecordId::new(), None, vec![RecordId::new()], code(), total, Some(30.3)).unwrap();
        assert_eq!(booking.total_price, 30.3);
        assert_eq!(booking.amount_remaining, 0.0);
        assert!(booking.is_settled());

        booking.total_price = 0.1 + 0.2;
        booking.amount_paid = 0.3;
        booking.settle().unwrap();
        assert!(booking.is_settled());
    }

    #[test]
    fn empty_test_list_is_rejected() {
        let result = Booking::new(RecordId::new(), None, vec![], code(), 0.0, None);
        assert_eq!(result.unwrap_err(), ValidationError::EmptyTestList);
    }

    #[test]
    fn payment_update_recomputes_remaining() {
        let mut booking = booking(Some(40.0));
        booking
            .apply_update(&BookingUpdate { amount_paid: Some(100.0), ..Default::default() })
            .unwrap();
        assert_eq!(booking.amount_remaining, 0.0);
        assert!(booking.is_settled());

        booking
            .apply_update(&BookingUpdate { total_price: Some(150.0), ..Default::default() })
            .unwrap();
        assert_eq!(booking.amount_remaining, 50.0);
    }

    #[test]
    fn failed_update_leaves_booking_untouched() {
        let mut booking = booking(Some(40.0));
        let before = booking.clone();
        let update = BookingUpdate { amount_paid: Some(-1.0), ..Default::default() };
        assert!(booking.apply_update(&update).is_err());
        assert_eq!(booking, before);

        let update = BookingUpdate { total_price: Some(10.0), ..Default::default() };
        assert!(booking.apply_update(&update).is_err());
        assert_eq!(booking, before);
    }

    #[test]
    fn results_are_replaced_not_merged() {
        let a = RecordId::new();
        let b = RecordId::new();
        let c = RecordId::new();
        let mut booking =
            Booking::new(RecordId::new(), None, vec![a, b, c], code(), 30.0, None).unwrap();
        let entry = |test_id, value| TestResult { test_id, value, note: None };

        booking.replace_results(vec![entry(a, 1.0)]).unwrap();
        booking.replace_results(vec![entry(b, 2.0), entry(c, 3.0)]).unwrap();
        assert_eq!(booking.results, vec![entry(b, 2.0), entry(c, 3.0)]);
    }

    #[test]
    fn results_for_unbooked_tests_are_rejected() {
        let mut booking = booking(None);
        let stranger = RecordId::new();
        let result = booking.replace_results(vec![TestResult { test_id: stranger, value: 1.0, note: None }]);
        assert!(matches!(result, Err(ValidationError::ResultForUnbookedTest(_))));
        assert!(booking.results.is_empty());
    }

    #[test]
    fn booking_serializes_with_camel_case_fields() {
        let json = serde_json::to_value(booking(Some(40.0))).unwrap();
        assert_eq!(json["amountRemaining"], 60.0);
        assert!(json["bookingCode"].as_str().unwrap().starts_with("BKG-"));
    }
}

// rest_api/src/validation/requests.rs

use serde::Deserialize;

use lib::booking::{BookingPatch, NewBooking};
use lib::errors::LabError;
use models::identifiers::RecordId;
use models::medical::{MedicalTestPatch, NewMedicalTest, NormalRange, Role, TestResult};
use security::identity::{NewPatient, Registration};
use security::password::check_strength;

use super::{
    check_email, check_id, check_length, check_non_negative, check_positive, check_required,
    check_url, Validate,
};

const PASSWORD_RULE: &str = "password must include uppercase, lowercase, number, and special character";

fn check_password(errors: &mut Vec<String>, password: &str) {
    if password.is_empty() {
        errors.push("password is required".to_string());
    } else if password.chars().count() < security::password::MIN_PASSWORD_LENGTH {
        errors.push("password must be at least 8 characters".to_string());
    } else if check_strength(password).is_err() {
        errors.push(PASSWORD_RULE.to_string());
    }
}

fn parse_id(field: &'static str, value: &str) -> Result<RecordId, LabError> {
    Ok(RecordId::parse_field(field, value.trim())?)
}

fn check_range(errors: &mut Vec<String>, range: &NormalRange) {
    if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
        errors.push("normalRange.min must be less than or equal to normalRange.max".to_string());
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub mobile: String,
    pub role: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        check_length(&mut errors, "name", &self.name, 3, 50);
        check_email(&mut errors, "email", &self.email);
        check_password(&mut errors, &self.password);
        check_required(&mut errors, "mobile", &self.mobile);
        if !matches!(self.role.parse::<Role>(), Ok(role) if role.is_staff()) {
            errors.push("role must be doctor or assistant".to_string());
        }
        errors
    }
}

impl RegisterRequest {
    pub fn into_registration(self) -> Result<Registration, LabError> {
        Ok(Registration {
            role: self.role.parse()?,
            name: self.name,
            email: self.email,
            password: self.password,
            mobile: self.mobile,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        check_email(&mut errors, "email", &self.email);
        check_password(&mut errors, &self.password);
        errors
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

impl Validate for ForgotPasswordRequest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        check_email(&mut errors, "email", &self.email);
        errors
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub password: String,
}

impl Validate for ResetPasswordRequest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        check_password(&mut errors, &self.password);
        errors
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePatientRequest {
    pub name: String,
    pub mobile: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Validate for CreatePatientRequest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        check_length(&mut errors, "name", &self.name, 3, 50);
        check_required(&mut errors, "mobile", &self.mobile);
        if let Some(email) = &self.email {
            check_email(&mut errors, "email", email);
        }
        errors
    }
}

impl From<CreatePatientRequest> for NewPatient {
    fn from(request: CreatePatientRequest) -> Self {
        NewPatient { name: request.name, mobile: request.mobile, email: request.email }
    }
}

impl Validate for NewMedicalTest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        check_length(&mut errors, "title", &self.title, 3, 100);
        if let Some(image) = &self.image {
            check_url(&mut errors, "image", image);
        }
        check_positive(&mut errors, "price", self.price);
        match (self.has_offer, self.offer_price) {
            (true, None) => errors.push("offerPrice is required when hasOffer is true".to_string()),
            (true, Some(offer)) => {
                check_positive(&mut errors, "offerPrice", offer);
                if offer >= self.price {
                    errors.push("offerPrice must be less than price".to_string());
                }
            }
            (false, Some(_)) => {
                errors.push("offerPrice is not allowed when hasOffer is false".to_string())
            }
            (false, None) => {}
        }
        check_range(&mut errors, &self.normal_range);
        errors
    }
}

impl Validate for MedicalTestPatch {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            check_length(&mut errors, "title", title, 3, 100);
        }
        if let Some(image) = &self.image {
            check_url(&mut errors, "image", image);
        }
        if let Some(price) = self.price {
            check_positive(&mut errors, "price", price);
        }
        if let Some(offer) = self.offer_price {
            check_positive(&mut errors, "offerPrice", offer);
            if matches!(self.price, Some(price) if offer >= price) {
                errors.push("offerPrice must be less than price".to_string());
            }
        }
        if let Some(range) = &self.normal_range {
            check_range(&mut errors, range);
        }
        errors
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBookingRequest {
    pub patient_id: String,
    #[serde(default)]
    pub doctor_id: Option<String>,
    pub medical_tests: Vec<String>,
    #[serde(default)]
    pub amount_paid: Option<f64>,
}

impl Validate for CreateBookingRequest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        check_id(&mut errors, "patientId", &self.patient_id);
        if let Some(doctor_id) = &self.doctor_id {
            check_id(&mut errors, "doctorId", doctor_id);
        }
        if self.medical_tests.is_empty() {
            errors.push("At least one medical test must be provided".to_string());
        }
        for test_id in &self.medical_tests {
            check_id(&mut errors, "medicalTests", test_id);
        }
        if let Some(paid) = self.amount_paid {
            check_non_negative(&mut errors, "amountPaid", paid);
        }
        errors
    }
}

impl CreateBookingRequest {
    pub fn into_new_booking(self) -> Result<NewBooking, LabError> {
        Ok(NewBooking {
            patient_id: parse_id("patientId", &self.patient_id)?,
            doctor_id: self.doctor_id.as_deref().map(|id| parse_id("doctorId", id)).transpose()?,
            medical_tests: self
                .medical_tests
                .iter()
                .map(|id| parse_id("medicalTests", id))
                .collect::<Result<_, _>>()?,
            amount_paid: self.amount_paid,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResultEntry {
    pub test_id: String,
    pub value: f64,
    #[serde(default)]
    pub note: Option<String>,
}

impl ResultEntry {
    fn check(&self, errors: &mut Vec<String>, index: usize) {
        check_id(errors, &format!("results[{}].testId", index), &self.test_id);
        if !self.value.is_finite() {
            errors.push(format!("results[{}].value must be a number", index));
        }
    }

    fn into_result(self) -> Result<TestResult, LabError> {
        Ok(TestResult {
            test_id: parse_id("testId", &self.test_id)?,
            value: self.value,
            note: self.note.map(|note| note.trim().to_string()).filter(|note| !note.is_empty()),
        })
    }
}

fn into_results(entries: Vec<ResultEntry>) -> Result<Vec<TestResult>, LabError> {
    entries.into_iter().map(ResultEntry::into_result).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBookingRequest {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub medical_tests: Option<Vec<String>>,
    #[serde(default)]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub amount_paid: Option<f64>,
    #[serde(default)]
    pub results: Option<Vec<ResultEntry>>,
}

impl Validate for UpdateBookingRequest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(patient_id) = &self.patient_id {
            check_id(&mut errors, "patientId", patient_id);
        }
        if let Some(doctor_id) = &self.doctor_id {
            check_id(&mut errors, "doctorId", doctor_id);
        }
        if let Some(tests) = &self.medical_tests {
            if tests.is_empty() {
                errors.push("At least one medical test must be provided if updating medicalTests".to_string());
            }
            for test_id in tests {
                check_id(&mut errors, "medicalTests", test_id);
            }
        }
        if let Some(total) = self.total_price {
            check_non_negative(&mut errors, "totalPrice", total);
        }
        if let Some(paid) = self.amount_paid {
            check_non_negative(&mut errors, "amountPaid", paid);
        }
        if let Some(results) = &self.results {
            for (index, entry) in results.iter().enumerate() {
                entry.check(&mut errors, index);
            }
        }
        errors
    }
}

impl UpdateBookingRequest {
    pub fn into_patch(self) -> Result<BookingPatch, LabError> {
        Ok(BookingPatch {
            patient_id: self.patient_id.as_deref().map(|id| parse_id("patientId", id)).transpose()?,
            doctor_id: self.doctor_id.as_deref().map(|id| parse_id("doctorId", id)).transpose()?,
            medical_tests: self
                .medical_tests
                .map(|ids| ids.iter().map(|id| parse_id("medicalTests", id)).collect::<Result<Vec<_>, _>>())
                .transpose()?,
            total_price: self.total_price,
            amount_paid: self.amount_paid,
            results: self.results.map(into_results).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddResultsRequest {
    pub results: Vec<ResultEntry>,
}

impl Validate for AddResultsRequest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (index, entry) in self.results.iter().enumerate() {
            entry.check(&mut errors, index);
        }
        errors
    }
}

impl AddResultsRequest {
    pub fn into_results(self) -> Result<Vec<TestResult>, LabError> {
        into_results(self.results)
    }
}

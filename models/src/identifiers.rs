// models/src/identifiers.rs

use core::ops::Deref;
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ValidationError, ValidationResult};

/// The internal identifier of every persisted record.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses `value` and reports failures against the named request field.
    pub fn parse_field(field: &'static str, value: &str) -> ValidationResult<Self> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidIdentifier {
                field,
                value: value.to_string(),
            })
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for RecordId {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        Self::parse_field("id", s)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RecordId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

pub const BOOKING_CODE_PREFIX: &str = "BKG-";
const BOOKING_CODE_DIGITS: usize = 10;

/// The short human-shareable code of a booking, `BKG-` followed by ten digits.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BookingCode(String);

impl BookingCode {
    /// Builds a code from its six-digit time suffix and four-digit random part.
    pub fn from_parts(time_suffix: u32, random: u16) -> ValidationResult<Self> {
        if time_suffix > 999_999 || !(1000..=9999).contains(&random) {
            return Err(ValidationError::InvalidBookingCode(format!(
                "{}{}{}",
                BOOKING_CODE_PREFIX, time_suffix, random
            )));
        }
        Ok(Self(format!("{}{:06}{:04}", BOOKING_CODE_PREFIX, time_suffix, random)))
    }

    pub fn new(value: String) -> ValidationResult<Self> {
        let digits = value
            .strip_prefix(BOOKING_CODE_PREFIX)
            .ok_or_else(|| ValidationError::InvalidBookingCode(value.clone()))?;
        if digits.len() != BOOKING_CODE_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidBookingCode(value));
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for BookingCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for BookingCode {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for BookingCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        Self::new(s.trim().to_string())
    }
}

impl fmt::Display for BookingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{BookingCode, RecordId};
    use crate::errors::ValidationError;
    use core::str::FromStr;

    #[test]
    fn should_reject_malformed_record_id() {
        let id = RecordId::parse_field("patientId", "64f1c0ffee");
        assert_eq!(
            id.unwrap_err(),
            ValidationError::InvalidIdentifier {
                field: "patientId",
                value: "64f1c0ffee".to_string()
            }
        );
    }

    #[test]
    fn should_parse_record_id_from_str() {
        let id = RecordId::new();
        let parsed = RecordId::from_str(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn should_pad_booking_code_parts() {
        let code = BookingCode::from_parts(42, 1234).unwrap();
        assert_eq!(code.as_ref(), "BKG-0000421234");
    }

    #[test]
    fn should_reject_out_of_range_random_part() {
        assert!(BookingCode::from_parts(123456, 999).is_err());
        assert!(BookingCode::from_parts(1_000_000, 1000).is_err());
    }

    #[test]
    fn should_validate_booking_code_format() {
        assert!(BookingCode::from_str("BKG-5678901234").is_ok());
        assert!(BookingCode::from_str("BKG-56789").is_err());
        assert!(BookingCode::from_str("XYZ-5678901234").is_err());
        assert!(BookingCode::from_str("BKG-56789O1234").is_err());
    }
}

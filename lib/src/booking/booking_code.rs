// lib/src/booking/booking_code.rs

use chrono::Utc;
use rand::Rng;

use models::identifiers::BookingCode;

use crate::errors::Result;

/// Source of candidate booking codes. Uniqueness is enforced by the storage
/// engine's code index, not by the generator.
pub trait BookingCodeGenerator: Send + Sync + 'static {
    fn generate(&self) -> Result<BookingCode>;
}

/// `BKG-` + last six digits of the current epoch milliseconds + four random digits.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeRandomGenerator;

impl BookingCodeGenerator for TimeRandomGenerator {
    fn generate(&self) -> Result<BookingCode> {
        let time_suffix = Utc::now().timestamp_millis().rem_euclid(1_000_000) as u32;
        let random: u16 = rand::thread_rng().gen_range(1000..=9999);
        Ok(BookingCode::from_parts(time_suffix, random)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::identifiers::BOOKING_CODE_PREFIX;

    #[test]
    fn generated_codes_are_well_formed() {
        for _ in 0..100 {
            let code = TimeRandomGenerator.generate().unwrap();
            assert!(code.starts_with(BOOKING_CODE_PREFIX));
            assert_eq!(code.len(), BOOKING_CODE_PREFIX.len() + 10);
            assert!(code.parse::<BookingCode>().is_ok());
        }
    }
}

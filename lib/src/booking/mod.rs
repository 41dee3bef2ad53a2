// lib/src/booking/mod.rs

pub mod booking_code;
pub mod booking_engine;
pub mod views;

pub use booking_code::{BookingCodeGenerator, TimeRandomGenerator};
pub use booking_engine::{BookingEngine, BookingPatch, NewBooking};
pub use views::{BookingView, ResultView};

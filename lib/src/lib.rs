// lib/src/lib.rs
// Core services of the lab backend. The HTTP surface lives in `rest_api`,
// credentials in `security`.

pub mod booking;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod notifications;
pub mod storage_engine;

pub use crate::booking::{BookingEngine, BookingPatch, BookingView, NewBooking};
pub use crate::catalog::Catalog;
pub use crate::config::LabConfig;
pub use crate::errors::{LabError, Result};
pub use crate::notifications::{dispatch_detached, Notification, Notifier};
pub use crate::storage_engine::{open_storage, LabStorageEngine};

// lib/src/storage_engine/mod.rs

pub mod inmemory_storage;
pub mod sled_storage;
pub mod storage_engine;

use std::sync::Arc;

use bincode::{
    config::{self, BigEndian, Configuration, Fixint},
    serde::{decode_from_slice, encode_to_vec},
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::config::{StorageConfig, StorageEngineType};
use crate::errors::Result;

pub use inmemory_storage::InMemoryStorage;
pub use sled_storage::SledStorage;
pub use storage_engine::{
    BookingFilter, BookingStorageEngine, CatalogStorageEngine, IdentityStorageEngine,
    LabStorageEngine, Mutation,
};

/// Provides a standard bincode configuration.
fn bincode_config() -> Configuration<BigEndian, Fixint> {
    config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}

pub(crate) fn encode_record<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    Ok(encode_to_vec(record, bincode_config())?)
}

pub(crate) fn decode_record<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (record, _): (T, usize) = decode_from_slice(bytes, bincode_config())?;
    Ok(record)
}

/// Opens the storage engine selected in the configuration.
pub fn open_storage(config: &StorageConfig) -> Result<Arc<dyn LabStorageEngine>> {
    match config.engine {
        StorageEngineType::Sled => {
            let path = config.data_directory.join("sled");
            info!("Opening sled storage at {}", path.display());
            Ok(Arc::new(SledStorage::open(&path)?))
        }
        StorageEngineType::InMemory => {
            info!("Using in-memory storage; data is lost on shutdown");
            Ok(Arc::new(InMemoryStorage::new()))
        }
    }
}

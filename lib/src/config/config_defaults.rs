// lib/src/config/config_defaults.rs

use std::path::PathBuf;

use crate::config::config_structs::StorageEngineType;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_REST_API_PORT: u16 = 3000;
pub const DEFAULT_DATA_DIRECTORY: &str = "./data/lab";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;
pub const DEFAULT_RESET_TOKEN_TTL_MINUTES: i64 = 10;
pub const MIN_JWT_SECRET_BYTES: usize = 32;

pub fn default_host() -> String { DEFAULT_HOST.to_string() }
pub fn default_port() -> u16 { DEFAULT_REST_API_PORT }
pub fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

pub fn default_storage_engine_type() -> StorageEngineType { StorageEngineType::Sled }
pub fn default_data_directory() -> PathBuf { PathBuf::from(DEFAULT_DATA_DIRECTORY) }

// Empty on purpose: startup refuses to run until a real secret is configured.
pub fn default_jwt_secret() -> String { String::new() }
pub fn default_token_ttl_hours() -> i64 { DEFAULT_TOKEN_TTL_HOURS }
pub fn default_reset_token_ttl_minutes() -> i64 { DEFAULT_RESET_TOKEN_TTL_MINUTES }

pub fn default_frontend_url() -> String { "http://localhost:5173".to_string() }
pub fn default_public_base_url() -> String { format!("http://{}:{}", DEFAULT_HOST, DEFAULT_REST_API_PORT) }
pub fn default_notification_timeout_secs() -> u64 { 5 }

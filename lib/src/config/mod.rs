// lib/src/config/mod.rs

pub mod config_defaults;
pub mod config_structs;

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

pub use config_defaults::*;
pub use config_structs::{
    AuthConfig, LabConfig, NotificationConfig, ServerConfig, StorageConfig, StorageEngineType,
};

impl LabConfig {
    /// Loads the configuration: YAML file (if any), then `.env` and process
    /// environment overrides. The result is validated before it is returned.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", env_file.display());
        }
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        info!(
            storage = %config.storage.engine,
            port = config.server.port,
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml2::from_str(content).map_err(|e| anyhow!("Invalid YAML configuration: {}", e))
    }

    /// Applies environment overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("LAB_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{}'", port))?;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(engine) = lookup("LAB_STORAGE_ENGINE") {
            self.storage.engine = engine.parse()?;
        }
        if let Some(dir) = lookup("LAB_DATA_DIR") {
            self.storage.data_directory = dir.into();
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(ttl) = lookup("JWT_TTL_HOURS") {
            self.auth.token_ttl_hours = ttl
                .parse()
                .with_context(|| format!("JWT_TTL_HOURS must be an integer, got '{}'", ttl))?;
        }
        if let Some(url) = lookup("FRONT_URL") {
            self.notifications.frontend_url = url;
        }
        if let Some(url) = lookup("BACK_END_URL") {
            self.notifications.public_base_url = url;
        }
        if let Some(url) = lookup("NOTIFY_GATEWAY_URL") {
            self.notifications.gateway_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(anyhow!(
                "JWT secret must be at least {} bytes long (set JWT_SECRET or auth.jwt_secret)",
                MIN_JWT_SECRET_BYTES
            ));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(anyhow!("auth.token_ttl_hours must be positive"));
        }
        if self.auth.reset_token_ttl_minutes <= 0 {
            return Err(anyhow!("auth.reset_token_ttl_minutes must be positive"));
        }
        Ok(())
    }
}

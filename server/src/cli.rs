// server/src/cli.rs

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use lib::config::{LabConfig, StorageEngineType};

// CLI entry point for the lab booking server
#[derive(Parser, Debug)]
#[command(name = "labd")]
#[command(version)]
#[command(about = "Medical laboratory booking server")]
pub struct CliArgs {
    /// YAML configuration file. Environment variables override its values.
    #[arg(short = 'c', long = "config", value_name = "FILE", env = "LAB_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// `sled` or `inmemory`
    #[arg(long = "storage-engine", value_name = "ENGINE")]
    pub storage_engine: Option<String>,

    #[arg(long = "data-dir", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

impl CliArgs {
    /// Command-line flags win over both the file and the environment.
    pub fn apply(&self, config: &mut LabConfig) -> Result<()> {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(engine) = &self.storage_engine {
            config.storage.engine = engine.parse::<StorageEngineType>()?;
        }
        if let Some(dir) = &self.data_dir {
            config.storage.data_directory = dir.clone();
        }
        Ok(())
    }
}

//! `config.toml` storage.
//!
//! A missing or empty file is not an error: it yields the default
//! configuration. Saves replace the file atomically.

use super::atomic::write_atomic;
use crate::paths::MimicPaths;
use mimic_core::config::MimicConfig;
use mimic_core::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads and saves [`MimicConfig`] as TOML.
#[derive(Debug, Clone)]
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// Creates a storage handle for an explicit file path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Storage for `config.toml` under the (optionally overridden) config dir.
    pub fn from_paths(paths: &MimicPaths) -> Result<Self> {
        Ok(Self::new(paths.config_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration, falling back to defaults when the file is
    /// missing or empty.
    pub fn load(&self) -> Result<MimicConfig> {
        if !self.path.exists() {
            tracing::debug!("No config file at {}, using defaults", self.path.display());
            return Ok(MimicConfig::default());
        }
        let content = fs::read_to_string(&self.path)?;
        let config = MimicConfig::from_toml_str(&content)?;
        tracing::debug!("Loaded config from {}", self.path.display());
        Ok(config)
    }

    /// Writes the configuration atomically.
    pub fn save(&self, config: &MimicConfig) -> Result<()> {
        let toml_string = config.to_toml_string()?;
        write_atomic(&self.path, toml_string.as_bytes())?;
        tracing::info!("Saved config to {}", self.path.display());
        Ok(())
    }
}

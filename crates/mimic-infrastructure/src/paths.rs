//! Unified path management for mimic configuration and data files.
//!
//! Every file the tool reads or writes is resolved through [`MimicPaths`], so
//! a single base-path override (used by tests and `--home`) relocates all of
//! them at once.

use mimic_core::secret::{GeminiSecret, SecretConfig};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "mimic";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for mimic_core::MimicError {
    fn from(err: PathError) -> Self {
        mimic_core::MimicError::config(err.to_string())
    }
}

/// Path resolver for mimic.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/mimic/             # Config directory (or the base path override)
/// ├── config.toml              # Tunables (sampler, pipeline, timing, generation)
/// ├── secret.json              # API keys
/// └── personas/                # Persona records
///     └── <subject>/
///         ├── v1.json
///         └── v2.json
/// ```
#[derive(Debug, Clone, Default)]
pub struct MimicPaths {
    base: Option<PathBuf>,
}

impl MimicPaths {
    /// Creates a resolver. With `None` the platform config directory is used.
    pub fn new(base_path: Option<&Path>) -> Self {
        Self {
            base: base_path.map(Path::to_path_buf),
        }
    }

    /// Returns the mimic configuration directory.
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(base) = &self.base {
            return Ok(base.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("secret.json"))
    }

    /// Root directory of the persona record repository.
    pub fn personas_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("personas"))
    }

    /// Ensures the secret file exists, creating it with an empty template if
    /// it doesn't.
    ///
    /// The file is created with permissions 600 on Unix systems.
    pub fn ensure_secret_file(&self) -> Result<PathBuf, std::io::Error> {
        let secret_path = self
            .secret_file()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()))?;

        if secret_path.exists() {
            return Ok(secret_path);
        }
        if let Some(parent) = secret_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = SecretConfig {
            gemini: Some(GeminiSecret {
                api_key: String::new(),
                model_name: None,
            }),
        };
        let template_json = serde_json::to_string_pretty(&template).map_err(std::io::Error::other)?;
        std::fs::write(&secret_path, template_json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&secret_path, permissions)?;
        }

        Ok(secret_path)
    }
}

//! Secret service implementation.
//!
//! Reads API keys from `secret.json`, falling back to the `GEMINI_API_KEY` and
//! `GEMINI_MODEL_NAME` environment variables for values the file leaves
//! empty. Key material never appears in logs or error messages.

use crate::paths::MimicPaths;
use mimic_core::error::{MimicError, Result};
use mimic_core::secret::{GeminiSecret, SecretConfig, SecretService};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const MODEL_NAME_ENV: &str = "GEMINI_MODEL_NAME";

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Service for loading secret configuration.
///
/// The merged configuration is cached after the first successful load.
#[derive(Clone)]
pub struct SecretServiceImpl {
    path: PathBuf,
    env: EnvLookup,
    secrets: Arc<OnceCell<SecretConfig>>,
}

impl SecretServiceImpl {
    pub fn new(paths: &MimicPaths) -> Result<Self> {
        Ok(Self {
            path: paths.secret_file()?,
            env: Arc::new(|key| std::env::var(key).ok()),
            secrets: Arc::new(OnceCell::new()),
        })
    }

    /// Replaces the process environment as the fallback source.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    async fn read_file(&self) -> Result<SecretConfig> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(SecretConfig::default()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                MimicError::config(format!(
                    "{} is not valid secret JSON (line {}, column {})",
                    self.path.display(),
                    e.line(),
                    e.column()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SecretConfig::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn apply_env(&self, mut secrets: SecretConfig) -> SecretConfig {
        let env_key = (self.env)(API_KEY_ENV).filter(|v| !v.trim().is_empty());
        let env_model = (self.env)(MODEL_NAME_ENV).filter(|v| !v.trim().is_empty());

        let gemini = secrets.gemini.get_or_insert_with(GeminiSecret::default);
        if gemini.api_key.trim().is_empty() {
            if let Some(key) = env_key {
                tracing::debug!("Using {} from the environment", API_KEY_ENV);
                gemini.api_key = key;
            }
        }
        if gemini.model_name.is_none() {
            gemini.model_name = env_model;
        }
        if gemini.api_key.is_empty() && gemini.model_name.is_none() {
            secrets.gemini = None;
        }
        secrets
    }
}

#[async_trait::async_trait]
impl SecretService for SecretServiceImpl {
    async fn load_secrets(&self) -> Result<SecretConfig> {
        self.secrets
            .get_or_try_init(|| async {
                let from_file = self.read_file().await?;
                Ok::<_, MimicError>(self.apply_env(from_file))
            })
            .await
            .cloned()
    }

    async fn secret_file_exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[tokio::test]
    async fn test_file_values_win_over_environment() {
        let dir = TempDir::new().unwrap();
        let paths = MimicPaths::new(Some(dir.path()));
        std::fs::write(
            paths.secret_file().unwrap(),
            r#"{"gemini": {"api_key": "file-key", "model_name": "gemini-2.5-pro"}}"#,
        )
        .unwrap();
        let service = SecretServiceImpl::new(&paths)
            .unwrap()
            .with_env_lookup(|_| Some("env-value".to_string()));

        let gemini = service.load_secrets().await.unwrap().gemini.unwrap();
        assert_eq!(gemini.api_key, "file-key");
        assert_eq!(gemini.model_name.as_deref(), Some("gemini-2.5-pro"));
        assert!(service.secret_file_exists().await);
    }

    #[tokio::test]
    async fn test_environment_fills_gaps() {
        let dir = TempDir::new().unwrap();
        let paths = MimicPaths::new(Some(dir.path()));
        std::fs::write(paths.secret_file().unwrap(), r#"{"gemini": {"api_key": ""}}"#).unwrap();
        let service = SecretServiceImpl::new(&paths)
            .unwrap()
            .with_env_lookup(|key| match key {
                API_KEY_ENV => Some("env-key".to_string()),
                MODEL_NAME_ENV => Some("gemini-2.0-flash".to_string()),
                _ => None,
            });

        let gemini = service.load_secrets().await.unwrap().gemini.unwrap();
        assert_eq!(gemini.api_key, "env-key");
        assert_eq!(gemini.model_name.as_deref(), Some("gemini-2.0-flash"));
    }

    #[tokio::test]
    async fn test_nothing_configured() {
        let dir = TempDir::new().unwrap();
        let service = SecretServiceImpl::new(&MimicPaths::new(Some(dir.path())))
            .unwrap()
            .with_env_lookup(no_env);

        assert_eq!(service.load_secrets().await.unwrap(), SecretConfig::default());
        assert!(!service.secret_file_exists().await);
    }

    #[tokio::test]
    async fn test_malformed_file_does_not_echo_content() {
        let dir = TempDir::new().unwrap();
        let paths = MimicPaths::new(Some(dir.path()));
        std::fs::write(paths.secret_file().unwrap(), r#"{"gemini": {"api_key": "sk-secret"#).unwrap();
        let service = SecretServiceImpl::new(&paths).unwrap().with_env_lookup(no_env);

        let err = service.load_secrets().await.unwrap_err();
        assert!(!err.to_string().contains("sk-secret"));
    }
}

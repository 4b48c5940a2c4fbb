pub mod analyze;
pub mod corpus;
pub mod persona;

use anyhow::{Context, Result, bail};
use mimic_application::PersonaUseCase;
use mimic_core::config::MimicConfig;
use mimic_core::generation::TextGenerator;
use mimic_core::message::{Message, participants};
use mimic_core::parser::{self, ExportFormat};
use mimic_infrastructure::{ConfigStorage, JsonPersonaRecordRepository, MimicPaths, SecretServiceImpl};
use mimic_interaction::GeminiClient;
use std::path::Path;
use std::sync::Arc;

/// Resolved paths and configuration shared by every command.
pub struct AppContext {
    pub paths: MimicPaths,
    pub config: MimicConfig,
}

impl AppContext {
    pub fn load(home: Option<&Path>, config_path: Option<&Path>) -> Result<Self> {
        let paths = MimicPaths::new(home);
        let storage = match config_path {
            Some(path) => ConfigStorage::new(path.to_path_buf()),
            None => ConfigStorage::from_paths(&paths)?,
        };
        let config = storage
            .load()
            .with_context(|| format!("Failed to load {}", storage.path().display()))?;
        tracing::debug!("Using config {}", storage.path().display());
        Ok(Self { paths, config })
    }

    /// Gemini client built from secret.json / environment. The model is taken
    /// from `--model`, then `[generation] model`, then the secret file.
    pub async fn generator(&self, model: Option<&str>) -> Result<Arc<dyn TextGenerator>> {
        let secrets = SecretServiceImpl::new(&self.paths)?;
        let model = model.or(self.config.generation.model.as_deref());
        let client = GeminiClient::from_secrets(&secrets, model).await?;
        Ok(Arc::new(client))
    }

    pub fn repository(&self) -> Result<JsonPersonaRecordRepository> {
        Ok(JsonPersonaRecordRepository::new(&self.paths)?)
    }

    pub async fn usecase(&self, model: Option<&str>) -> Result<PersonaUseCase> {
        let generator = self.generator(model).await?;
        Ok(PersonaUseCase::new(
            generator,
            Arc::new(self.repository()?),
            self.config.clone(),
        ))
    }
}

pub fn load_export(path: &Path, format: ExportFormat) -> Result<Vec<Message>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let messages = parser::parse(&raw, format)?;
    if messages.is_empty() {
        bail!("No messages found in {}", path.display());
    }
    Ok(messages)
}

/// Picks the sender to model: the explicit `subject`, or the most active
/// sender that is not `user`.
pub fn resolve_subject(messages: &[Message], subject: Option<&str>, user: Option<&str>) -> Result<String> {
    let senders = participants(messages);
    if let Some(subject) = subject {
        if senders.iter().any(|p| p.name == subject) {
            return Ok(subject.to_string());
        }
        let names: Vec<&str> = senders.iter().map(|p| p.name.as_str()).collect();
        bail!("'{}' does not appear in the export (senders: {})", subject, names.join(", "));
    }
    senders
        .into_iter()
        .find(|p| Some(p.name.as_str()) != user)
        .map(|p| p.name)
        .context("The export has no sender other than the user")
}

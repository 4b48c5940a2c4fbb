//! File-backed persona record repository.
//!
//! One JSON file per version; a version is never rewritten once saved.
//!
//! ```text
//! base_dir/
//! └── personas/
//!     └── <subject_id>/
//!         ├── v1.json
//!         ├── v2.json
//!         └── v3.json
//! ```

use crate::paths::MimicPaths;
use crate::storage::write_atomic_async;
use mimic_core::error::{MimicError, Result};
use mimic_core::record::{LearnedFact, PersonaRecord, PersonaRecordRepository};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const ENTITY_NAME: &str = "persona";

/// Persona records stored as versioned JSON files.
pub struct JsonPersonaRecordRepository {
    root: PathBuf,
    /// Serialises writers so version numbers stay unique within a process
    write_lock: Mutex<()>,
}

impl JsonPersonaRecordRepository {
    /// Repository under the default (or overridden) config directory.
    pub fn new(paths: &MimicPaths) -> Result<Self> {
        Ok(Self::at(paths.personas_dir()?))
    }

    /// Repository rooted at an explicit directory.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Subject IDs that have at least one stored version.
    pub async fn subjects(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut subjects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_subject_id(name).is_ok() && !self.version_numbers(name).await?.is_empty() {
                    subjects.push(name.to_string());
                }
            }
        }
        subjects.sort();
        Ok(subjects)
    }

    fn subject_dir(&self, subject_id: &str) -> Result<PathBuf> {
        validate_subject_id(subject_id)?;
        Ok(self.root.join(subject_id))
    }

    fn version_path(&self, subject_id: &str, version: u32) -> Result<PathBuf> {
        Ok(self.subject_dir(subject_id)?.join(format!("v{version}.json")))
    }

    /// Stored version numbers in ascending order.
    async fn version_numbers(&self, subject_id: &str) -> Result<Vec<u32>> {
        let dir = self.subject_dir(subject_id)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(version) = name.to_str().and_then(parse_version_file_name) {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    async fn read_record(&self, path: &Path) -> Result<PersonaRecord> {
        let content = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(|e| MimicError::Serialization {
            format: "JSON".to_string(),
            message: format!("{}: {}", path.display(), e),
        })
    }

    async fn save_locked(&self, record: &PersonaRecord) -> Result<()> {
        let path = self.version_path(&record.subject_id, record.version)?;
        if tokio::fs::try_exists(&path).await? {
            return Err(MimicError::internal(format!(
                "{} {} v{} already exists",
                ENTITY_NAME, record.subject_id, record.version
            )));
        }
        let json = serde_json::to_string_pretty(record)?;
        write_atomic_async(&path, json.as_bytes()).await?;
        tracing::info!(
            "Saved {} {} v{} to {}",
            ENTITY_NAME,
            record.subject_id,
            record.version,
            path.display()
        );
        Ok(())
    }

    async fn latest_unlocked(&self, subject_id: &str) -> Result<Option<PersonaRecord>> {
        match self.version_numbers(subject_id).await?.last() {
            Some(&version) => {
                let path = self.version_path(subject_id, version)?;
                Ok(Some(self.read_record(&path).await?))
            }
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl PersonaRecordRepository for JsonPersonaRecordRepository {
    async fn save(&self, record: &PersonaRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.save_locked(record).await
    }

    async fn latest(&self, subject_id: &str) -> Result<Option<PersonaRecord>> {
        self.latest_unlocked(subject_id).await
    }

    async fn get(&self, subject_id: &str, version: u32) -> Result<Option<PersonaRecord>> {
        let path = self.version_path(subject_id, version)?;
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(self.read_record(&path).await?))
    }

    async fn list_versions(&self, subject_id: &str) -> Result<Vec<PersonaRecord>> {
        let mut records = Vec::new();
        for version in self.version_numbers(subject_id).await? {
            let path = self.version_path(subject_id, version)?;
            records.push(self.read_record(&path).await?);
        }
        Ok(records)
    }

    async fn append_facts(&self, subject_id: &str, facts: Vec<LearnedFact>) -> Result<PersonaRecord> {
        let _guard = self.write_lock.lock().await;
        let latest = self
            .latest_unlocked(subject_id)
            .await?
            .ok_or_else(|| MimicError::not_found(ENTITY_NAME, subject_id))?;
        let next = latest.with_facts(facts);
        self.save_locked(&next).await?;
        Ok(next)
    }
}

/// Subject IDs become directory names, so they are restricted to a safe set.
fn validate_subject_id(subject_id: &str) -> Result<()> {
    let valid = !subject_id.is_empty()
        && !subject_id.starts_with('.')
        && subject_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(MimicError::config(format!(
            "invalid subject id '{subject_id}': use letters, digits, '-', '_' or '.'"
        )))
    }
}

/// `v12.json` → 12
fn parse_version_file_name(name: &str) -> Option<u32> {
    name.strip_prefix('v')?.strip_suffix(".json")?.parse().ok()
}

/// Derives a subject ID from a display name: lowercase ASCII alphanumerics
/// with single dashes in between.
pub fn subject_id_from_name(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            id.push(c.to_ascii_lowercase());
        } else if !id.is_empty() && !id.ends_with('-') {
            id.push('-');
        }
    }
    let id = id.trim_end_matches('-').to_string();
    if id.is_empty() { "subject".to_string() } else { id }
}

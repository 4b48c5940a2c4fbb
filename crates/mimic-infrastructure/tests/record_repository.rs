use chrono::Utc;
use mimic_core::fragment::StyleParams;
use mimic_core::profile::AttachmentStyle;
use mimic_core::prompt::PersonaPrompt;
use mimic_core::record::{LearnedFact, PersonaRecord, PersonaRecordRepository};
use mimic_infrastructure::{JsonPersonaRecordRepository, MimicPaths};
use std::collections::BTreeMap;
use tempfile::TempDir;

fn record(subject_id: &str) -> PersonaRecord {
    let mut categories = BTreeMap::new();
    categories.insert("identity".to_string(), true);
    categories.insert("family".to_string(), false);
    let prompt = PersonaPrompt {
        text: "You are Sam.".to_string(),
        token_count: 4,
        categories_analyzed: categories,
    };
    PersonaRecord::from_prompt(
        subject_id,
        prompt,
        12.5,
        StyleParams::new(AttachmentStyle::Avoidant, 7),
    )
}

fn fact(text: &str) -> LearnedFact {
    LearnedFact {
        fact: text.to_string(),
        confidence: 0.8,
        source_run_id: "run-1".to_string(),
        learned_at: Utc::now(),
    }
}

fn repository(dir: &TempDir) -> JsonPersonaRecordRepository {
    JsonPersonaRecordRepository::new(&MimicPaths::new(Some(dir.path()))).unwrap()
}

#[tokio::test]
async fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let repo = repository(&dir);
    let saved = record("sam");

    repo.save(&saved).await.unwrap();

    let path = dir.path().join("personas").join("sam").join("v1.json");
    assert!(path.exists());
    assert_eq!(repo.latest("sam").await.unwrap(), Some(saved.clone()));
    assert_eq!(repo.get("sam", 1).await.unwrap(), Some(saved));
    assert_eq!(repo.get("sam", 2).await.unwrap(), None);
    assert_eq!(repo.latest("alex").await.unwrap(), None);
}

#[tokio::test]
async fn test_versions_are_never_overwritten() {
    let dir = TempDir::new().unwrap();
    let repo = repository(&dir);
    repo.save(&record("sam")).await.unwrap();

    let mut changed = record("sam");
    changed.prompt_text = "Something else".to_string();
    assert!(repo.save(&changed).await.is_err());
    assert_eq!(
        repo.get("sam", 1).await.unwrap().unwrap().prompt_text,
        "You are Sam."
    );
}

#[tokio::test]
async fn test_append_facts_writes_new_version() {
    let dir = TempDir::new().unwrap();
    let repo = repository(&dir);
    repo.save(&record("sam")).await.unwrap();

    let v2 = repo.append_facts("sam", vec![fact("Has a dog")]).await.unwrap();
    let v3 = repo.append_facts("sam", vec![fact("Runs marathons")]).await.unwrap();

    assert_eq!(v2.version, 2);
    assert_eq!(v3.version, 3);
    assert_eq!(v3.learned_facts.len(), 2);
    assert_eq!(v3.prompt_text, "You are Sam.");
    assert_eq!(v3.style, StyleParams::new(AttachmentStyle::Avoidant, 7));

    let v1 = repo.get("sam", 1).await.unwrap().unwrap();
    assert!(v1.learned_facts.is_empty());

    let versions: Vec<u32> = repo
        .list_versions("sam")
        .await
        .unwrap()
        .iter()
        .map(|r| r.version)
        .collect();
    assert_eq!(versions, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_versions_sort_numerically() {
    let dir = TempDir::new().unwrap();
    let repo = repository(&dir);
    for version in [1, 2, 10, 9] {
        let mut r = record("sam");
        r.version = version;
        repo.save(&r).await.unwrap();
    }

    assert_eq!(repo.latest("sam").await.unwrap().unwrap().version, 10);
    let versions: Vec<u32> = repo
        .list_versions("sam")
        .await
        .unwrap()
        .iter()
        .map(|r| r.version)
        .collect();
    assert_eq!(versions, vec![1, 2, 9, 10]);
}

#[tokio::test]
async fn test_append_facts_requires_existing_subject() {
    let dir = TempDir::new().unwrap();
    let repo = repository(&dir);

    let err = repo
        .append_facts("nobody", vec![fact("x")])
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_subjects_and_invalid_ids() {
    let dir = TempDir::new().unwrap();
    let repo = repository(&dir);
    repo.save(&record("sam")).await.unwrap();
    repo.save(&record("alex")).await.unwrap();
    std::fs::create_dir_all(dir.path().join("personas").join("empty")).unwrap();

    assert_eq!(repo.subjects().await.unwrap(), vec!["alex", "sam"]);
    assert!(repo.save(&record("../escape")).await.is_err());
    assert!(repo.latest("a/b").await.is_err());
}

#[tokio::test]
async fn test_missing_style_defaults_when_reading_older_files() {
    let dir = TempDir::new().unwrap();
    let repo = repository(&dir);
    let subject_dir = dir.path().join("personas").join("old");
    std::fs::create_dir_all(&subject_dir).unwrap();
    std::fs::write(
        subject_dir.join("v1.json"),
        r#"{
  "subject_id": "old",
  "prompt_text": "You are Old.",
  "token_count": 3,
  "version": 1,
  "analysis_duration_seconds": 1.0,
  "categories_analyzed": {},
  "created_at": "2024-01-01T00:00:00Z"
}"#,
    )
    .unwrap();

    let loaded = repo.latest("old").await.unwrap().unwrap();
    assert_eq!(loaded.style, StyleParams::default());
    assert!(loaded.learned_facts.is_empty());
}

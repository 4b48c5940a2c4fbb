mod common;

use common::{FULL_PROFILE_JSON, MemoryRepository, ScriptedGenerator, chat, fast_config, reply};
use mimic_application::{AnalysisRequest, ConversationTurn, PersonaUseCase};
use mimic_core::profile::StageKind;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const FACTS_JSON: &str = r#"{"facts": [{"fact": "Is moving to Lisbon in June", "confidence": 0.9}]}"#;

fn request() -> AnalysisRequest {
    AnalysisRequest {
        subject: "Sam".to_string(),
        messages: chat(40),
        identity_attachment: None,
    }
}

fn analysis_script() -> Vec<common::Step> {
    (0..StageKind::ALL.len())
        .map(|_| reply(FULL_PROFILE_JSON))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_versions_accumulate_across_analyze_and_learn() {
    let mut script = analysis_script();
    script.push(reply(FACTS_JSON));
    script.push(reply("nothing new here"));
    script.extend(analysis_script());
    let generator = Arc::new(ScriptedGenerator::scripted(script, reply("ok")));
    let repository = Arc::new(MemoryRepository::default());
    let usecase = PersonaUseCase::new(generator.clone(), repository, fast_config());

    let (first, outcome) = usecase
        .analyze("sam", request(), None, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.version, 1);
    assert_eq!(first.prompt_text, outcome.prompt.text);
    assert_eq!(first.style, outcome.style);

    let learned = usecase
        .learn("sam", "Sam", &chat(3))
        .await
        .unwrap()
        .expect("facts were learned");
    assert_eq!(learned.version, 2);
    assert_eq!(learned.prompt_text, first.prompt_text);
    assert_eq!(learned.learned_facts.len(), 1);

    assert!(usecase.learn("sam", "Sam", &chat(3)).await.unwrap().is_none());

    let (third, _) = usecase
        .analyze("sam", request(), None, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(third.version, 3);
    assert_eq!(third.learned_facts, learned.learned_facts);

    let versions: Vec<u32> = usecase
        .history("sam")
        .await
        .unwrap()
        .iter()
        .map(|r| r.version)
        .collect();
    assert_eq!(versions, vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_reply_uses_latest_version_with_facts() {
    let mut script = analysis_script();
    script.push(reply(FACTS_JSON));
    let generator = Arc::new(ScriptedGenerator::scripted(
        script,
        reply("You: haha no way. tell me everything"),
    ));
    let repository = Arc::new(MemoryRepository::default());
    let usecase = PersonaUseCase::new(generator.clone(), repository, fast_config());

    usecase
        .analyze("sam", request(), None, CancellationToken::new())
        .await
        .unwrap();
    usecase.learn("sam", "Sam", &chat(3)).await.unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    let history = vec![
        ConversationTurn::user("guess what"),
        ConversationTurn::persona("what??"),
    ];
    let plan = usecase
        .reply("sam", &history, "I got the job", &mut rng)
        .await
        .unwrap();

    assert_eq!(plan.text, "haha no way. tell me everything");
    let joined: String = plan.fragments.iter().map(|f| f.text.as_str()).collect();
    assert_eq!(joined, plan.text);

    let last = generator.requests().pop().unwrap();
    let instruction = last.system_instruction.unwrap();
    assert!(instruction.contains("Is moving to Lisbon in June"));
    assert!(last.prompt.ends_with("Them: I got the job\nYou:"));
}

#[tokio::test]
async fn test_unknown_subject_is_not_found() {
    let generator = Arc::new(ScriptedGenerator::always(reply("ok")));
    let usecase = PersonaUseCase::new(
        generator.clone(),
        Arc::new(MemoryRepository::default()),
        fast_config(),
    );
    let mut rng = StdRng::seed_from_u64(1);

    let err = usecase.reply("nobody", &[], "hi", &mut rng).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(usecase.learn("nobody", "Nobody", &chat(2)).await.unwrap_err().is_not_found());
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_analysis_stores_nothing() {
    let generator = Arc::new(ScriptedGenerator::always(reply(FULL_PROFILE_JSON)));
    let usecase = PersonaUseCase::new(
        generator,
        Arc::new(MemoryRepository::default()),
        fast_config(),
    );
    let request = AnalysisRequest {
        messages: chat(3),
        ..request()
    };

    let err = usecase
        .analyze("sam", request, None, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_insufficient_data());
    assert!(usecase.history("sam").await.unwrap().is_empty());
}

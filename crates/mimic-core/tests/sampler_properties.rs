use chrono::{DateTime, Duration, TimeZone, Utc};
use mimic_core::Message;
use mimic_core::config::SamplerConfig;
use mimic_core::sampler::{Sampler, Strategy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

const WORDS: &[&str] = &[
    "pizza", "tonight", "work", "late", "again", "train", "weekend", "movie", "tired", "funny",
    "love", "sorry", "mom", "birthday", "angry", "miss you", "coffee", "rain", "gym", "call",
];

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 6, 1, 8, 0, 0).unwrap()
}

/// Synthetic two-person chat with a realistic mix of filler, media and long
/// messages spread over roughly a year.
fn synthetic_chat(len: usize, seed: u64) -> Vec<Message> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut when = start();
    (0..len)
        .map(|i| {
            when += Duration::minutes(rng.gen_range(1..600));
            let sender = if rng.gen_bool(0.5) { "Alex" } else { "Sam" };
            match rng.gen_range(0..10) {
                0 => Message::new(when, sender, "ok"),
                1 => Message::media(when, sender),
                _ => {
                    let words = rng.gen_range(1..40);
                    let content = (0..words)
                        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
                        .collect::<Vec<_>>()
                        .join(" ");
                    Message::new(when, sender, format!("{content} {i}"))
                }
            }
        })
        .collect()
}

fn sampler(target: usize, seed: u64) -> Sampler {
    Sampler::new(SamplerConfig {
        target_tokens: target,
        seed,
        anchor_start_count: 50,
        anchor_end_count: 80,
        longest_count: 120,
        ..SamplerConfig::default()
    })
}

#[test]
fn test_identity_below_target() {
    let messages = synthetic_chat(300, 1);
    let sampler = sampler(usize::MAX / 2, 42);
    let result = sampler.sample(&messages);

    assert_eq!(result.messages, messages);
    assert!(!result.stats.sampled);
    assert_eq!(result.stats.original_tokens, result.stats.estimated_tokens);
}

#[test]
fn test_budget_respected_with_anchor_tolerance() {
    for (len, target, seed) in [(3_000, 5_000, 1), (8_000, 20_000, 2), (1_000, 300, 3), (50, 100, 4)] {
        let messages = synthetic_chat(len, seed);
        let sampler = sampler(target, seed);
        let estimator = sampler.estimator();
        let original = estimator.messages(&messages);
        assert!(original > target + sampler.overshoot_tolerance(&messages));

        let result = sampler.sample(&messages);
        let produced = estimator.messages(&result.messages);

        assert!(result.stats.sampled);
        assert_eq!(produced, result.stats.estimated_tokens);
        assert!(
            produced <= target + sampler.overshoot_tolerance(&messages),
            "len {len}: produced {produced} tokens for target {target}"
        );
        assert!(produced < original);
        assert!(result.budget.planned_total() <= target.max(result.budget.allocation(Strategy::Anchors)));
    }
}

#[test]
fn test_first_and_last_tenth_are_covered() {
    for len in [20, 57, 400, 5_000] {
        let messages = synthetic_chat(len, len as u64);
        let target = messages.len() * 3;
        let result = sampler(target, 9).sample(&messages);
        let kept: HashSet<_> = result.messages.iter().map(Message::dedup_key).collect();

        let tenth = (len / 10).max(1);
        assert!(messages[..tenth].iter().any(|m| kept.contains(&m.dedup_key())));
        assert!(messages[len - tenth..].iter().any(|m| kept.contains(&m.dedup_key())));
        assert_eq!(result.messages.first(), messages.first());
        assert_eq!(result.messages.last(), messages.last());
    }
}

#[test]
fn test_deterministic_for_fixed_seed() {
    let messages = synthetic_chat(4_000, 11);
    let a = sampler(6_000, 99).sample(&messages);
    let b = sampler(6_000, 99).sample(&messages);
    assert_eq!(a.messages, b.messages);
    assert_eq!(a.stats, b.stats);
}

#[test]
fn test_output_has_no_duplicates_and_is_chronological() {
    let mut messages = synthetic_chat(2_000, 5);
    // Exports occasionally repeat whole blocks.
    let repeated: Vec<Message> = messages[500..700].to_vec();
    messages.extend(repeated);

    let result = sampler(4_000, 5).sample(&messages);
    let attributed: usize = result.stats.strategy_tokens.values().sum();
    assert_eq!(attributed, result.stats.estimated_tokens);
    let mut seen = HashSet::new();
    for message in &result.messages {
        assert!(seen.insert(message.dedup_key()), "duplicate {:?}", message);
    }
    assert!(
        result
            .messages
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    );
}

#[test]
fn test_filler_and_media_only_enter_as_anchors() {
    let messages = synthetic_chat(3_000, 8);
    let sampler = sampler(5_000, 8);
    let result = sampler.sample(&messages);

    let first = messages.first().map(|m| m.timestamp);
    let last = messages.last().map(|m| m.timestamp);
    let anchor_window = 50 + 80;
    let low_value = result
        .messages
        .iter()
        .filter(|m| m.content == "ok" || m.is_media_only())
        .filter(|m| Some(m.timestamp) != first && Some(m.timestamp) != last)
        .count();
    assert!(low_value <= anchor_window);
}

#[test]
fn test_budget_holds_with_several_messages_in_final_minute() {
    let mut messages = synthetic_chat(40, 12);
    let final_minute = messages[39].timestamp + Duration::minutes(3);
    messages.push(Message::new(final_minute, "Alex", "k"));
    messages.push(Message::new(final_minute, "Sam", "so ".repeat(134)));

    let sampler = sampler(20, 12);
    let result = sampler.sample(&messages);

    assert!(result.stats.sampled);
    assert_eq!(result.messages.last(), messages.last());
    assert!(
        result.stats.estimated_tokens <= 20 + sampler.overshoot_tolerance(&messages),
        "produced {} tokens",
        result.stats.estimated_tokens
    );
}

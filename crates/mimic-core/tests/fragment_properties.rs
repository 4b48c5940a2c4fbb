use mimic_core::config::TimingConfig;
use mimic_core::fragment::{StyleParams, fragment, initial_delay};
use mimic_core::profile::AttachmentStyle;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const PIECES: &[&str] = &[
    "ok so", "honestly", "I can't believe it", "lol", "...", "!", "?", ".", ",", ";", "\n",
    " ", "  ", "3.50", "example.com", "we should go", "tomorrow", "…", "😂", "why", "wait",
];

fn random_reply(rng: &mut StdRng) -> String {
    let parts = rng.gen_range(0..60);
    (0..parts)
        .map(|_| PIECES[rng.gen_range(0..PIECES.len())])
        .collect::<Vec<_>>()
        .join(if rng.gen_bool(0.7) { " " } else { "" })
}

fn styles() -> Vec<StyleParams> {
    [
        AttachmentStyle::Secure,
        AttachmentStyle::Anxious,
        AttachmentStyle::Avoidant,
        AttachmentStyle::FearfulAvoidant,
    ]
    .into_iter()
    .flat_map(|a| [1, 5, 10].map(|c| StyleParams::new(a, c)))
    .collect()
}

#[test]
fn test_fragments_reproduce_reply_exactly() {
    let mut rng = StdRng::seed_from_u64(2024);
    let config = TimingConfig::default();
    for _ in 0..500 {
        let reply = random_reply(&mut rng);
        for style in styles() {
            let fragments = fragment(&reply, &style, &config, &mut rng);
            let joined: String = fragments.iter().map(|f| f.text.as_str()).collect();
            assert_eq!(joined, reply);
            assert!(!fragments.is_empty());
            assert!(fragments.len() <= config.max_fragments);
        }
    }
}

#[test]
fn test_forty_char_reply_is_one_fragment_without_delay() {
    let reply = "cant wait to see you and the dog tonight";
    assert_eq!(reply.chars().count(), 40);
    let mut rng = StdRng::seed_from_u64(1);
    let fragments = fragment(reply, &StyleParams::default(), &TimingConfig::default(), &mut rng);
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].delay_ms, 0);
    assert_eq!(fragments[0].text, reply);
}

#[test]
fn test_delays_bounded_under_extreme_configuration() {
    let config = TimingConfig {
        fragment_base_ms: u64::MAX / 4,
        per_char_ms: 10_000,
        fragment_jitter: 5.0,
        initial_base_ms: 0,
        initial_jitter: f64::NAN,
        ..TimingConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(3);
    let long = "This keeps going. ".repeat(200);
    for style in styles() {
        for f in fragment(&long, &style, &config, &mut rng) {
            assert!(f.delay_ms >= config.fragment_min_ms);
            assert!(f.delay_ms <= config.fragment_max_ms);
        }
        let delay = initial_delay("I hate this, why", &style, &config, &mut rng);
        assert_eq!(delay, config.initial_min_ms);
    }
}

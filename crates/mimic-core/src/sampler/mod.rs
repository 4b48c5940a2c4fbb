//! Token-budgeted corpus sampling.
//!
//! Reduces a message sequence to a bounded subset that keeps as much
//! information as possible under a token ceiling. When the corpus already fits
//! it is returned unchanged.
//!
//! Selection runs in four strategies over the chronologically sorted corpus:
//!
//! 1. **Anchors**: fixed-size slices from the start and end. The very first
//!    and very last message are always kept; they are the only tokens that may
//!    push the sample past its target.
//! 2. **Longest**: the longest informative messages.
//! 3. **Emotional**: lexicon matches ranked by importance.
//! 4. **Stratified**: the middle of the timeline cut into equal-width time
//!    strata, each contributing its most important messages.
//!
//! Exact repeats, keyed by `(timestamp, sender, content)`, are dropped before
//! any strategy runs so they never consume allocation. Unused allocation rolls
//! forward to the next strategy. The union is kept in chronological order.

mod budget;
mod importance;

use crate::config::SamplerConfig;
use crate::lexicon::{FillerSet, KeywordMatcher};
use crate::message::Message;
use crate::token::TokenEstimator;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub use budget::{SampleBudget, Strategy};
pub use importance::{ImportanceScorer, edge_len};

/// Counters describing one sampling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingStats {
    pub total_messages: usize,
    pub messages_included: usize,
    /// Estimated tokens of the full corpus
    pub original_tokens: usize,
    /// Estimated tokens of the returned messages
    pub estimated_tokens: usize,
    /// Tokens contributed by each strategy (empty when nothing was sampled)
    pub strategy_tokens: BTreeMap<Strategy, usize>,
    /// False for the identity case
    pub sampled: bool,
}

/// Result of [`Sampler::sample`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledCorpus {
    pub messages: Vec<Message>,
    pub stats: SamplingStats,
    pub budget: SampleBudget,
}

/// Deterministic, seedable corpus sampler.
#[derive(Debug, Clone)]
pub struct Sampler {
    config: SamplerConfig,
    estimator: TokenEstimator,
    scorer: ImportanceScorer,
}

/// Running selection state shared by the strategies.
struct Selection {
    selected: Vec<bool>,
    strategy_tokens: BTreeMap<Strategy, usize>,
}

impl Selection {
    fn new(len: usize) -> Self {
        Self {
            selected: vec![false; len],
            strategy_tokens: BTreeMap::new(),
        }
    }

    fn take(&mut self, position: usize, tokens: usize, strategy: Strategy) {
        self.selected[position] = true;
        *self.strategy_tokens.entry(strategy).or_default() += tokens;
    }

    fn spent(&self, strategy: Strategy) -> usize {
        self.strategy_tokens.get(&strategy).copied().unwrap_or_default()
    }
}

impl Sampler {
    pub fn new(config: SamplerConfig) -> Self {
        let estimator = TokenEstimator::new(config.chars_per_token);
        let scorer = ImportanceScorer::new(
            config.importance.clone(),
            KeywordMatcher::new(&config.emotional_keywords),
            FillerSet::new(&config.filler_messages),
        );
        Self {
            config,
            estimator,
            scorer,
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn estimator(&self) -> TokenEstimator {
        self.estimator
    }

    /// Samples against the configured target.
    pub fn sample(&self, messages: &[Message]) -> SampledCorpus {
        self.sample_with_target(messages, self.config.target_tokens)
    }

    /// Samples against an explicit token target.
    pub fn sample_with_target(&self, messages: &[Message], target_tokens: usize) -> SampledCorpus {
        let original_tokens = self.estimator.messages(messages);

        if original_tokens <= target_tokens {
            tracing::debug!(
                target: "sampler",
                "Corpus of {} tokens fits target {}, no sampling applied",
                original_tokens,
                target_tokens
            );
            return SampledCorpus {
                messages: messages.to_vec(),
                stats: SamplingStats {
                    total_messages: messages.len(),
                    messages_included: messages.len(),
                    original_tokens,
                    estimated_tokens: original_tokens,
                    strategy_tokens: BTreeMap::new(),
                    sampled: false,
                },
                budget: SampleBudget::new(target_tokens),
            };
        }

        let sorted = chronological(messages);
        let tokens: Vec<usize> = sorted.iter().map(|m| self.estimator.message(m)).collect();
        let len = sorted.len();

        let mut selection = Selection::new(len);
        self.select_anchors(&tokens, target_tokens, &mut selection);

        let budget = SampleBudget::plan(
            target_tokens,
            selection.spent(Strategy::Anchors),
            self.config.longest_share,
            self.config.emotional_share,
            self.config.stratified_share,
        );

        let scores: Vec<f64> = sorted
            .iter()
            .enumerate()
            .map(|(position, m)| self.scorer.score(m, position, len))
            .collect();

        let mut carry = budget.allocation(Strategy::Longest);
        self.select_longest(&sorted, &tokens, carry, &mut selection);
        carry = carry - selection.spent(Strategy::Longest) + budget.allocation(Strategy::Emotional);
        self.select_emotional(&sorted, &tokens, &scores, carry, &mut selection);
        carry = carry - selection.spent(Strategy::Emotional) + budget.allocation(Strategy::Stratified);
        self.select_stratified(&sorted, &tokens, &scores, carry, &mut selection);

        let mut sampled = Vec::new();
        let mut estimated_tokens = 0usize;
        for (position, message) in sorted.iter().enumerate() {
            if selection.selected[position] {
                estimated_tokens += tokens[position];
                sampled.push((*message).clone());
            }
        }

        tracing::info!(
            target: "sampler",
            "Sampled {} of {} messages ({} distinct, {} of {} estimated tokens, target {})",
            sampled.len(),
            messages.len(),
            len,
            estimated_tokens,
            original_tokens,
            target_tokens
        );

        SampledCorpus {
            stats: SamplingStats {
                total_messages: messages.len(),
                messages_included: sampled.len(),
                original_tokens,
                estimated_tokens,
                strategy_tokens: selection.strategy_tokens,
                sampled: true,
            },
            messages: sampled,
            budget,
        }
    }

    /// Largest overshoot the sample may have for a given corpus: the tokens of
    /// the first and last message in sampling order, which are always kept.
    pub fn overshoot_tolerance(&self, messages: &[Message]) -> usize {
        let sorted = chronological(messages);
        match (sorted.first(), sorted.last()) {
            (Some(first), Some(last)) => self.estimator.message(first) + self.estimator.message(last),
            _ => 0,
        }
    }

    fn select_anchors(&self, tokens: &[usize], target: usize, selection: &mut Selection) {
        let len = tokens.len();
        if len == 0 {
            return;
        }
        let share = self.config.anchor_token_share.clamp(0.0, 0.5);
        let cap = (target as f64 * share).floor() as usize;

        selection.take(0, tokens[0], Strategy::Anchors);
        let mut start_tokens = tokens[0];
        for position in 1..self.config.anchor_start_count.min(len) {
            if start_tokens + tokens[position] > cap {
                break;
            }
            start_tokens += tokens[position];
            selection.take(position, tokens[position], Strategy::Anchors);
        }

        let last = len - 1;
        if selection.selected[last] {
            return;
        }
        selection.take(last, tokens[last], Strategy::Anchors);
        let mut end_tokens = tokens[last];
        let end_count = self.config.anchor_end_count.min(len);
        for position in (len - end_count..last).rev() {
            if selection.selected[position] || end_tokens + tokens[position] > cap {
                break;
            }
            end_tokens += tokens[position];
            selection.take(position, tokens[position], Strategy::Anchors);
        }
    }

    fn select_longest(
        &self,
        sorted: &[&Message],
        tokens: &[usize],
        allocation: usize,
        selection: &mut Selection,
    ) {
        let mut candidates: Vec<usize> = (0..sorted.len())
            .filter(|&p| !selection.selected[p] && self.scorer.is_informative(sorted[p]))
            .collect();
        candidates.sort_by(|&a, &b| tokens[b].cmp(&tokens[a]).then(a.cmp(&b)));
        candidates.truncate(self.config.longest_count);

        let mut spent = 0usize;
        for position in candidates {
            if spent + tokens[position] <= allocation {
                spent += tokens[position];
                selection.take(position, tokens[position], Strategy::Longest);
            }
        }
    }

    fn select_emotional(
        &self,
        sorted: &[&Message],
        tokens: &[usize],
        scores: &[f64],
        allocation: usize,
        selection: &mut Selection,
    ) {
        let mut candidates: Vec<usize> = (0..sorted.len())
            .filter(|&p| {
                !selection.selected[p]
                    && self.scorer.is_informative(sorted[p])
                    && self.scorer.keyword_hits(sorted[p]) > 0
            })
            .collect();
        candidates.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

        let mut spent = 0usize;
        for position in candidates {
            if spent + tokens[position] <= allocation {
                spent += tokens[position];
                selection.take(position, tokens[position], Strategy::Emotional);
            }
        }
    }

    fn select_stratified(
        &self,
        sorted: &[&Message],
        tokens: &[usize],
        scores: &[f64],
        allocation: usize,
        selection: &mut Selection,
    ) {
        let len = sorted.len();
        let edge = edge_len(len, self.config.importance.edge_fraction);
        let (lo, hi) = (edge, len.saturating_sub(edge));
        if lo >= hi {
            return;
        }
        let strata = build_strata(&sorted[lo..hi], self.config.strata_count.max(1));
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let mut remaining = allocation;
        let strata_count = strata.len();
        for (index, stratum) in strata.into_iter().enumerate() {
            let share = remaining / (strata_count - index);
            let mut candidates: Vec<usize> = stratum
                .into_iter()
                .map(|offset| lo + offset)
                .filter(|&p| !selection.selected[p] && self.scorer.is_informative(sorted[p]))
                .collect();
            // Seeded shuffle first so the stable sort breaks ties reproducibly.
            candidates.shuffle(&mut rng);
            candidates.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

            let mut spent = 0usize;
            for position in candidates {
                if spent + tokens[position] <= share {
                    spent += tokens[position];
                    selection.take(position, tokens[position], Strategy::Stratified);
                }
            }
            remaining -= spent;
        }
    }
}

/// Sampling order: stable by timestamp, so equal timestamps keep export order,
/// with exact repeats removed. Repeats need not be adjacent when timestamps tie.
fn chronological(messages: &[Message]) -> Vec<&Message> {
    let mut sorted: Vec<&Message> = messages.iter().collect();
    sorted.sort_by_key(|m| m.timestamp);
    let mut seen = HashSet::new();
    sorted.retain(|m| seen.insert(m.dedup_key()));
    sorted
}

/// Splits a chronologically sorted slice into `count` equal-width time strata.
///
/// Returns offsets into the slice. Falls back to equal-size index strata when
/// all messages share one timestamp.
fn build_strata(middle: &[&Message], count: usize) -> Vec<Vec<usize>> {
    let mut strata = vec![Vec::new(); count];
    let (Some(first), Some(last)) = (middle.first(), middle.last()) else {
        return strata;
    };
    let start = first.timestamp.timestamp_millis();
    let span = last.timestamp.timestamp_millis() - start;

    for (offset, message) in middle.iter().enumerate() {
        let index = if span > 0 {
            let elapsed = (message.timestamp.timestamp_millis() - start) as f64;
            ((elapsed / span as f64) * count as f64) as usize
        } else {
            offset * count / middle.len()
        };
        strata[index.min(count - 1)].push(offset);
    }
    strata
}

//! Token budget planning for the sampler.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Message selection strategies, in the order they run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Strategy {
    /// Fixed slices from the chronological start and end
    Anchors,
    /// Longest messages by estimated tokens
    Longest,
    /// Emotional-lexicon matches ranked by importance
    Emotional,
    /// Highest-importance messages per time stratum
    Stratified,
}

/// Token ceiling and its split across strategies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleBudget {
    pub target_tokens: usize,
    /// Planned tokens per strategy. Anchors record what they actually used.
    pub strategy_allocations: BTreeMap<Strategy, usize>,
}

impl SampleBudget {
    pub fn new(target_tokens: usize) -> Self {
        Self {
            target_tokens,
            strategy_allocations: BTreeMap::new(),
        }
    }

    /// Splits what is left after the anchors among the content strategies.
    ///
    /// Shares are normalized when they add up to more than one, so the sum of
    /// allocations never exceeds the remaining budget.
    pub fn plan(
        target_tokens: usize,
        anchor_tokens: usize,
        longest_share: f64,
        emotional_share: f64,
        stratified_share: f64,
    ) -> Self {
        let remaining = target_tokens.saturating_sub(anchor_tokens);
        let shares = [
            (Strategy::Longest, longest_share.max(0.0)),
            (Strategy::Emotional, emotional_share.max(0.0)),
            (Strategy::Stratified, stratified_share.max(0.0)),
        ];
        let total_share: f64 = shares.iter().map(|(_, s)| s).sum::<f64>().max(1.0);

        let mut strategy_allocations = BTreeMap::new();
        strategy_allocations.insert(Strategy::Anchors, anchor_tokens);
        for (strategy, share) in shares {
            let tokens = (remaining as f64 * share / total_share).floor() as usize;
            strategy_allocations.insert(strategy, tokens);
        }

        Self {
            target_tokens,
            strategy_allocations,
        }
    }

    pub fn allocation(&self, strategy: Strategy) -> usize {
        self.strategy_allocations
            .get(&strategy)
            .copied()
            .unwrap_or_default()
    }

    /// Tokens the plan may spend in total.
    pub fn planned_total(&self) -> usize {
        self.strategy_allocations.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_respects_remaining_budget() {
        let budget = SampleBudget::plan(1_000, 200, 0.25, 0.35, 0.40);
        assert_eq!(budget.allocation(Strategy::Anchors), 200);
        assert_eq!(budget.allocation(Strategy::Longest), 200);
        assert_eq!(budget.allocation(Strategy::Emotional), 280);
        assert_eq!(budget.allocation(Strategy::Stratified), 320);
        assert!(budget.planned_total() <= 1_000);
    }

    #[test]
    fn test_oversubscribed_shares_are_normalized() {
        let budget = SampleBudget::plan(1_000, 0, 1.0, 1.0, 2.0);
        assert_eq!(budget.allocation(Strategy::Longest), 250);
        assert_eq!(budget.allocation(Strategy::Stratified), 500);
        assert!(budget.planned_total() <= 1_000);
    }

    #[test]
    fn test_anchors_over_target_leave_nothing() {
        let budget = SampleBudget::plan(100, 150, 0.3, 0.3, 0.4);
        assert_eq!(budget.allocation(Strategy::Longest), 0);
        assert_eq!(budget.allocation(Strategy::Stratified), 0);
    }
}

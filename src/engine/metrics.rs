//! Evaluation metrics.
//!
//! Collected by `Evaluator::run_with_metrics` and returned to callers of
//! `process_config_rules_verbose`; `Evaluator::run` drops them.
//!
//! - `EvalMetrics::passes[0]` is the full pass over every rule.
//! - Later entries are the re-check passes over dynamic rules only; the last
//!   one is always the pass that changed nothing (the fixed point).

use super::compiled_rules::RuleId;
use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct EvalMetrics {
    /// Total elapsed time for the evaluation.
    pub total: Duration,
    pub passes: Vec<PassMetrics>,
}

impl EvalMetrics {
    pub fn grants(&self) -> impl Iterator<Item = &Grant> {
        self.passes.iter().flat_map(|p| p.grants.iter())
    }
}

/// Timing and activity for a single pass.
#[derive(Debug, Default, Clone)]
pub struct PassMetrics {
    pub duration: Duration,
    /// Number of rules whose condition was evaluated.
    pub rules_checked: usize,
    /// Number of rules whose condition held.
    pub rules_fired: usize,
    /// Rewards that changed the outcome during this pass.
    pub grants: Vec<Grant>,
}

/// One reward handed out by one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub rule: RuleId,
    /// Source line of the rule.
    pub line: usize,
    /// The reward item, rendered as rule text.
    pub item: String,
    /// Amount added (1 for unlocks and badges).
    pub amount: u64,
}

//! Fixed-point rule evaluation.
//!
//! ```text
//! statuses ──> solved / unlock times (uppercased IDs)
//!                    │
//!   pass 0: every rule, source order
//!   pass n: dynamic rules only (RuleIndex::dynamic)
//!                    │   condition holds?  ──> grant each reward item
//!                    │                          via GrantLedger::raise_to
//!                    v
//!   stop when a pass changes nothing, fail after `rules + 1` passes
//! ```
//!
//! Rewards take effect immediately: points granted by an earlier rule in a
//! pass are visible to point thresholds of later rules in the same pass, and
//! an unlock satisfies `P.. UNLOCK` conditions from then on.
//!
//! The cap holds for any validated config. A non-recurring rule changes the
//! outcome at most once; a recurring rule's count is fixed by `now` and its
//! `IF` guard, which can only flip from false to true. So at most one pass
//! per rule changes anything, plus the final quiet pass.

use super::compiled_rules::{CompiledRules, RuleId};
use super::dedup::{GrantKey, GrantLedger};
use super::metrics::{EvalMetrics, Grant, PassMetrics};
use crate::ast::{Anchor, Condition, HintTarget, PuzzleRef, Recurrence, RewardItem};
use crate::error::EvalError;
use crate::{Context, Options, Outcome, PuzzleStatus};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Instant;

pub(crate) struct Evaluator<'a> {
    compiled: &'a CompiledRules,
    context: &'a Context,
    options: &'a Options,
    solved: BTreeMap<String, DateTime<Utc>>,
    unlocked_at: BTreeMap<String, DateTime<Utc>>,
    outcome: Outcome,
    ledger: GrantLedger,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(
        compiled: &'a CompiledRules,
        statuses: &[PuzzleStatus],
        context: &'a Context,
        options: &'a Options,
    ) -> Self {
        let mut solved = BTreeMap::new();
        let mut unlocked_at = BTreeMap::new();
        for status in statuses {
            let id = status.puzzle_id.to_ascii_uppercase();
            if let Some(at) = status.solve_time {
                solved.insert(id.clone(), at);
            }
            if let Some(at) = status.unlock_time {
                unlocked_at.insert(id, at);
            }
        }
        Evaluator {
            compiled,
            context,
            options,
            solved,
            unlocked_at,
            outcome: Outcome::default(),
            ledger: GrantLedger::default(),
        }
    }

    fn is_solved(&self, r: &PuzzleRef) -> bool {
        r.id().is_some_and(|id| self.solved.contains_key(id))
    }

    fn is_unlocked(&self, r: &PuzzleRef) -> bool {
        r.id().is_some_and(|id| self.unlocked_at.contains_key(id) || self.outcome.unlocked.contains(id))
    }

    fn holds(&self, condition: &Condition) -> bool {
        match condition {
            Condition::Solved(r) => self.is_solved(r),
            Condition::Unlocked(r) => self.is_unlocked(r),
            Condition::TimeSinceStart(offset) => self.context.elapsed() >= offset.delta(),
            Condition::Points(n) => self.outcome.points >= *n,
            Condition::All(items) => items.iter().all(|c| self.holds(c)),
            Condition::Any(items) => items.iter().any(|c| self.holds(c)),
            Condition::AtLeast { n, items } => {
                let satisfied = items.iter().filter(|c| self.holds(c)).count() as u64;
                satisfied >= *n
            }
            Condition::Every(rec) => self.recurrence_count(rec) > 0,
        }
    }

    fn anchor_time(&self, anchor: Option<&Anchor>) -> Option<DateTime<Utc>> {
        let start = self.context.start_time;
        match anchor {
            None => Some(start),
            Some(Anchor::Offset(offset)) => start.checked_add_signed(offset.delta()),
            Some(Anchor::Solved(r)) => r.id().and_then(|id| self.solved.get(id)).copied(),
            Some(Anchor::Unlocked(r)) => r.id().and_then(|id| self.unlocked_at.get(id)).copied(),
        }
    }

    /// Completed intervals since the recurrence's anchor, capped by `LIMIT`.
    fn recurrence_count(&self, rec: &Recurrence) -> u64 {
        if let Some(when) = &rec.when {
            if !self.holds(when) {
                return 0;
            }
        }
        let Some(origin) = self.anchor_time(rec.after.as_ref()) else {
            return 0;
        };
        let elapsed = (self.context.now - origin).num_minutes();
        let Ok(elapsed) = u64::try_from(elapsed) else {
            return 0;
        };
        let count = elapsed.checked_div(rec.interval.minutes()).unwrap_or(0);
        rec.limit.map_or(count, |limit| count.min(limit))
    }

    /// How many times the rule's reward is owed right now (0 = not firing).
    fn multiplier(&self, id: RuleId) -> u64 {
        match &self.compiled.rules[id].condition {
            Condition::Every(rec) => self.recurrence_count(rec),
            other => u64::from(self.holds(other)),
        }
    }

    /// Apply one reward item; returns the amount it changed the outcome by.
    fn grant(&mut self, key: GrantKey, item: &RewardItem, times: u64) -> u64 {
        match item {
            RewardItem::Unlock(r) => {
                let Some(id) = r.id() else { return 0 };
                if self.ledger.claim(key) && self.outcome.unlocked.insert(id.to_string()) { 1 } else { 0 }
            }
            RewardItem::Badge(text) => {
                if self.ledger.claim(key) && !self.outcome.badges.contains(text) {
                    self.outcome.badges.push(text.clone());
                    1
                } else {
                    0
                }
            }
            RewardItem::Points(amount) => {
                let delta = self.ledger.raise_to(key, amount.saturating_mul(times));
                self.outcome.points = self.outcome.points.saturating_add(delta);
                delta
            }
            RewardItem::Hints { amount, target } => {
                let delta = self.ledger.raise_to(key, amount.saturating_mul(times));
                if delta > 0 {
                    let pool = match target {
                        HintTarget::Global => &mut self.outcome.global_hints,
                        HintTarget::Puzzle(r) => {
                            let id = r.id().unwrap_or_default().to_string();
                            self.outcome.puzzle_hints.entry(id).or_insert(0)
                        }
                    };
                    *pool = pool.saturating_add(delta);
                }
                delta
            }
        }
    }

    fn run_pass(&mut self, ids: &[RuleId]) -> PassMetrics {
        let start = Instant::now();
        let mut metrics = PassMetrics::default();
        let compiled = self.compiled;

        for &id in ids {
            metrics.rules_checked += 1;
            let times = self.multiplier(id);
            if times == 0 {
                continue;
            }
            metrics.rules_fired += 1;

            let rule = &compiled.rules[id];
            for (idx, item) in rule.reward.iter().enumerate() {
                let amount = self.grant(GrantKey { rule: id, item: idx }, item, times);
                if amount > 0 {
                    log::trace!("[eval] line {}: {} ({} x{})", rule.line, item, item.kind(), amount);
                    metrics.grants.push(Grant { rule: id, line: rule.line, item: item.to_string(), amount });
                }
            }
        }

        metrics.duration = start.elapsed();
        metrics
    }

    pub(crate) fn run_with_metrics(mut self) -> Result<(Outcome, EvalMetrics), EvalError> {
        let total_start = Instant::now();
        let mut metrics = EvalMetrics::default();

        if self.options.skip_before_start && self.context.now < self.context.start_time {
            log::debug!("[eval] {} is before start {}; nothing applies", self.context.now, self.context.start_time);
            return Ok((self.outcome, metrics));
        }

        let cap = self.compiled.rules.len() + 1;
        let compiled = self.compiled;
        loop {
            if metrics.passes.len() == cap {
                log::error!("[eval] no fixed point after {cap} passes");
                return Err(EvalError::NoFixedPoint { passes: cap });
            }
            let ids = if metrics.passes.is_empty() { &compiled.index.all } else { &compiled.index.dynamic };
            let pass = self.run_pass(ids);
            let quiet = pass.grants.is_empty();
            log::debug!(
                "[eval] pass {}: checked {} fired {} granted {}",
                metrics.passes.len(),
                pass.rules_checked,
                pass.rules_fired,
                pass.grants.len()
            );
            metrics.passes.push(pass);
            if quiet {
                break;
            }
        }

        metrics.total = total_start.elapsed();
        Ok((self.outcome, metrics))
    }

    pub(crate) fn run(self) -> Result<Outcome, EvalError> {
        self.run_with_metrics().map(|(outcome, _)| outcome)
    }
}

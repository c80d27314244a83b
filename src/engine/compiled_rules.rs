//! Rule compilation and indexing.
//!
//! This module holds the *static* side of evaluation: what can be derived
//! from a validated rule list once, at parse time, and reused for every team
//! and every evaluation.
//!
//! Evaluation is split into two phases:
//!
//! 1. **Compile/index rules** (this module): wrap the rules in `CompiledRules`
//!    and record, per rule, which kinds of team state its condition reads
//!    (`Inputs`).
//! 2. **Run** (see `evaluator.rs`): the first pass checks every rule; later
//!    passes only re-check the rules in `RuleIndex::dynamic`.
//!
//! ## Why a rule is "dynamic"
//!
//! Solve times, unlock times from the statuses, and the clock are fixed for
//! the duration of one evaluation. A rule that reads only those either fires
//! in the first pass or never. Points and in-evaluation unlocks grow while the
//! evaluator runs, so rules reading them must be retried until nothing
//! changes.
//!
//! ## Invariants
//!
//! - `RuleId` is an index into `CompiledRules::rules` and `CompiledRules::metas`.
//!   Those vectors must stay aligned.
//! - `RuleIndex::dynamic` is a subsequence of `RuleIndex::all` (source order).

use crate::ast::{Anchor, Condition, Rule};

/// Rule identifier (index into the rules vector).
pub type RuleId = usize;

bitflags::bitflags! {
    /// Kinds of team state a condition reads.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Inputs: u8 {
        const SOLVES  = 1 << 0;
        const UNLOCKS = 1 << 1;
        const POINTS  = 1 << 2;
        const CLOCK   = 1 << 3;
    }
}

impl Inputs {
    /// Inputs that can change while an evaluation is running.
    pub const DYNAMIC: Inputs = Inputs::UNLOCKS.union(Inputs::POINTS);

    pub fn of(condition: &Condition) -> Inputs {
        match condition {
            Condition::Solved(_) => Inputs::SOLVES,
            Condition::Unlocked(_) => Inputs::UNLOCKS,
            Condition::TimeSinceStart(_) => Inputs::CLOCK,
            Condition::Points(_) => Inputs::POINTS,
            Condition::All(items) | Condition::Any(items) | Condition::AtLeast { items, .. } => {
                items.iter().fold(Inputs::empty(), |acc, c| acc | Inputs::of(c))
            }
            Condition::Every(rec) => {
                let anchor = match &rec.after {
                    None | Some(Anchor::Offset(_)) => Inputs::empty(),
                    Some(Anchor::Solved(_)) => Inputs::SOLVES,
                    Some(Anchor::Unlocked(_)) => Inputs::UNLOCKS,
                };
                let guard = rec.when.as_deref().map_or(Inputs::empty(), Inputs::of);
                Inputs::CLOCK | anchor | guard
            }
        }
    }
}

/// Metadata derived from a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleMeta {
    pub inputs: Inputs,
    pub recurring: bool,
}

impl RuleMeta {
    pub fn is_dynamic(&self) -> bool {
        self.inputs.intersects(Inputs::DYNAMIC)
    }
}

#[derive(Default, Debug, Clone)]
pub struct RuleIndex {
    pub all: Vec<RuleId>,
    pub dynamic: Vec<RuleId>,
}

/// Validated rules with metadata and indexes.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub rules: Vec<Rule>,
    pub metas: Vec<RuleMeta>,
    pub index: RuleIndex,
}

impl CompiledRules {
    pub fn new(rules: Vec<Rule>) -> Self {
        let metas: Vec<RuleMeta> = rules
            .iter()
            .map(|r| RuleMeta { inputs: Inputs::of(&r.condition), recurring: r.condition.is_recurring() })
            .collect();

        let mut index = RuleIndex::default();
        for (id, meta) in metas.iter().enumerate() {
            index.all.push(id);
            if meta.is_dynamic() {
                index.dynamic.push(id);
            }
        }

        log::debug!("[compile] {} rules, {} re-checked after the first pass", index.all.len(), index.dynamic.len());
        CompiledRules { rules, metas, index }
    }
}

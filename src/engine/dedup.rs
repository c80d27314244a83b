//! Grant deduplication for the fixed-point loop.
//!
//! The evaluator re-runs rules until nothing changes. Without a stable record
//! of what each rule already handed out, a rule that stays true would grant
//! its reward again on every pass and the loop would never settle.
//!
//! Every reward item is identified structurally by `GrantKey`: the rule's
//! position in the validated rule list plus the item's position in that
//! rule's reward list. The ledger stores the *total* granted so far for each
//! key (a high-water mark), so both reward shapes go through one operation:
//!
//! - one-shot rewards raise their key to `amount` once,
//! - recurring rewards raise it to `amount * count`, granting only the delta.
//!
//! Keys live for one evaluation; nothing here is persisted.

use super::compiled_rules::RuleId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GrantKey {
    pub(crate) rule: RuleId,
    pub(crate) item: usize,
}

#[derive(Debug, Default)]
pub(crate) struct GrantLedger {
    granted: HashMap<GrantKey, u64>,
}

impl GrantLedger {
    /// Raise `key`'s total to `total` and return how much was added.
    /// Totals never decrease: a lower `total` is ignored and returns 0.
    pub(crate) fn raise_to(&mut self, key: GrantKey, total: u64) -> u64 {
        let entry = self.granted.entry(key).or_insert(0);
        if total > *entry {
            let delta = total - *entry;
            *entry = total;
            delta
        } else {
            0
        }
    }

    /// Mark a one-shot item (unlock, badge) as handled. Returns `false` if it
    /// already was.
    pub(crate) fn claim(&mut self, key: GrantKey) -> bool {
        self.raise_to(key, 1) == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_only_the_increase() {
        let mut ledger = GrantLedger::default();
        let key = GrantKey { rule: 0, item: 0 };
        assert_eq!(ledger.raise_to(key, 10), 10);
        assert_eq!(ledger.raise_to(key, 10), 0);
        assert_eq!(ledger.raise_to(key, 25), 15);
        assert_eq!(ledger.raise_to(key, 5), 0);
    }

    #[test]
    fn keys_are_per_item() {
        let mut ledger = GrantLedger::default();
        assert!(ledger.claim(GrantKey { rule: 1, item: 0 }));
        assert!(ledger.claim(GrantKey { rule: 1, item: 1 }));
        assert!(!ledger.claim(GrantKey { rule: 1, item: 0 }));
    }
}

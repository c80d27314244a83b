//! Spendable counters fed by evaluation totals.
//!
//! The evaluator reports how many hints (or points) a team has *earned in
//! total*. Teams spend hints, so the caller keeps two numbers per pool: the
//! total earned so far (a high-water mark) and what is still available.
//! Crediting a new total adds only the increase to `available`; spending
//! never touches `total_earned`, so a later evaluation cannot hand back
//! hints that were already used.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub total_earned: u64,
    pub available: u64,
}

impl Ledger {
    pub fn new(total_earned: u64, available: u64) -> Self {
        Ledger { total_earned, available }
    }

    /// Record a freshly evaluated total. Returns the amount added to
    /// `available`, which is 0 when `new_total` is not above the mark.
    pub fn credit(&mut self, new_total: u64) -> u64 {
        if new_total <= self.total_earned {
            return 0;
        }
        let delta = new_total - self.total_earned;
        self.total_earned = new_total;
        self.available = self.available.saturating_add(delta);
        delta
    }

    /// Take `amount` from `available`. Returns `false` and changes nothing
    /// if there is not enough.
    pub fn spend(&mut self, amount: u64) -> bool {
        match self.available.checked_sub(amount) {
            Some(rest) => {
                self.available = rest;
                true
            }
            None => false,
        }
    }
}

//! Puzzle reference resolution.
//!
//! Parsing leaves puzzle references exactly as written. Before validation
//! they are resolved against the hunt's `Catalog`:
//!
//! ```text
//! rules (as written)
//!   │  apply_order_numbers   P3 -> P<id of puzzle #3>   (only with an order map)
//!   ▼
//!   │  expand_wildcards      PX rule -> one rule per known puzzle ID
//!   ▼
//! rules (concrete IDs only)
//! ```
//!
//! Wildcards are substituted consistently within a rule: `5 POINTS <= PX`
//! becomes `5 POINTS <= P1`, `5 POINTS <= P2`, ... and `PX <= PX UNLOCK`
//! would pair each ID with itself.

use crate::Catalog;
use crate::ast::{PuzzleRef, Rule};
use crate::error::ConfigError;

/// Rewrite references written as display-order numbers into puzzle IDs.
///
/// A reference is rewritten when its ID is a decimal number present in the
/// catalog's order map; anything else is left untouched.
pub(crate) fn apply_order_numbers(rules: &mut [Rule], catalog: &Catalog) {
    if !catalog.has_order_numbers() {
        return;
    }
    let mut remapped = 0usize;
    for rule in rules.iter_mut() {
        rule.for_each_ref_mut(&mut |r| {
            let target = r.id().and_then(|id| id.parse::<u32>().ok()).and_then(|n| catalog.id_for_order(n));
            if let Some(target) = target {
                *r = PuzzleRef::Id(target.to_string());
                remapped += 1;
            }
        });
    }
    log::debug!("[resolve] remapped {remapped} order-number references");
}

/// Replace each rule that mentions `PX` with one copy per known puzzle ID,
/// in sorted ID order, at the position of the original rule.
pub(crate) fn expand_wildcards(rules: Vec<Rule>, catalog: &Catalog) -> Result<Vec<Rule>, ConfigError> {
    let mut expanded = Vec::with_capacity(rules.len());
    for rule in rules {
        if !rule.has_wildcard() {
            expanded.push(rule);
            continue;
        }
        let known = catalog.known_ids().ok_or(ConfigError::WildcardWithoutCatalog)?;
        for id in known {
            let mut copy = rule.clone();
            copy.for_each_ref_mut(&mut |r| {
                if r.is_wildcard() {
                    *r = PuzzleRef::Id(id.clone());
                }
            });
            expanded.push(copy);
        }
        log::debug!("[resolve] line {}: PX expanded to {} rules", rule.line, known.len());
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Condition, RewardItem};
    use crate::engine::parse_rules;

    #[test]
    fn expands_wildcards_in_sorted_order() {
        let rules = parse_rules("PX <= 0 POINTS\n5 POINTS <= PX").unwrap();
        let catalog = Catalog::new(["3", "1", "2"]);
        let out = expand_wildcards(rules, &catalog).unwrap();
        let text: Vec<String> = out.iter().map(|r| r.to_string()).collect();
        assert_eq!(text, vec![
            "P1 <= 0 POINTS",
            "P2 <= 0 POINTS",
            "P3 <= 0 POINTS",
            "5 POINTS <= P1",
            "5 POINTS <= P2",
            "5 POINTS <= P3",
        ]);
    }

    #[test]
    fn substitutes_the_same_id_on_both_sides() {
        let rules = parse_rules("[PX, 1 PX HINT] <= (PX UNLOCK AND +0:10)").unwrap();
        let out = expand_wildcards(rules, &Catalog::new(["A"])).unwrap();
        assert_eq!(out[0].to_string(), "[PA, 1 PA HINT] <= (PA UNLOCK AND +0:10)");
    }

    #[test]
    fn wildcard_needs_a_catalog() {
        let rules = parse_rules("PX <= 0 POINTS").unwrap();
        assert_eq!(expand_wildcards(rules, &Catalog::any()), Err(ConfigError::WildcardWithoutCatalog));
    }

    #[test]
    fn concrete_rules_pass_through_without_a_catalog() {
        let rules = parse_rules("P1 <= 0 POINTS").unwrap();
        assert_eq!(expand_wildcards(rules, &Catalog::any()).unwrap().len(), 1);
    }

    #[test]
    fn remaps_order_numbers_to_ids() {
        let mut rules = parse_rules("P2 <= P1\n3 P1 HINTS <= PFF").unwrap();
        let catalog = Catalog::new(["AB12", "CD34"]).with_order_numbers([(1, "ab12"), (2, "cd34")]);
        apply_order_numbers(&mut rules, &catalog);
        assert_eq!(rules[0].reward, vec![RewardItem::Unlock(PuzzleRef::Id("CD34".into()))]);
        assert_eq!(rules[0].condition, Condition::Solved(PuzzleRef::Id("AB12".into())));
        // `FF` is not a decimal order number and stays as written.
        assert_eq!(rules[1].condition, Condition::Solved(PuzzleRef::Id("FF".into())));
    }
}

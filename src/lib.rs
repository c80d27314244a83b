//! Unlock rules for multi-team puzzle hunts.
//!
//! Hunt staff describe what becomes available when in a small rule language:
//!
//! ```text
//! [P2, 5 POINTS] <= P1                    # solving P1 unlocks P2 and gives 5 points
//! P3 <= 2 OF (P1, P2, 10 POINTS)
//! 1 HINT <= EVERY 30 MINUTES LIMIT 4
//! 3 PA1 HINTS <= PA2                      # hints for puzzle A1 only
//! ```
//!
//! [`parse_config`] checks a config once, at save time. The resulting
//! [`ParsedConfig`] is then evaluated as often as needed against a team's
//! puzzle statuses with [`process_config_rules`], which runs the rules to a
//! fixed point and returns the team's current totals.
//!
//! ```
//! use chrono::{TimeDelta, TimeZone, Utc};
//! use huntcfg::{Catalog, PuzzleStatus, parse_config, process_config_rules};
//!
//! let config = parse_config(
//!     "[P2, 5 POINTS] <= P1\nP3 <= 5 POINTS",
//!     &Catalog::new(["1", "2", "3"]),
//! )
//! .unwrap();
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
//! let statuses = [PuzzleStatus::solved("1", start + TimeDelta::minutes(20))];
//! let outcome = process_config_rules(&config, &statuses, start, start + TimeDelta::hours(1)).unwrap();
//!
//! assert_eq!(outcome.points, 5);
//! assert!(outcome.unlocked.contains("3"));
//! ```

#[macro_use]
mod macros;
mod api;
pub mod ast;
mod engine;
pub mod error;
pub mod ledger;
pub mod sweep;

pub use api::{
    Catalog, ConfigSummary, Context, EvalReport, Options, Outcome, ParsedConfig, PuzzleStatus, parse_config,
    process_config_rules, process_config_rules_verbose, process_config_rules_with,
};
pub use engine::{DependencyGraph, EvalMetrics, Grant, Inputs, PassMetrics, RuleMeta};
pub use error::{ConfigError, EvalError};

#[cfg(test)]
mod tests;

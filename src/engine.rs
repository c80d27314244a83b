//! Config compilation and evaluation engine.
//!
//! The engine is split into focused stages under `src/engine/`, each of which
//! can be tested on its own. `api.rs` is the only caller from outside.
//!
//! ## How the parts work together
//!
//! ```text
//! config text
//!     │  tokenize                    (lexer.rs)
//!     │  Parser::parse_file          (parser.rs)
//!     v
//! Vec<Rule> as written
//!     │  apply_order_numbers         (resolve.rs)
//!     │  expand_wildcards            (resolve.rs)
//!     v
//! Vec<Rule>, concrete IDs only
//!     │  validate                    (validate.rs)
//!     │    - unknown IDs
//!     │    - DependencyGraph::find_cycle
//!     │  CompiledRules::new          (compiled_rules.rs)
//!     v
//! CompiledRules  ──────────────┐   (stored in ParsedConfig, reused)
//!                              │
//! statuses + Context ──> Evaluator::run   (evaluator.rs)
//!                          - pass 0: every rule
//!                          - pass n: dynamic rules
//!                          - GrantLedger high-water marks (dedup.rs)
//!                          - per-pass metrics (metrics.rs)
//!                              │
//!                              v
//!                           Outcome
//! ```
//!
//! Parsing is the only stage that looks at text. Everything after it works
//! on `ast` types, and every stage after `validate` may assume the rules are
//! free of wildcards, unknown IDs and unlock cycles.
//!
//! ## Debugging
//!
//! Every stage logs through the `log` facade under the `huntcfg` target:
//! `RUST_LOG=huntcfg=debug` shows stage summaries and evaluation passes,
//! `trace` adds individual tokens and grants.

#[path = "engine/compiled_rules.rs"]
mod compiled_rules;
#[path = "engine/dedup.rs"]
mod dedup;
#[path = "engine/evaluator.rs"]
mod evaluator;
#[path = "engine/lexer.rs"]
mod lexer;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/parser.rs"]
mod parser;
#[path = "engine/resolve.rs"]
mod resolve;
#[path = "engine/validate.rs"]
mod validate;

pub use compiled_rules::{CompiledRules, Inputs, RuleMeta};
pub(crate) use evaluator::Evaluator;
pub use lexer::{LexRule, TokenKind};
pub use metrics::{EvalMetrics, Grant, PassMetrics};
pub(crate) use parser::parse_rules;
pub use validate::DependencyGraph;

use crate::Catalog;
use crate::error::ConfigError;

/// Text to validated, indexed rules.
pub(crate) fn compile(source: &str, catalog: &Catalog) -> Result<CompiledRules, ConfigError> {
    let mut rules = parse_rules(source)?;
    resolve::apply_order_numbers(&mut rules, catalog);
    let rules = resolve::expand_wildcards(rules, catalog)?;
    validate::validate(&rules, catalog)?;

    Ok(CompiledRules::new(rules))
}

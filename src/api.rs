use crate::ast::{Condition, Rule};
use crate::engine::{self, CompiledRules, DependencyGraph, EvalMetrics, Evaluator};
use crate::error::{ConfigError, EvalError};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The puzzles a config may refer to.
///
/// IDs are stored uppercased and without the `P` prefix used in rule text.
/// A catalog built with [`Catalog::any`] accepts every ID but cannot expand
/// `PX`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    known: Option<BTreeSet<String>>,
    order: BTreeMap<u32, String>,
}

impl Catalog {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let known = ids.into_iter().map(|id| id.as_ref().to_ascii_uppercase()).collect();
        Catalog { known: Some(known), order: BTreeMap::new() }
    }

    /// No known-ID check.
    pub fn any() -> Self {
        Catalog::default()
    }

    /// Let rules refer to puzzles by display-order number (`P3` for the third
    /// puzzle) instead of by ID.
    pub fn with_order_numbers<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: AsRef<str>,
    {
        self.order = order.into_iter().map(|(n, id)| (n, id.as_ref().to_ascii_uppercase())).collect();
        self
    }

    pub fn known_ids(&self) -> Option<&BTreeSet<String>> {
        self.known.as_ref()
    }

    pub fn has_order_numbers(&self) -> bool {
        !self.order.is_empty()
    }

    pub fn id_for_order(&self, number: u32) -> Option<&str> {
        self.order.get(&number).map(String::as_str)
    }
}

/// Evaluation context: when the team's clock started and what time it is now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// Hunt start, or playtest start for playtesting teams.
    pub start_time: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl Context {
    pub fn new(start_time: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Context { start_time, now }
    }

    /// Use the playtest start when the team is a playtester, the hunt start
    /// otherwise.
    pub fn for_team(hunt_start: DateTime<Utc>, playtest_start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        Context { start_time: playtest_start.unwrap_or(hunt_start), now }
    }

    /// Time since start; negative before it.
    pub fn elapsed(&self) -> TimeDelta {
        self.now - self.start_time
    }
}

/// Options that affect evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Return an empty outcome when `now` is before the start time.
    pub skip_before_start: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { skip_before_start: true }
    }
}

/// One puzzle's progress for a team, as persisted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleStatus {
    pub puzzle_id: String,
    #[serde(default)]
    pub unlock_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub solve_time: Option<DateTime<Utc>>,
}

impl PuzzleStatus {
    pub fn new(puzzle_id: impl Into<String>) -> Self {
        PuzzleStatus { puzzle_id: puzzle_id.into(), unlock_time: None, solve_time: None }
    }

    pub fn solved(puzzle_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        PuzzleStatus { solve_time: Some(at), ..PuzzleStatus::new(puzzle_id) }
    }

    pub fn unlocked(puzzle_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        PuzzleStatus { unlock_time: Some(at), ..PuzzleStatus::new(puzzle_id) }
    }
}

/// Current totals for a team. Always totals, never deltas: see
/// [`crate::ledger::Ledger`] for turning them into spendable counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Every puzzle a rule unlocks, whether or not the caller already had it.
    pub unlocked: BTreeSet<String>,
    pub points: u64,
    pub global_hints: u64,
    /// Hints for a single puzzle's pool, keyed by puzzle ID.
    pub puzzle_hints: BTreeMap<String, u64>,
    /// In first-earned order, no duplicates.
    pub badges: Vec<String>,
}

impl Outcome {
    /// Unlocked puzzles missing from `current` (compared case-insensitively).
    pub fn newly_unlocked<I, S>(&self, current: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let current: BTreeSet<String> = current.into_iter().map(|id| id.as_ref().to_ascii_uppercase()).collect();
        self.unlocked.difference(&current).cloned().collect()
    }

    pub fn into_parts(self) -> (BTreeSet<String>, u64, u64, BTreeMap<String, u64>, Vec<String>) {
        (self.unlocked, self.points, self.global_hints, self.puzzle_hints, self.badges)
    }
}

/// A validated config, ready to evaluate any number of times.
#[derive(Debug, Clone)]
pub struct ParsedConfig {
    compiled: CompiledRules,
}

impl ParsedConfig {
    /// The resolved rules: wildcards expanded, order numbers remapped.
    pub fn rules(&self) -> &[Rule] {
        &self.compiled.rules
    }

    pub fn summary(&self) -> ConfigSummary {
        let rules = self.rules();
        let mut unlock_targets = BTreeSet::new();
        let mut referenced = BTreeSet::new();
        for rule in rules {
            unlock_targets.extend(rule.unlock_targets().filter_map(|r| r.id()));
            rule.for_each_ref(&mut |r| referenced.extend(r.id()));
        }
        ConfigSummary {
            rules: rules.len(),
            unlock_targets: unlock_targets.len(),
            recurring_rules: rules.iter().filter(|r| r.condition.is_recurring()).count(),
            point_thresholds: rules.iter().filter(|r| has_point_threshold(&r.condition)).count(),
            referenced_puzzles: referenced.len(),
            dependency_edges: DependencyGraph::from_rules(rules).edge_count(),
            dynamic_rules: self.compiled.index.dynamic.len(),
        }
    }
}

fn has_point_threshold(condition: &Condition) -> bool {
    match condition {
        Condition::Points(_) => true,
        Condition::All(items) | Condition::Any(items) | Condition::AtLeast { items, .. } => {
            items.iter().any(has_point_threshold)
        }
        Condition::Every(rec) => rec.when.as_deref().is_some_and(has_point_threshold),
        _ => false,
    }
}

/// Renders the resolved rules, one per line.
impl fmt::Display for ParsedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in self.rules() {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

/// Counts describing a parsed config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    pub rules: usize,
    pub unlock_targets: usize,
    pub recurring_rules: usize,
    pub point_thresholds: usize,
    pub referenced_puzzles: usize,
    pub dependency_edges: usize,
    /// Rules re-checked after the first evaluation pass.
    pub dynamic_rules: usize,
}

/// Result from [`process_config_rules_verbose`].
#[derive(Debug, Clone)]
pub struct EvalReport {
    pub outcome: Outcome,
    pub metrics: EvalMetrics,
}

/// Parse and validate config text.
///
/// # Example
/// ```
/// use huntcfg::{Catalog, parse_config};
///
/// let config = parse_config("[P2, 5 POINTS] <= P1", &Catalog::new(["1", "2"])).unwrap();
/// assert_eq!(config.rules().len(), 1);
///
/// let err = parse_config("P4 <= P1", &Catalog::new(["1", "2", "3"])).unwrap_err();
/// assert_eq!(err.to_string(), "Config references non-existent puzzle IDs: 4");
/// ```
pub fn parse_config(text: &str, catalog: &Catalog) -> Result<ParsedConfig, ConfigError> {
    let compiled = engine::compile(text, catalog)?;
    Ok(ParsedConfig { compiled })
}

/// Evaluate `config` for one team with default [`Options`].
pub fn process_config_rules(
    config: &ParsedConfig,
    statuses: &[PuzzleStatus],
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Outcome, EvalError> {
    process_config_rules_with(config, statuses, &Context::new(start_time, now), &Options::default())
}

pub fn process_config_rules_with(
    config: &ParsedConfig,
    statuses: &[PuzzleStatus],
    context: &Context,
    options: &Options,
) -> Result<Outcome, EvalError> {
    Evaluator::new(&config.compiled, statuses, context, options).run()
}

/// Evaluate like [`process_config_rules_with`] and also return per-pass
/// metrics. The default path does not keep them.
pub fn process_config_rules_verbose(
    config: &ParsedConfig,
    statuses: &[PuzzleStatus],
    context: &Context,
    options: &Options,
) -> Result<EvalReport, EvalError> {
    let (outcome, metrics) = Evaluator::new(&config.compiled, statuses, context, options).run_with_metrics()?;
    Ok(EvalReport { outcome, metrics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn catalog_normalizes_ids() {
        let catalog = Catalog::new(["a1", "B2"]).with_order_numbers([(1, "a1")]);
        let known: Vec<&str> = catalog.known_ids().unwrap().iter().map(String::as_str).collect();
        assert_eq!(known, vec!["A1", "B2"]);
        assert_eq!(catalog.id_for_order(1), Some("A1"));
        assert_eq!(catalog.id_for_order(2), None);
    }

    #[test]
    fn playtesters_use_their_own_start() {
        let playtest = start() - TimeDelta::days(2);
        let now = start() - TimeDelta::hours(1);
        assert_eq!(Context::for_team(start(), Some(playtest), now).start_time, playtest);
        assert_eq!(Context::for_team(start(), None, now).start_time, start());
        assert_eq!(Context::new(start(), now).elapsed(), TimeDelta::hours(-1));
    }

    #[test]
    fn summary_counts_resolved_rules() {
        let config = parse_config(
            "PX <= 0 POINTS\n[P3, 1 HINT] <= (P1 AND 10 POINTS)\n5 POINTS <= EVERY 10 MINUTES",
            &Catalog::new(["1", "2", "3"]),
        )
        .unwrap();
        assert_eq!(config.summary(), ConfigSummary {
            rules: 5,
            unlock_targets: 3,
            recurring_rules: 1,
            point_thresholds: 4,
            referenced_puzzles: 3,
            dependency_edges: 1,
            dynamic_rules: 4,
        });
    }

    #[test]
    fn display_reparses_to_the_same_rules() {
        let catalog = Catalog::new(["1", "2", "3"]);
        let config = parse_config("px<=0 points\n3 p1 hints <= p2 # pool", &catalog).unwrap();
        let again = parse_config(&config.to_string(), &catalog).unwrap();
        assert_eq!(again.rules().len(), 4);
        assert_eq!(config.to_string(), again.to_string());
    }

    #[test]
    fn verbose_evaluation_reports_grants() {
        let config = parse_config("[P2, 5 POINTS] <= P1", &Catalog::new(["1", "2"])).unwrap();
        let statuses = [PuzzleStatus::solved("1", start())];
        let report =
            process_config_rules_verbose(&config, &statuses, &Context::new(start(), start()), &Options::default())
                .unwrap();
        let items: Vec<&str> = report.metrics.grants().map(|g| g.item.as_str()).collect();
        assert_eq!(items, vec!["P2", "5 POINTS"]);
        assert_eq!(report.outcome.points, 5);
    }

    #[test]
    fn newly_unlocked_ignores_what_the_team_has() {
        let outcome = Outcome { unlocked: ["1", "2", "3"].map(String::from).into(), ..Outcome::default() };
        assert_eq!(outcome.newly_unlocked(["2"]), vec!["1".to_string(), "3".to_string()]);
    }

    #[test]
    fn statuses_deserialize_with_missing_times() {
        let status: PuzzleStatus = serde_json::from_str(r#"{"puzzle_id": "a1"}"#).unwrap();
        assert_eq!(status, PuzzleStatus::new("a1"));
    }
}

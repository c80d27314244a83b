//! End-to-end scenarios: config text in, team totals out.

use crate::ledger::Ledger;
use crate::{Catalog, ConfigError, Outcome, ParsedConfig, PuzzleStatus, parse_config, process_config_rules};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

fn hunt_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 10, 17, 0, 0).unwrap()
}

fn minutes(m: i64) -> DateTime<Utc> {
    hunt_start() + TimeDelta::minutes(m)
}

/// A team playing a three-puzzle hunt.
struct Team {
    config: ParsedConfig,
    statuses: Vec<PuzzleStatus>,
}

impl Team {
    fn new(config: &str) -> Self {
        Team::with_catalog(config, &Catalog::new(["1", "2", "3"]))
    }

    fn with_catalog(config: &str, catalog: &Catalog) -> Self {
        Team { config: parse_config(config, catalog).unwrap(), statuses: Vec::new() }
    }

    fn solve(&mut self, id: &str, at: i64) {
        self.statuses.push(PuzzleStatus::solved(id, minutes(at)));
    }

    fn at(&self, m: i64) -> Outcome {
        process_config_rules(&self.config, &self.statuses, hunt_start(), minutes(m)).unwrap()
    }

    fn unlocked_at(&self, m: i64) -> Vec<String> {
        self.at(m).unlocked.into_iter().collect()
    }
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn unlocks_follow_solves_and_points() {
    let mut team = Team::new(
        "# Starting puzzle\n\
         P1 <= 0 POINTS\n\
         P2 <= P1\n\
         P3 <= 10 POINTS\n\
         5 POINTS <= P1\n\
         5 POINTS <= P2",
    );
    assert_eq!(team.unlocked_at(0), ids(&["1"]));

    team.solve("1", 10);
    let outcome = team.at(11);
    assert_eq!(outcome.unlocked.into_iter().collect::<Vec<_>>(), ids(&["1", "2"]));
    assert_eq!(outcome.points, 5);

    team.solve("2", 20);
    let outcome = team.at(21);
    assert_eq!(outcome.unlocked.len(), 3);
    assert_eq!(outcome.points, 10);
}

#[test]
fn and_needs_both_sides_or_needs_either() {
    let mut team = Team::new(
        "P1 <= 0 POINTS\n\
         P2 <= (P1 AND 10 POINTS)\n\
         P3 <= (P1 OR 10 POINTS)\n\
         5 POINTS <= P1\n\
         5 POINTS <= P2\n\
         5 POINTS <= P3",
    );
    team.solve("1", 5);
    assert_eq!(team.unlocked_at(6), ids(&["1", "3"]));

    team.solve("3", 15);
    assert_eq!(team.unlocked_at(16), ids(&["1", "2", "3"]));
}

#[test]
fn n_of_m_accepts_any_combination() {
    let config = "P1 <= 0 POINTS\n\
                  P2 <= 0 POINTS\n\
                  P3 <= 2 OF (P1, P2, 10 POINTS)\n\
                  5 POINTS <= P1\n\
                  10 POINTS <= P2\n\
                  5 POINTS <= +1:00";

    // P2 alone: solved + 10 points.
    let mut team = Team::new(config);
    team.solve("2", 1);
    assert!(team.at(2).unlocked.contains("3"));

    // P1 alone: solved, but only 5 points.
    let mut team = Team::new(config);
    team.solve("1", 1);
    assert!(!team.at(2).unlocked.contains("3"));

    team.solve("2", 3);
    assert!(team.at(4).unlocked.contains("3"));

    // P1 plus the hour bonus reaches 10 points without P2.
    let mut team = Team::new(config);
    team.solve("1", 1);
    assert!(!team.at(59).unlocked.contains("3"));
    let outcome = team.at(60);
    assert_eq!(outcome.points, 10);
    assert!(outcome.unlocked.contains("3"));
}

#[test]
fn chained_point_grants_resolve_in_one_call() {
    let mut team = Team::new(
        "P1 <= 0 POINTS\n\
         3 POINTS <= P1\n\
         3 POINTS <= 3 POINTS\n\
         3 POINTS <= 6 POINTS\n\
         P2 <= 9 POINTS",
    );
    let outcome = team.at(0);
    assert_eq!(outcome.points, 0);
    assert_eq!(outcome.unlocked.len(), 1);

    team.solve("1", 1);
    let outcome = team.at(2);
    assert_eq!(outcome.points, 9);
    assert_eq!(outcome.unlocked.into_iter().collect::<Vec<_>>(), ids(&["1", "2"]));
}

#[test]
fn wildcard_rules_apply_to_every_puzzle() {
    let mut team = Team::new("PX <= 0 POINTS\n5 POINTS <= PX");
    assert_eq!(team.unlocked_at(0), ids(&["1", "2", "3"]));
    assert_eq!(team.at(0).points, 0);

    team.solve("2", 3);
    assert_eq!(team.at(4).points, 5);
    team.solve("3", 5);
    assert_eq!(team.at(6).points, 10);
}

#[test]
fn puzzle_hints_go_to_their_own_pool() {
    let mut team = Team::new(
        "P1 <= 0 POINTS\n\
         P2 <= 0 POINTS\n\
         2 HINTS <= P1\n\
         3 P1 HINTS <= P2\n\
         2 P2 HINTS <= P1\n\
         1 P1 HINT <= EVERY 1 HOUR",
    );
    let outcome = team.at(0);
    assert_eq!(outcome.global_hints, 0);
    assert!(outcome.puzzle_hints.is_empty());

    team.solve("1", 10);
    let outcome = team.at(11);
    assert_eq!(outcome.global_hints, 2);
    assert_eq!(outcome.puzzle_hints.get("2"), Some(&2));
    assert_eq!(outcome.puzzle_hints.get("1"), None);

    team.solve("2", 20);
    let outcome = team.at(21);
    assert_eq!(outcome.global_hints, 2);
    assert_eq!(outcome.puzzle_hints.get("1"), Some(&3));

    let outcome = team.at(61);
    assert_eq!(outcome.global_hints, 2);
    assert_eq!(outcome.puzzle_hints.get("1"), Some(&4));
    assert_eq!(outcome.puzzle_hints.get("2"), Some(&2));
}

#[test]
fn recurring_points_follow_the_floor_formula() {
    let team = Team::new("7 POINTS <= EVERY 15 MINUTES");
    let mut previous = 0;
    for m in [0, 1, 14, 15, 16, 29, 30, 44, 45, 120, 601] {
        let points = team.at(m).points;
        assert_eq!(points, (m as u64 / 15) * 7, "at +{m} minutes");
        assert!(points >= previous);
        previous = points;
    }
}

#[test]
fn recurring_hints_feed_a_spendable_ledger() {
    let team = Team::new("P1 <= 0 POINTS\n2 HINTS <= P1\n1 HINT <= EVERY 1 HOUR");
    let mut hints = Ledger::default();

    assert_eq!(hints.credit(team.at(0).global_hints), 0);
    assert_eq!(hints.credit(team.at(61).global_hints), 1);
    assert!(hints.spend(1));

    // Same total again: the spent hint stays spent.
    assert_eq!(hints.credit(team.at(90).global_hints), 0);
    assert_eq!(hints.available, 0);
    assert_eq!(hints.credit(team.at(185).global_hints), 2);
    assert_eq!(hints, Ledger::new(3, 2));
}

#[test]
fn evaluation_is_idempotent_and_monotonic() {
    let mut team = Team::new(
        "P1 <= 0 POINTS\n\
         [P2, 5 POINTS, 1 HINT] <= P1\n\
         P3 <= (+2:00 OR 10 POINTS)\n\
         5 POINTS <= P2\n\
         1 POINT <= EVERY 10 MINUTES",
    );
    team.solve("1", 10);
    let first = team.at(30);
    assert_eq!(first, team.at(30));

    team.solve("2", 40);
    let later = team.at(45);
    assert!(later.unlocked.is_superset(&first.unlocked));
    assert!(later.points >= first.points);
    assert!(later.global_hints >= first.global_hints);
    assert_eq!(later.points, 5 + 5 + 4);
    assert!(later.unlocked.contains("3"));
}

#[test]
fn time_offsets_unlock_on_schedule() {
    let team = Team::new("P1 <= 0 POINTS\nP2 <= +1:00\nP3 <= (+2:00 OR P1)");
    assert_eq!(team.unlocked_at(0), ids(&["1"]));
    assert_eq!(team.unlocked_at(59), ids(&["1"]));
    assert_eq!(team.unlocked_at(60), ids(&["1", "2"]));
    assert_eq!(team.unlocked_at(120), ids(&["1", "2", "3"]));
}

#[test]
fn nothing_unlocks_before_the_hunt_starts() {
    let team = Team::new("P1 <= 0 POINTS\n5 POINTS <= +0:00");
    assert_eq!(team.at(-1), Outcome::default());
    assert_eq!(team.unlocked_at(0), ids(&["1"]));
}

#[test]
fn list_rewards_are_granted_together() {
    let mut team = Team::new(
        "P1 <= 0 POINTS\n\
         [P2, 5 POINTS] <= P1\n\
         [P3, 5 POINTS, 2 HINTS] <= P2",
    );
    let outcome = team.at(0);
    assert_eq!((outcome.unlocked.len(), outcome.points, outcome.global_hints), (1, 0, 0));

    team.solve("1", 1);
    let outcome = team.at(2);
    assert_eq!((outcome.unlocked.len(), outcome.points, outcome.global_hints), (2, 5, 0));

    team.solve("2", 3);
    let outcome = team.at(4);
    assert_eq!((outcome.unlocked.len(), outcome.points, outcome.global_hints), (3, 10, 2));
}

#[test]
fn mixed_logic_through_nested_groups() {
    let config = "P1 <= 0 POINTS\n\
                  P2 <= 0 POINTS\n\
                  # Either (2 of [P1, P2] AND 15 points) OR (P1 AND 5 POINTS)\n\
                  P3 <= ((2 OF (P1, P2) AND 15 POINTS) OR (P1 AND 5 POINTS))\n\
                  5 POINTS <= P1\n\
                  10 POINTS <= P2";

    let mut team = Team::new(config);
    assert_eq!(team.unlocked_at(0), ids(&["1", "2"]));
    team.solve("1", 1);
    assert_eq!(team.unlocked_at(2), ids(&["1", "2", "3"]));

    // P2 alone gives 10 points but neither branch holds.
    let mut team = Team::new(config);
    team.solve("2", 1);
    assert_eq!(team.unlocked_at(2), ids(&["1", "2"]));
    team.solve("1", 3);
    assert_eq!(team.unlocked_at(4), ids(&["1", "2", "3"]));
}

#[test]
fn deeply_nested_parentheses() {
    let config = "P1 <= 0 POINTS\n\
                  P2 <= 0 POINTS\n\
                  P3 <= (((P1 AND (5 POINTS OR (P2 AND 10 POINTS))) OR (2 OF (P1, (P2 AND 15 POINTS), 20 POINTS))))\n\
                  5 POINTS <= P1\n\
                  10 POINTS <= P2";

    let mut team = Team::new(config);
    team.solve("1", 1);
    assert!(team.at(2).unlocked.contains("3"));

    let mut team = Team::new(config);
    team.solve("2", 1);
    assert!(!team.at(2).unlocked.contains("3"));
    team.solve("1", 2);
    assert!(team.at(3).unlocked.contains("3"));
}

#[test]
fn badges_are_awarded_once_in_order() {
    let mut team = Team::new(
        "P1 <= 0 POINTS\n\
         \"Speedy\" BADGE <= (P1 AND 5 POINTS)\n\
         \"First Solve\" BADGE <= P1\n\
         [\"First Solve\" BADGE, 5 POINTS] <= P1",
    );
    assert!(team.at(0).badges.is_empty());
    team.solve("1", 1);
    assert_eq!(team.at(2).badges, ids(&["First Solve", "Speedy"]));
}

#[test]
fn order_numbers_reference_puzzles_by_position() {
    let catalog = Catalog::new(["A1", "B2", "C3"]).with_order_numbers([(1, "A1"), (2, "B2"), (3, "C3")]);
    let mut team = Team::with_catalog("P1 <= 0 POINTS\nP2 <= P1\n2 P3 HINTS <= P2", &catalog);
    team.solve("a1", 1);
    team.solve("B2", 2);
    let outcome = team.at(3);
    assert_eq!(outcome.unlocked.into_iter().collect::<Vec<_>>(), ids(&["A1", "B2"]));
    assert_eq!(outcome.puzzle_hints.get("C3"), Some(&2));
}

#[test]
fn invalid_configs_are_rejected_with_the_problem_named() {
    let catalog = Catalog::new(["1", "2", "3"]);

    let err = parse_config("# Reference to non-existent puzzle\nP4 <= P1\nP1 <= 0 POINTS", &catalog).unwrap_err();
    assert_eq!(err, ConfigError::UnknownPuzzles { ids: ids(&["4"]) });

    let err = parse_config("P1 <= <<invalid>>", &catalog).unwrap_err();
    assert!(err.to_string().starts_with("invalid syntax near \"<<invalid>>\""), "{err}");

    let err = parse_config("P1 <= P2\nP2 <= P3\nP3 <= P1", &catalog).unwrap_err();
    assert_eq!(err.to_string(), "Circular dependency detected: P1 -> P2 -> P3 -> P1");
}

#[test]
fn unknown_ids_are_rejected_even_when_never_unlocked() {
    let err = parse_config("5 POINTS <= P4", &Catalog::new(["1", "2", "3"])).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownPuzzles { .. }));
}

#[test]
fn outcome_splits_into_totals() {
    let mut team = Team::new(
        "P1 <= 0 POINTS\n\
         [P2, 5 POINTS, 1 HINT, \"First\" BADGE] <= P1\n\
         2 P1 HINTS <= P1",
    );
    team.solve("1", 5);

    let (unlocked, points, global_hints, puzzle_hints, badges) = team.at(6).into_parts();
    assert_eq!(unlocked.into_iter().collect::<Vec<_>>(), ids(&["1", "2"]));
    assert_eq!(points, 5);
    assert_eq!(global_hints, 1);
    assert_eq!(puzzle_hints.get("1"), Some(&2));
    assert_eq!(badges, ids(&["First"]));
}

#[test]
fn overly_nested_configs_are_rejected_not_fatal() {
    let depth = 5000;
    let config = format!("P2 <= {}P1{}", "(".repeat(depth), ")".repeat(depth));
    let err = parse_config(&config, &Catalog::new(["1", "2"])).unwrap_err();
    assert!(matches!(err, ConfigError::Syntax { .. }), "{err}");
    assert!(err.to_string().contains("nested too deeply"), "{err}");
}

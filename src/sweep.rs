//! Periodic evaluation of every active team.
//!
//! A scheduler calls [`sweep`] once per tick. Each hunt's config is parsed at
//! most once per sweep, and only if the hunt has an active team. Failures are
//! contained:
//!
//! - a hunt whose config no longer validates is logged and all of its teams
//!   are skipped for this sweep,
//! - a team whose evaluation fails is logged and recorded; other teams of the
//!   same hunt are still evaluated.
//!
//! Nothing is persisted here. The caller writes the returned outcomes back
//! (see [`crate::ledger`] for hint bookkeeping).

use crate::error::{ConfigError, EvalError};
use crate::{Catalog, Context, Options, Outcome, ParsedConfig, PuzzleStatus, parse_config, process_config_rules_with};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Start and end of a window; `end` is inclusive, `None` means open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl Window {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && self.end.is_none_or(|end| at <= end)
    }
}

#[derive(Debug, Clone)]
pub struct Hunt {
    pub id: String,
    pub config: String,
    pub puzzle_ids: Vec<String>,
    pub window: Window,
}

#[derive(Debug, Clone)]
pub struct Team {
    pub id: String,
    pub hunt_id: String,
    pub statuses: Vec<PuzzleStatus>,
    /// Set for playtesting teams, who play in their own window.
    pub playtest: Option<Window>,
}

impl Team {
    fn active_window(&self, hunt: &Hunt) -> Window {
        self.playtest.unwrap_or(hunt.window)
    }
}

#[derive(Debug, Default)]
pub struct SweepReport {
    /// Outcome per evaluated team, keyed by team ID.
    pub outcomes: BTreeMap<String, Outcome>,
    /// Hunts whose config failed to parse; their teams were not evaluated.
    pub skipped_hunts: BTreeMap<String, ConfigError>,
    pub failed_teams: BTreeMap<String, EvalError>,
    /// Teams outside their hunt or playtest window, or of an unknown hunt.
    pub inactive_teams: usize,
}

/// Evaluate every team that is active at `now`.
pub fn sweep(hunts: &[Hunt], teams: &[Team], now: DateTime<Utc>) -> SweepReport {
    let hunts_by_id: BTreeMap<&str, &Hunt> = hunts.iter().map(|h| (h.id.as_str(), h)).collect();
    let mut configs: BTreeMap<&str, Option<ParsedConfig>> = BTreeMap::new();
    let mut report = SweepReport::default();
    let options = Options::default();

    for team in teams {
        let Some(hunt) = hunts_by_id.get(team.hunt_id.as_str()).copied() else {
            log::warn!("[sweep] team {} belongs to unknown hunt {}", team.id, team.hunt_id);
            report.inactive_teams += 1;
            continue;
        };
        let window = team.active_window(hunt);
        if !window.contains(now) {
            report.inactive_teams += 1;
            continue;
        }

        let config = match configs.entry(hunt.id.as_str()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let parsed = match parse_config(&hunt.config, &Catalog::new(&hunt.puzzle_ids)) {
                    Ok(parsed) => Some(parsed),
                    Err(err) => {
                        log::error!("[sweep] skipping hunt {}: {err}", hunt.id);
                        report.skipped_hunts.insert(hunt.id.clone(), err);
                        None
                    }
                };
                entry.insert(parsed)
            }
        };
        let Some(config) = config.as_ref() else {
            continue;
        };

        let context = Context::new(window.start, now);
        match process_config_rules_with(config, &team.statuses, &context, &options) {
            Ok(outcome) => {
                log::debug!(
                    "[sweep] team {}: {} unlocked, {} points, {} hints",
                    team.id,
                    outcome.unlocked.len(),
                    outcome.points,
                    outcome.global_hints
                );
                report.outcomes.insert(team.id.clone(), outcome);
            }
            Err(err) => {
                log::error!("[sweep] team {} of hunt {}: {err}", team.id, hunt.id);
                report.failed_teams.insert(team.id.clone(), err);
            }
        }
    }

    report
}

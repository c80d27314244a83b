//! Static checks over resolved rules.
//!
//! Runs after `resolve.rs`, so every reference is a concrete ID:
//!
//! 1. collect every referenced puzzle ID (rewards and conditions),
//! 2. reject IDs missing from the catalog (all of them, sorted, at once),
//! 3. build the unlock dependency graph, `target -> puzzle its rule reads`,
//! 4. reject the config if that graph has a cycle, naming the full loop.
//!
//! The graph is derived and thrown away; it is never stored with the config.

use crate::Catalog;
use crate::ast::{Condition, Rule};
use crate::error::ConfigError;
use std::collections::{BTreeMap, BTreeSet};

/// Every concrete puzzle ID mentioned anywhere in `rules`.
pub(crate) fn referenced_ids(rules: &[Rule]) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    for rule in rules {
        rule.for_each_ref(&mut |r| {
            if let Some(id) = r.id() {
                ids.insert(id.to_string());
            }
        });
    }
    ids
}

pub(crate) fn check_known(referenced: &BTreeSet<String>, catalog: &Catalog) -> Result<(), ConfigError> {
    let Some(known) = catalog.known_ids() else {
        return Ok(());
    };
    let unknown: Vec<String> = referenced.difference(known).cloned().collect();
    if unknown.is_empty() { Ok(()) } else { Err(ConfigError::UnknownPuzzles { ids: unknown }) }
}

/// Unlock dependencies: an edge `a -> b` means unlocking `a` reads the state
/// of `b` (solved, unlocked, or an anchor time).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn from_rules(rules: &[Rule]) -> Self {
        let mut graph = DependencyGraph::default();
        for rule in rules {
            let targets: Vec<&str> = rule.unlock_targets().filter_map(|r| r.id()).collect();
            if targets.is_empty() {
                continue;
            }
            let mut deps = Vec::new();
            rule.condition.for_each_ref(&mut |r| deps.extend(r.id()));
            for target in &targets {
                let entry = graph.edges.entry(target.to_string()).or_default();
                entry.extend(deps.iter().map(|d| d.to_string()));
            }
        }
        graph
    }

    pub fn dependencies(&self, id: &str) -> impl Iterator<Item = &str> {
        self.edges.get(id).into_iter().flatten().map(String::as_str)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Depth-first search from every node (in sorted order). Returns the first
    /// loop found as `[a, b, ..., a]`.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut done: BTreeSet<&str> = BTreeSet::new();
        let mut path: Vec<&str> = Vec::new();
        for start in self.edges.keys() {
            if done.contains(start.as_str()) {
                continue;
            }
            if let Some(cycle) = self.visit(start, &mut done, &mut path) {
                return Some(cycle);
            }
        }
        None
    }

    fn visit<'g>(&'g self, node: &'g str, done: &mut BTreeSet<&'g str>, path: &mut Vec<&'g str>) -> Option<Vec<String>> {
        path.push(node);
        for dep in self.dependencies(node) {
            if let Some(at) = path.iter().position(|p| *p == dep) {
                let mut cycle: Vec<String> = path[at..].iter().map(|s| s.to_string()).collect();
                cycle.push(dep.to_string());
                return Some(cycle);
            }
            if !done.contains(dep) {
                if let Some(cycle) = self.visit(dep, done, path) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        done.insert(node);
        None
    }
}

/// Valid but almost certainly not what the author meant.
fn warn_suspicious(rules: &[Rule]) {
    fn walk(cond: &Condition, line: usize) {
        match cond {
            Condition::AtLeast { n, items } => {
                if *n as usize > items.len() {
                    log::warn!("line {line}: `{n} OF` lists only {} conditions and can never hold", items.len());
                }
                items.iter().for_each(|c| walk(c, line));
            }
            Condition::All(items) | Condition::Any(items) => items.iter().for_each(|c| walk(c, line)),
            Condition::Every(rec) => {
                if let Some(when) = &rec.when {
                    walk(when, line);
                }
                if rec.limit == Some(0) {
                    log::warn!("line {line}: `LIMIT 0` means this rule never grants anything");
                }
            }
            _ => {}
        }
    }
    for rule in rules {
        walk(&rule.condition, rule.line);
    }
}

/// Run every static check; the first failure aborts.
pub(crate) fn validate(rules: &[Rule], catalog: &Catalog) -> Result<DependencyGraph, ConfigError> {
    let referenced = referenced_ids(rules);
    check_known(&referenced, catalog)?;

    let graph = DependencyGraph::from_rules(rules);
    if let Some(cycle) = graph.find_cycle() {
        return Err(ConfigError::CircularDependency { cycle });
    }
    warn_suspicious(rules);

    log::debug!(
        "[validate] {} rules, {} referenced puzzles, {} dependency edges",
        rules.len(),
        referenced.len(),
        graph.edge_count()
    );
    Ok(graph)
}

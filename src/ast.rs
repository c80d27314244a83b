//! Rule-language syntax tree.
//!
//! Every node renders back to canonical rule text through `Display`, so a
//! parsed config can be printed, diffed, or shown in error reports without
//! keeping the original source around.

use chrono::TimeDelta;
use std::fmt;

/// A reference to a puzzle: a concrete (uppercased) ID or the `PX` wildcard.
///
/// Wildcards only exist between parsing and resolution; a validated config
/// never contains one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PuzzleRef {
    Id(String),
    Wildcard,
}

impl PuzzleRef {
    pub fn id(&self) -> Option<&str> {
        match self {
            PuzzleRef::Id(id) => Some(id),
            PuzzleRef::Wildcard => None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, PuzzleRef::Wildcard)
    }
}

/// Where a hint reward lands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HintTarget {
    Global,
    Puzzle(PuzzleRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RewardItem {
    Unlock(PuzzleRef),
    Points(u64),
    Hints { amount: u64, target: HintTarget },
    Badge(String),
}

impl RewardItem {
    /// Short discriminant name, used in traces.
    pub fn kind(&self) -> &'static str {
        match self {
            RewardItem::Unlock(_) => "unlock",
            RewardItem::Points(_) => "points",
            RewardItem::Hints { target: HintTarget::Global, .. } => "hints",
            RewardItem::Hints { .. } => "puzzle_hints",
            RewardItem::Badge(_) => "badge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Minutes,
    Hours,
}

/// `EVERY <amount> <unit>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub amount: u64,
    pub unit: TimeUnit,
}

impl Interval {
    pub fn minutes(&self) -> u64 {
        match self.unit {
            TimeUnit::Minutes => self.amount,
            TimeUnit::Hours => self.amount.saturating_mul(60),
        }
    }
}

/// A `+H:MM` offset from the start of the hunt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Offset {
    pub minutes: u64,
}

impl Offset {
    pub fn delta(&self) -> TimeDelta {
        i64::try_from(self.minutes).ok().and_then(TimeDelta::try_minutes).unwrap_or(TimeDelta::MAX)
    }
}

/// The moment a recurrence starts counting from (`AFTER ...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Anchor {
    Offset(Offset),
    Solved(PuzzleRef),
    Unlocked(PuzzleRef),
}

/// A recurring trigger: `EVERY n UNIT [AFTER anchor] [IF cond] [LIMIT n]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Recurrence {
    pub interval: Interval,
    pub after: Option<Anchor>,
    pub when: Option<Box<Condition>>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    Solved(PuzzleRef),
    Unlocked(PuzzleRef),
    TimeSinceStart(Offset),
    Points(u64),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    AtLeast { n: u64, items: Vec<Condition> },
    /// Only ever the whole condition of a rule.
    Every(Recurrence),
}

impl Condition {
    pub fn is_recurring(&self) -> bool {
        matches!(self, Condition::Every(_))
    }

    /// Visit every puzzle reference in this condition, including nested
    /// groups, recurrence anchors and `IF` guards.
    pub fn for_each_ref<'a>(&'a self, f: &mut impl FnMut(&'a PuzzleRef)) {
        match self {
            Condition::Solved(r) | Condition::Unlocked(r) => f(r),
            Condition::TimeSinceStart(_) | Condition::Points(_) => {}
            Condition::All(items) | Condition::Any(items) | Condition::AtLeast { items, .. } => {
                for item in items {
                    item.for_each_ref(f);
                }
            }
            Condition::Every(rec) => {
                if let Some(Anchor::Solved(r) | Anchor::Unlocked(r)) = &rec.after {
                    f(r);
                }
                if let Some(when) = &rec.when {
                    when.for_each_ref(f);
                }
            }
        }
    }

    pub fn for_each_ref_mut(&mut self, f: &mut impl FnMut(&mut PuzzleRef)) {
        match self {
            Condition::Solved(r) | Condition::Unlocked(r) => f(r),
            Condition::TimeSinceStart(_) | Condition::Points(_) => {}
            Condition::All(items) | Condition::Any(items) | Condition::AtLeast { items, .. } => {
                for item in items {
                    item.for_each_ref_mut(f);
                }
            }
            Condition::Every(rec) => {
                if let Some(Anchor::Solved(r) | Anchor::Unlocked(r)) = &mut rec.after {
                    f(r);
                }
                if let Some(when) = &mut rec.when {
                    when.for_each_ref_mut(f);
                }
            }
        }
    }
}

/// One `<reward> <= <condition>` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub reward: Vec<RewardItem>,
    /// Whether the reward was written as a bracketed list.
    pub listed: bool,
    pub condition: Condition,
    /// 1-based source line of the rule's first token.
    pub line: usize,
}

impl Rule {
    pub fn for_each_ref<'a>(&'a self, f: &mut impl FnMut(&'a PuzzleRef)) {
        for item in &self.reward {
            match item {
                RewardItem::Unlock(r) | RewardItem::Hints { target: HintTarget::Puzzle(r), .. } => f(r),
                _ => {}
            }
        }
        self.condition.for_each_ref(f);
    }

    pub fn for_each_ref_mut(&mut self, f: &mut impl FnMut(&mut PuzzleRef)) {
        for item in &mut self.reward {
            match item {
                RewardItem::Unlock(r) | RewardItem::Hints { target: HintTarget::Puzzle(r), .. } => f(r),
                _ => {}
            }
        }
        self.condition.for_each_ref_mut(f);
    }

    pub fn has_wildcard(&self) -> bool {
        let mut found = false;
        self.for_each_ref(&mut |r| found |= r.is_wildcard());
        found
    }

    /// Puzzles this rule unlocks.
    pub fn unlock_targets(&self) -> impl Iterator<Item = &PuzzleRef> {
        self.reward.iter().filter_map(|item| match item {
            RewardItem::Unlock(r) => Some(r),
            _ => None,
        })
    }
}

// --- Canonical rendering ----------------------------------------------------

impl fmt::Display for PuzzleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PuzzleRef::Id(id) => write!(f, "P{id}"),
            PuzzleRef::Wildcard => f.write_str("PX"),
        }
    }
}

fn plural(n: u64, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 { one } else { many }
}

impl fmt::Display for RewardItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardItem::Unlock(r) => write!(f, "{r}"),
            RewardItem::Points(n) => write!(f, "{n} {}", plural(*n, "POINT", "POINTS")),
            RewardItem::Hints { amount, target: HintTarget::Global } => {
                write!(f, "{amount} {}", plural(*amount, "HINT", "HINTS"))
            }
            RewardItem::Hints { amount, target: HintTarget::Puzzle(r) } => {
                write!(f, "{amount} {r} {}", plural(*amount, "HINT", "HINTS"))
            }
            RewardItem::Badge(text) => write!(f, "\"{text}\" BADGE"),
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Offset(offset) => write!(f, "{offset}"),
            Anchor::Solved(r) => write!(f, "{r} SOLVE"),
            Anchor::Unlocked(r) => write!(f, "{r} UNLOCK"),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            TimeUnit::Minutes => plural(self.amount, "MINUTE", "MINUTES"),
            TimeUnit::Hours => plural(self.amount, "HOUR", "HOURS"),
        };
        write!(f, "EVERY {} {unit}", self.amount)
    }
}

fn fmt_joined(items: &[Condition], sep: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Solved(r) => write!(f, "{r}"),
            Condition::Unlocked(r) => write!(f, "{r} UNLOCK"),
            Condition::TimeSinceStart(offset) => write!(f, "{offset}"),
            Condition::Points(n) => write!(f, "{n} {}", plural(*n, "POINT", "POINTS")),
            Condition::All(items) => {
                f.write_str("(")?;
                fmt_joined(items, " AND ", f)?;
                f.write_str(")")
            }
            Condition::Any(items) => {
                f.write_str("(")?;
                fmt_joined(items, " OR ", f)?;
                f.write_str(")")
            }
            Condition::AtLeast { n, items } => {
                write!(f, "{n} OF (")?;
                fmt_joined(items, ", ", f)?;
                f.write_str(")")
            }
            Condition::Every(rec) => {
                write!(f, "{}", rec.interval)?;
                if let Some(anchor) = &rec.after {
                    write!(f, " AFTER {anchor}")?;
                }
                if let Some(when) = &rec.when {
                    write!(f, " IF {when}")?;
                }
                if let Some(limit) = rec.limit {
                    write!(f, " LIMIT {limit}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.listed {
            f.write_str("[")?;
            for (idx, item) in self.reward.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            f.write_str("]")?;
        } else if let Some(item) = self.reward.first() {
            write!(f, "{item}")?;
        }
        write!(f, " <= {}", self.condition)
    }
}

//! Recursive-descent parser for the rule language.
//!
//! Grammar (keywords case-insensitive):
//!
//! ```text
//! file        := rule*
//! rule        := reward "<=" trigger
//! reward      := item | "[" item ("," item)* "]"
//! item        := puzzle
//!              | NUM POINT(S)
//!              | NUM HINT(S)
//!              | NUM puzzle HINT(S)
//!              | TEXT BADGE
//! trigger     := recurrence | condition
//! recurrence  := EVERY NUM (MINUTE(S) | HOUR(S))
//!                [AFTER anchor] [IF condition] [LIMIT NUM]
//! anchor      := OFFSET | puzzle SOLVE | puzzle UNLOCK
//! condition   := puzzle [SOLVE | UNLOCK]
//!              | OFFSET
//!              | NUM POINT(S)
//!              | NUM OF "(" condition ("," condition)* ")"
//!              | "(" condition ")"
//!              | "(" condition (AND condition)+ ")"
//!              | "(" condition (OR condition)+ ")"
//! ```
//!
//! A group is either an AND chain or an OR chain; mixing the two needs an
//! extra pair of parentheses. Rules need no separator: a condition never
//! continues with a token that can start a reward.

use super::lexer::{Keyword, Token, TokenKind, fragment_at, tokenize};
use crate::ast::{Anchor, Condition, HintTarget, Interval, Recurrence, RewardItem, Rule, TimeUnit};
use crate::error::ConfigError;

/// Deepest condition nesting accepted, counting groups, OF lists and IF guards.
const MAX_NESTING: usize = 64;

pub(crate) struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &'a str) -> Result<Self, ConfigError> {
        Ok(Parser { source, tokens: tokenize(source)?, pos: 0, depth: 0 })
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek(), Some(TokenKind::Keyword(k)) if *k == kw)
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.at_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, reason: impl Into<String>) -> ConfigError {
        match self.tokens.get(self.pos) {
            Some(token) => ConfigError::Syntax {
                line: token.span.line,
                column: token.span.column,
                fragment: fragment_at(self.source, token.span.start),
                reason: reason.into(),
            },
            None => {
                let line = self.source.lines().count().max(1);
                let column = self.source.lines().last().map_or(0, |l| l.chars().count()) + 1;
                ConfigError::Syntax { line, column, fragment: "end of input".to_string(), reason: reason.into() }
            }
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ConfigError> {
        if self.peek() == Some(&kind) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword, what: &str) -> Result<(), ConfigError> {
        if self.eat_keyword(kw) { Ok(()) } else { Err(self.error(format!("expected {what}"))) }
    }

    fn expect_number(&mut self, what: &str) -> Result<u64, ConfigError> {
        match self.peek() {
            Some(TokenKind::Number(n)) => {
                let n = *n;
                self.pos += 1;
                Ok(n)
            }
            _ => Err(self.error(format!("expected {what}"))),
        }
    }

    /// Parse every rule in the source.
    pub(crate) fn parse_file(mut self) -> Result<Vec<Rule>, ConfigError> {
        let mut rules = Vec::new();
        while self.pos < self.tokens.len() {
            rules.push(self.parse_rule()?);
        }
        log::debug!("[parse] {} rules from {} tokens", rules.len(), self.tokens.len());
        Ok(rules)
    }

    fn parse_rule(&mut self) -> Result<Rule, ConfigError> {
        let line = self.tokens.get(self.pos).map_or(0, |t| t.span.line);
        let (reward, listed) = self.parse_reward()?;
        self.expect(TokenKind::Implied, "`<=` after the reward")?;
        let condition = self.parse_trigger()?;
        Ok(Rule { reward, listed, condition, line })
    }

    fn parse_reward(&mut self) -> Result<(Vec<RewardItem>, bool), ConfigError> {
        if self.peek() != Some(&TokenKind::LBracket) {
            return Ok((vec![self.parse_reward_item()?], false));
        }
        self.pos += 1;
        let mut items = vec![self.parse_reward_item()?];
        while self.peek() == Some(&TokenKind::Comma) {
            self.pos += 1;
            items.push(self.parse_reward_item()?);
        }
        self.expect(TokenKind::RBracket, "`,` or `]` in the reward list")?;
        Ok((items, true))
    }

    fn parse_reward_item(&mut self) -> Result<RewardItem, ConfigError> {
        match self.peek().cloned() {
            Some(TokenKind::Puzzle(r)) => {
                self.pos += 1;
                Ok(RewardItem::Unlock(r))
            }
            Some(TokenKind::Number(amount)) => {
                self.pos += 1;
                match self.peek().cloned() {
                    Some(TokenKind::Keyword(Keyword::Points)) => {
                        self.pos += 1;
                        Ok(RewardItem::Points(amount))
                    }
                    Some(TokenKind::Keyword(Keyword::Hints)) => {
                        self.pos += 1;
                        Ok(RewardItem::Hints { amount, target: HintTarget::Global })
                    }
                    Some(TokenKind::Puzzle(r)) => {
                        self.pos += 1;
                        self.expect_keyword(Keyword::Hints, "HINTS after the puzzle of a puzzle hint reward")?;
                        Ok(RewardItem::Hints { amount, target: HintTarget::Puzzle(r) })
                    }
                    _ => Err(self.error("expected POINTS, HINTS or a puzzle after the reward amount")),
                }
            }
            Some(TokenKind::Text(text)) => {
                self.pos += 1;
                self.expect_keyword(Keyword::Badge, "BADGE after the badge text")?;
                Ok(RewardItem::Badge(text))
            }
            _ => Err(self.error("expected a reward (puzzle, points, hints or badge)")),
        }
    }

    fn parse_trigger(&mut self) -> Result<Condition, ConfigError> {
        if self.eat_keyword(Keyword::Every) { self.parse_recurrence() } else { self.parse_condition() }
    }

    fn parse_recurrence(&mut self) -> Result<Condition, ConfigError> {
        let amount = self.expect_number("an interval length after EVERY")?;
        if amount == 0 {
            self.pos -= 1;
            return Err(self.error("an EVERY interval must be at least 1"));
        }
        let unit = if self.eat_keyword(Keyword::Minutes) {
            TimeUnit::Minutes
        } else if self.eat_keyword(Keyword::Hours) {
            TimeUnit::Hours
        } else {
            return Err(self.error("expected MINUTES or HOURS"));
        };

        let after = if self.eat_keyword(Keyword::After) { Some(self.parse_anchor()?) } else { None };
        let when = if self.eat_keyword(Keyword::If) { Some(Box::new(self.parse_condition()?)) } else { None };
        let limit = if self.eat_keyword(Keyword::Limit) { Some(self.expect_number("a number after LIMIT")?) } else { None };

        Ok(Condition::Every(Recurrence { interval: Interval { amount, unit }, after, when, limit }))
    }

    fn parse_anchor(&mut self) -> Result<Anchor, ConfigError> {
        match self.peek().cloned() {
            Some(TokenKind::Offset(offset)) => {
                self.pos += 1;
                Ok(Anchor::Offset(offset))
            }
            Some(TokenKind::Puzzle(r)) => {
                self.pos += 1;
                if self.eat_keyword(Keyword::Solve) {
                    Ok(Anchor::Solved(r))
                } else if self.eat_keyword(Keyword::Unlock) {
                    Ok(Anchor::Unlocked(r))
                } else {
                    Err(self.error("expected SOLVE or UNLOCK after the AFTER puzzle"))
                }
            }
            _ => Err(self.error("expected a time offset or `P<id> SOLVE`/`P<id> UNLOCK` after AFTER")),
        }
    }

    fn parse_condition(&mut self) -> Result<Condition, ConfigError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("conditions nested too deeply"));
        }
        self.depth += 1;
        let condition = self.parse_single_condition();
        self.depth -= 1;
        condition
    }

    fn parse_single_condition(&mut self) -> Result<Condition, ConfigError> {
        match self.peek().cloned() {
            Some(TokenKind::Puzzle(r)) => {
                self.pos += 1;
                if self.eat_keyword(Keyword::Unlock) {
                    Ok(Condition::Unlocked(r))
                } else {
                    self.eat_keyword(Keyword::Solve);
                    Ok(Condition::Solved(r))
                }
            }
            Some(TokenKind::Offset(offset)) => {
                self.pos += 1;
                Ok(Condition::TimeSinceStart(offset))
            }
            Some(TokenKind::Number(n)) => {
                self.pos += 1;
                if self.eat_keyword(Keyword::Points) {
                    Ok(Condition::Points(n))
                } else if self.eat_keyword(Keyword::Of) {
                    self.parse_at_least(n)
                } else {
                    Err(self.error("expected POINTS or OF after a number in a condition"))
                }
            }
            Some(TokenKind::LParen) => {
                self.pos += 1;
                self.parse_group()
            }
            Some(TokenKind::Keyword(Keyword::Every)) => {
                Err(self.error("EVERY can only be used as the whole condition of a rule"))
            }
            _ => Err(self.error("expected a condition")),
        }
    }

    fn parse_at_least(&mut self, n: u64) -> Result<Condition, ConfigError> {
        self.expect(TokenKind::LParen, "`(` after OF")?;
        let mut items = vec![self.parse_condition()?];
        while self.peek() == Some(&TokenKind::Comma) {
            self.pos += 1;
            items.push(self.parse_condition()?);
        }
        self.expect(TokenKind::RParen, "`,` or `)` in the OF list")?;
        Ok(Condition::AtLeast { n, items })
    }

    /// After an opening parenthesis: a single condition, an AND chain or an
    /// OR chain, then the closing parenthesis.
    fn parse_group(&mut self) -> Result<Condition, ConfigError> {
        let first = self.parse_condition()?;
        let (op, other) = if self.at_keyword(Keyword::And) {
            (Keyword::And, Keyword::Or)
        } else if self.at_keyword(Keyword::Or) {
            (Keyword::Or, Keyword::And)
        } else {
            self.expect(TokenKind::RParen, "`)`, AND or OR")?;
            return Ok(first);
        };

        let mut items = vec![first];
        while self.eat_keyword(op) {
            items.push(self.parse_condition()?);
        }
        if self.at_keyword(other) {
            return Err(self.error("AND and OR cannot be mixed in one group; add parentheses"));
        }
        self.expect(TokenKind::RParen, "`)` to close the group")?;

        Ok(if op == Keyword::And { Condition::All(items) } else { Condition::Any(items) })
    }
}

/// Parse rule text without resolving or validating puzzle references.
pub(crate) fn parse_rules(source: &str) -> Result<Vec<Rule>, ConfigError> {
    Parser::new(source)?.parse_file()
}

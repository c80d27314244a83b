//! Tokenizer for the rule language.
//!
//! The lexer is a table of start-anchored regexes (`LEX_RULES`), tried in
//! order at the current position; the first one that matches wins. Rules may
//! produce a token or `None` for trivia (whitespace, `#` comments).
//!
//! ```text
//! "[P2, 5 POINTS] <= P1  # first unlock"
//!  │ │ │ │        │    │  └─ comment   -> skipped
//!  │ │ │ │        │    └──── word      -> Puzzle(1)
//!  │ │ │ │        └───────── symbol    -> Implied
//!  │ │ │ └────────────────── word      -> Keyword(Points)
//!  │ │ └──────────────────── number    -> Number(5)
//!  │ └────────────────────── word      -> Puzzle(2)
//!  └──────────────────────── symbol    -> LBracket
//! ```
//!
//! Keywords and puzzle IDs are matched case-insensitively and normalized to
//! uppercase. Badge text inside quotes keeps its case.

use crate::ast::{Offset, PuzzleRef};
use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    And,
    Or,
    Of,
    Every,
    After,
    If,
    Limit,
    Solve,
    Unlock,
    Badge,
    Points,
    Hints,
    Minutes,
    Hours,
}

impl Keyword {
    fn from_word(upper: &str) -> Option<Self> {
        let kw = match upper {
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "OF" => Keyword::Of,
            "EVERY" => Keyword::Every,
            "AFTER" => Keyword::After,
            "IF" => Keyword::If,
            "LIMIT" => Keyword::Limit,
            "SOLVE" => Keyword::Solve,
            "UNLOCK" => Keyword::Unlock,
            "BADGE" => Keyword::Badge,
            "POINT" | "POINTS" => Keyword::Points,
            "HINT" | "HINTS" => Keyword::Hints,
            "MINUTE" | "MINUTES" => Keyword::Minutes,
            "HOUR" | "HOURS" => Keyword::Hours,
            _ => return None,
        };
        Some(kw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    /// `<=`
    Implied,
    Number(u64),
    Puzzle(PuzzleRef),
    Offset(Offset),
    Text(String),
    Keyword(Keyword),
}

/// Byte offset plus 1-based line/column of a token's first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub type LexFn = fn(&Captures<'_>) -> Result<Option<TokenKind>, String>;

/// One entry of the lexer table.
pub struct LexRule {
    pub name: &'static str,
    pub pattern: &'static Regex,
    pub lex: LexFn,
}

impl std::fmt::Debug for LexRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexRule").field("name", &self.name).field("pattern", &self.pattern.as_str()).finish()
    }
}

fn parse_number(digits: &str) -> Result<u64, String> {
    digits.parse::<u64>().map_err(|_| format!("number `{digits}` is too large"))
}

fn classify_word(word: &str) -> Result<Option<TokenKind>, String> {
    let upper = word.to_ascii_uppercase();
    if let Some(kw) = Keyword::from_word(&upper) {
        return Ok(Some(TokenKind::Keyword(kw)));
    }
    match regex!(r"^P(X|[0-9A-F]+)$").captures(&upper) {
        Some(caps) if &caps[1] == "X" => Ok(Some(TokenKind::Puzzle(PuzzleRef::Wildcard))),
        Some(caps) => Ok(Some(TokenKind::Puzzle(PuzzleRef::Id(caps[1].to_string())))),
        None => Err(format!("unknown word `{word}`")),
    }
}

static LEX_RULES: Lazy<Vec<LexRule>> = Lazy::new(|| {
    vec![
        lex_rule! {
            name: "whitespace",
            pattern: r"^\s+",
            lex: |_caps| Ok(None),
        },
        lex_rule! {
            name: "comment",
            pattern: r"^#[^\n]*",
            lex: |_caps| Ok(None),
        },
        lex_rule! {
            name: "implied",
            pattern: r"^<=",
            lex: |_caps| Ok(Some(TokenKind::Implied)),
        },
        lex_rule! {
            name: "symbol",
            pattern: r"^[\[\]\(\),]",
            lex: |caps| Ok(Some(match &caps[0] {
                "[" => TokenKind::LBracket,
                "]" => TokenKind::RBracket,
                "(" => TokenKind::LParen,
                ")" => TokenKind::RParen,
                _ => TokenKind::Comma,
            })),
        },
        lex_rule! {
            name: "offset",
            pattern: r"^\+(\d+):(\d\d)\b",
            lex: |caps| {
                let hours = parse_number(&caps[1])?;
                let minutes = parse_number(&caps[2])?;
                if minutes >= 60 {
                    return Err(format!("minutes in `{}` must be below 60", &caps[0]));
                }
                let total = hours.checked_mul(60).and_then(|h| h.checked_add(minutes));
                let minutes = total.ok_or_else(|| format!("offset `{}` is too large", &caps[0]))?;
                Ok(Some(TokenKind::Offset(Offset { minutes })))
            },
        },
        lex_rule! {
            name: "text",
            pattern: r#"^"([^"\n]*)""#,
            lex: |caps| Ok(Some(TokenKind::Text(caps[1].to_string()))),
        },
        lex_rule! {
            name: "number",
            pattern: r"^\d+",
            lex: |caps| Ok(Some(TokenKind::Number(parse_number(&caps[0])?))),
        },
        lex_rule! {
            name: "word",
            pattern: r"^[A-Za-z_][A-Za-z0-9_]*",
            lex: |caps| classify_word(&caps[0]),
        },
    ]
});

/// Up to the end of the line, trimmed and shortened, for error messages.
pub(crate) fn fragment_at(source: &str, start: usize) -> String {
    let rest = source.get(start..).unwrap_or("");
    let line = rest.lines().next().unwrap_or("").trim();
    if line.chars().count() > 32 {
        let mut short: String = line.chars().take(32).collect();
        short.push_str("...");
        short
    } else {
        line.to_string()
    }
}

fn syntax_error(source: &str, start: usize, line: usize, column: usize, reason: String) -> ConfigError {
    ConfigError::Syntax { line, column, fragment: fragment_at(source, start), reason }
}

/// Split `source` into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ConfigError> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line = 1;
    let mut column = 1;

    'outer: while pos < source.len() {
        let rest = &source[pos..];

        for rule in LEX_RULES.iter() {
            let Some(caps) = rule.pattern.captures(rest) else {
                continue;
            };
            let matched = caps.get(0).map_or(0, |m| m.end());
            if matched == 0 {
                continue;
            }
            let kind = (rule.lex)(&caps).map_err(|reason| syntax_error(source, pos, line, column, reason))?;
            let span = Span { start: pos, line, column };
            if let Some(kind) = kind {
                log::trace!("[lex] {} {:?} at {}:{}", rule.name, kind, line, column);
                tokens.push(Token { kind, span });
            }

            for ch in rest[..matched].chars() {
                if ch == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
            }
            pos += matched;
            continue 'outer;
        }

        let reason = match rest.chars().next() {
            Some('"') => "unterminated badge text".to_string(),
            Some(ch) => format!("unexpected character `{ch}`"),
            None => "unexpected end of input".to_string(),
        };
        return Err(syntax_error(source, pos, line, column, reason));
    }

    Ok(tokens)
}

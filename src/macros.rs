#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a `LexRule`: a named, start-anchored pattern plus the function that
/// turns its captures into a token (or `None` for trivia such as comments).
#[macro_export]
macro_rules! lex_rule {
    (
        name: $name:expr,
        pattern: $pat:literal,
        lex: |$caps:ident| $body:expr
        $(,)?
    ) => {{
        $crate::engine::LexRule {
            name: $name,
            pattern: $crate::regex!($pat),
            lex: |$caps: &regex::Captures<'_>| -> Result<Option<$crate::engine::TokenKind>, String> { $body },
        }
    }};
}

use thiserror::Error;

/// A config that must not be saved or evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid syntax near \"{fragment}\" on line {line}, column {column}: {reason}")]
    Syntax { line: usize, column: usize, fragment: String, reason: String },

    #[error("Config references non-existent puzzle IDs: {}", .ids.join(", "))]
    UnknownPuzzles { ids: Vec<String> },

    #[error("Circular dependency detected: {}", format_cycle(.cycle))]
    CircularDependency { cycle: Vec<String> },

    #[error("config uses the PX wildcard but no puzzle IDs were supplied to expand it")]
    WildcardWithoutCatalog,
}

fn format_cycle(cycle: &[String]) -> String {
    cycle.iter().map(|id| format!("P{id}")).collect::<Vec<_>>().join(" -> ")
}

/// Evaluation failures. Unreachable for validated configs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("rule evaluation did not reach a fixed point within {passes} passes")]
    NoFixedPoint { passes: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = ConfigError::UnknownPuzzles { ids: vec!["4".into(), "5".into()] };
        assert_eq!(err.to_string(), "Config references non-existent puzzle IDs: 4, 5");

        let err = ConfigError::CircularDependency { cycle: vec!["1".into(), "2".into(), "1".into()] };
        assert_eq!(err.to_string(), "Circular dependency detected: P1 -> P2 -> P1");

        let err = ConfigError::Syntax { line: 2, column: 7, fragment: "<<invalid>>".into(), reason: "bad".into() };
        assert!(err.to_string().starts_with("invalid syntax near \"<<invalid>>\" on line 2"));
    }
}

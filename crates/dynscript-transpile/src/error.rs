//! Transpiler error types

use dynscript_parser::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranspileError {
    /// The source did not parse. Carries every collected parse error.
    #[error("failed to parse {module_name}: {}", first_message(errors))]
    Parse {
        module_name: String,
        errors: Vec<ParseError>,
    },

    #[error("unknown {option} '{value}'")]
    UnknownOption { option: &'static str, value: String },
}

fn first_message(errors: &[ParseError]) -> String {
    match errors {
        [] => "no diagnostics".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynscript_ast::Span;

    #[test]
    fn test_parse_error_display() {
        let err = TranspileError::Parse {
            module_name: "a.ts".to_string(),
            errors: vec![
                ParseError::new("Unexpected token", Span::new(3, 5, 0)),
                ParseError::new("Expected ')'", Span::new(9, 10, 0)),
            ],
        };
        assert_eq!(
            err.to_string(),
            "failed to parse a.ts: Parse error at 3..5: Unexpected token (and 1 more)"
        );
    }
}

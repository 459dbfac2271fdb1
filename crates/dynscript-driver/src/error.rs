//! Loader error types

use std::path::PathBuf;

use dynscript_parser::ParseError;
use thiserror::Error;

use crate::path::ScriptPath;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {}", first_message(errors))]
    Parse {
        path: ScriptPath,
        errors: Vec<ParseError>,
    },

    /// The resolver found nothing for an import while building the graph.
    #[error("Missing dependency path for module {specifier} referenced from {from}")]
    UnresolvedDependency { specifier: String, from: ScriptPath },

    /// `require` named a file that is not among the module's dependencies.
    #[error("No dependency found for {specifier} imported by {from}")]
    MissingRuntimeDependency { specifier: String, from: ScriptPath },

    /// `require` named something the resolver cannot find.
    #[error("No path found for module {specifier}")]
    UnresolvedRuntimeModule { specifier: String, from: ScriptPath },

    #[error("no file found for {path} (tried .ts, .tsx, .js, .jsx and index files)")]
    ExtensionNotFound { path: ScriptPath },

    #[error("{path} was executed before it was transpiled")]
    NotTranspiled { path: ScriptPath },

    #[error("Circular dependency detected: {}", join_cycle(cycle))]
    CircularDependency { cycle: Vec<ScriptPath> },

    /// An exception thrown by module code that nothing caught.
    #[error("uncaught exception in {path}: {message}")]
    Execution { path: ScriptPath, message: String },

    #[error("invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl LoaderError {
    /// Parse diagnostics carried by this error, if any.
    pub fn parse_errors(&self) -> Option<(&ScriptPath, &[ParseError])> {
        match self {
            LoaderError::Parse { path, errors } => Some((path, errors)),
            _ => None,
        }
    }
}

fn first_message(errors: &[ParseError]) -> String {
    match errors {
        [] => "no diagnostics".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

fn join_cycle(cycle: &[ScriptPath]) -> String {
    cycle
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_messages() {
        let from = ScriptPath::new("/app/main.ts");
        let err = LoaderError::UnresolvedDependency {
            specifier: "./gone".to_string(),
            from: from.clone(),
        };
        assert_eq!(
            err.to_string(),
            "Missing dependency path for module ./gone referenced from /app/main.ts"
        );

        let err = LoaderError::MissingRuntimeDependency {
            specifier: "./late".to_string(),
            from: from.clone(),
        };
        assert_eq!(
            err.to_string(),
            "No dependency found for ./late imported by /app/main.ts"
        );

        let err = LoaderError::UnresolvedRuntimeModule {
            specifier: "fs".to_string(),
            from,
        };
        assert_eq!(err.to_string(), "No path found for module fs");
    }

    #[test]
    fn test_cycle_message() {
        let err = LoaderError::CircularDependency {
            cycle: vec![
                ScriptPath::new("/a.ts"),
                ScriptPath::new("/b.ts"),
                ScriptPath::new("/a.ts"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected: /a.ts -> /b.ts -> /a.ts"
        );
    }

    #[test]
    fn test_loader_error_is_a_host_error() {
        fn assert_host_error<E: std::error::Error + Send + Sync + 'static>() {}
        assert_host_error::<LoaderError>();
    }
}

//! Project configuration read from `tsconfig.json`.
//!
//! ```json
//! {
//!   "compilerOptions": { "target": "ES2020", "module": "CommonJS" },
//!   "dynscript": { "detectCycles": true, "maxCallDepth": 256 }
//! }
//! ```
//!
//! Every key is optional. Unknown keys are ignored. The file must be
//! plain JSON: comments and trailing commas are rejected.

use std::fs;
use std::path::Path;

use dynscript_sandbox::SandboxOptions;
use dynscript_transpile::CompilerOptions;
use serde::Deserialize;
use tracing::debug;

use crate::error::LoaderError;

pub const TSCONFIG_FILE: &str = "tsconfig.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProjectConfig {
    pub compiler_options: CompilerOptions,
    /// Check the import graph for cycles before preparing it.
    pub detect_cycles: bool,
    pub sandbox: SandboxOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TsConfig {
    compiler_options: CompilerOptions,
    dynscript: LoaderSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LoaderSection {
    detect_cycles: bool,
    max_call_depth: Option<usize>,
}

impl ProjectConfig {
    /// Reads `<root>/tsconfig.json`; a missing file gives the defaults.
    pub fn load(root: &Path) -> Result<Self, LoaderError> {
        let path = root.join(TSCONFIG_FILE);
        if !path.is_file() {
            debug!(root = %root.display(), "no tsconfig.json, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|source| LoaderError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, LoaderError> {
        let config: TsConfig = serde_json::from_str(content).map_err(|err| LoaderError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let max_call_depth = config
            .dynscript
            .max_call_depth
            .unwrap_or(SandboxOptions::DEFAULT_MAX_CALL_DEPTH);
        if max_call_depth == 0 {
            return Err(LoaderError::Config {
                path: path.to_path_buf(),
                message: "maxCallDepth must be at least 1".to_string(),
            });
        }
        Ok(Self {
            compiler_options: config.compiler_options,
            detect_cycles: config.dynscript.detect_cycles,
            sandbox: SandboxOptions { max_call_depth },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynscript_transpile::{ModuleKind, ScriptTarget};

    fn parse(content: &str) -> Result<ProjectConfig, LoaderError> {
        ProjectConfig::parse(Path::new("/app/tsconfig.json"), content)
    }

    #[test]
    fn test_defaults() {
        let config = parse("{}").unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.compiler_options.target, ScriptTarget::ES5);
        assert_eq!(config.sandbox.max_call_depth, SandboxOptions::DEFAULT_MAX_CALL_DEPTH);
        assert!(!config.detect_cycles);
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"{
                "compilerOptions": { "target": "es2020", "module": "commonjs", "strict": true },
                "include": ["src"],
                "dynscript": { "detectCycles": true, "maxCallDepth": 64 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.compiler_options.target, ScriptTarget::ES2020);
        assert_eq!(config.compiler_options.module, ModuleKind::CommonJs);
        assert!(config.detect_cycles);
        assert_eq!(config.sandbox.max_call_depth, 64);
    }

    #[test]
    fn test_invalid_values() {
        let err = parse(r#"{"compilerOptions": {"target": "ES1"}}"#).unwrap_err();
        assert!(matches!(err, LoaderError::Config { .. }));
        assert!(err.to_string().contains("ES1"));

        let err = parse(r#"{"dynscript": {"maxCallDepth": 0}}"#).unwrap_err();
        assert!(err.to_string().ends_with("maxCallDepth must be at least 1"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ProjectConfig::load(dir.path()).unwrap(), ProjectConfig::default());
    }
}

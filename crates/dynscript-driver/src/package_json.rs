//! `package.json` metadata used by package resolution.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value as Json;

use crate::error::LoaderError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageJson {
    pub name: String,
    pub version: String,
    pub main: Option<String>,
    /// `typings` is an alias for `types`.
    #[serde(alias = "typings")]
    pub types: Option<String>,
    pub module: Option<String>,
    /// Kept raw: it may be a string, a condition map or a subpath map.
    pub exports: Option<Json>,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageJson {
    pub fn read(path: &Path) -> Result<Self, LoaderError> {
        let content = fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, LoaderError> {
        serde_json::from_str(content).map_err(|err| LoaderError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// The root entry named by `exports`. Condition maps prefer `require`,
    /// then `default`, then `import`; a `"."` subpath entry is followed.
    pub fn exports_entry(&self) -> Option<&str> {
        fn pick(value: &Json) -> Option<&str> {
            match value {
                Json::String(s) => Some(s),
                Json::Object(map) => {
                    if let Some(root) = map.get(".") {
                        return pick(root);
                    }
                    ["require", "default", "import", "node"]
                        .iter()
                        .find_map(|condition| map.get(*condition).and_then(pick))
                }
                _ => None,
            }
        }
        self.exports.as_ref().and_then(pick)
    }

    /// Candidate entry files, most preferred first. Declaration files carry
    /// no runtime code, so `types` comes last.
    pub fn entry_candidates(&self) -> Vec<&str> {
        [
            self.main.as_deref(),
            self.module.as_deref(),
            self.exports_entry(),
            self.types.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

//! Module identity.
//!
//! A [`ScriptPath`] is an absolute, lexically normalized path. Two modules
//! are the same module exactly when their paths compare equal.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use tracing::trace;

use crate::error::LoaderError;

/// Extensions a module path may already carry without probing.
pub const RECOGNIZED_EXTENSIONS: &[&str] = &["ts", "js"];

/// Extensions tried, in order, for an extension-less path.
pub const PROBE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptPath(PathBuf);

impl ScriptPath {
    /// Makes `path` absolute against the current directory and folds `.`
    /// and `..` components. No filesystem access besides `current_dir`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        };
        Self(normalize(&absolute))
    }

    pub fn absolute_path(&self) -> &Path {
        &self.0
    }

    /// Final component, e.g. `util.ts`.
    pub fn basename(&self) -> String {
        self.0
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory holding this module.
    pub fn dir(&self) -> &Path {
        self.0.parent().unwrap_or(&self.0)
    }

    pub fn extension(&self) -> Option<&str> {
        self.0.extension().and_then(|ext| ext.to_str())
    }

    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        self.extension()
            .is_some_and(|ext| extensions.iter().any(|candidate| *candidate == ext))
    }

    /// `relative` resolved against this module's directory.
    pub fn sibling(&self, relative: &str) -> ScriptPath {
        ScriptPath::new(self.dir().join(relative))
    }

    pub fn is_file(&self) -> bool {
        self.0.is_file()
    }

    /// Candidates [`ScriptPath::resolve_extension`] tries, in order:
    /// `<path>.<ext>` for each candidate extension, then `<path>/index.<ext>`.
    pub fn extension_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(PROBE_EXTENSIONS.len() * 2);
        for ext in PROBE_EXTENSIONS {
            let mut file = self.0.clone().into_os_string();
            file.push(".");
            file.push(ext);
            candidates.push(PathBuf::from(file));
        }
        for ext in PROBE_EXTENSIONS {
            candidates.push(self.0.join(format!("index.{}", ext)));
        }
        candidates
    }

    /// Points this path at the file an extension-less specifier names.
    /// A path that already names a file is left alone.
    pub fn resolve_extension(&mut self) -> Result<(), LoaderError> {
        if self.0.is_file() {
            return Ok(());
        }
        match self.extension_candidates().into_iter().find(|c| c.is_file()) {
            Some(found) => {
                trace!(from = %self, to = %found.display(), "resolved extension");
                self.0 = found;
                Ok(())
            }
            None => Err(LoaderError::ExtensionNotFound { path: self.clone() }),
        }
    }
}

impl fmt::Display for ScriptPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for ScriptPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Lexical normalization: drops `.`, folds `..` into its parent. A `..`
/// at the root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

//! Dependency resolution policies.
//!
//! The loader only asks one question: which file does `specifier`, imported
//! from `from`, name? [`DependencyResolver`] answers it. [`FsResolver`] is
//! the on-disk project policy; [`MapResolver`] is a fixed table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::trace;

use crate::npm_resolver::NpmResolver;
use crate::path::ScriptPath;

pub trait DependencyResolver {
    /// `None` when nothing matches. Must be deterministic.
    fn resolve(&self, from: &ScriptPath, specifier: &str) -> Option<ScriptPath>;
}

impl<R: DependencyResolver + ?Sized> DependencyResolver for &R {
    fn resolve(&self, from: &ScriptPath, specifier: &str) -> Option<ScriptPath> {
        (**self).resolve(from, specifier)
    }
}

impl<R: DependencyResolver + ?Sized> DependencyResolver for Box<R> {
    fn resolve(&self, from: &ScriptPath, specifier: &str) -> Option<ScriptPath> {
        (**self).resolve(from, specifier)
    }
}

impl<R: DependencyResolver + ?Sized> DependencyResolver for Rc<R> {
    fn resolve(&self, from: &ScriptPath, specifier: &str) -> Option<ScriptPath> {
        (**self).resolve(from, specifier)
    }
}

/// Node built-ins. The sandbox has none of them, so they never resolve.
pub fn is_builtin(specifier: &str) -> bool {
    specifier.starts_with("node:")
        || matches!(
            specifier,
            "fs" | "path" | "http" | "https" | "os" | "process" | "events"
                | "url" | "crypto" | "util" | "stream" | "buffer"
                | "child_process" | "net" | "tls" | "dns" | "querystring"
                | "assert" | "zlib"
        )
}

fn is_relative(specifier: &str) -> bool {
    specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../")
}

/// Resolves relative and absolute specifiers against the file system and
/// bare specifiers through `node_modules`.
///
/// For relative and absolute specifiers the joined path is returned as
/// written, without an extension, once the path itself, one of its
/// extension candidates or an index file exists. Picking the file is left
/// to [`ScriptPath::resolve_extension`].
#[derive(Debug, Clone)]
pub struct FsResolver {
    npm: Option<NpmResolver>,
}

impl FsResolver {
    /// `project_root` bounds the `node_modules` search. Without a root the
    /// nearest `package.json` of each importer is used.
    pub fn new(project_root: Option<PathBuf>) -> Self {
        Self {
            npm: project_root.map(NpmResolver::new),
        }
    }

    fn resolve_file(&self, target: ScriptPath) -> Option<ScriptPath> {
        let exists = target.is_file()
            || target
                .extension_candidates()
                .iter()
                .any(|candidate| candidate.is_file());
        exists.then_some(target)
    }

    fn resolve_package(&self, from: &ScriptPath, specifier: &str) -> Option<ScriptPath> {
        let found = match &self.npm {
            Some(npm) => npm.resolve(specifier, from.absolute_path()),
            None => NpmResolver::find_project_root(from.dir())
                .map(NpmResolver::new)?
                .resolve(specifier, from.absolute_path()),
        };
        found.map(ScriptPath::new)
    }
}

impl Default for FsResolver {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DependencyResolver for FsResolver {
    fn resolve(&self, from: &ScriptPath, specifier: &str) -> Option<ScriptPath> {
        let resolved = if is_builtin(specifier) {
            None
        } else if is_relative(specifier) {
            self.resolve_file(from.sibling(specifier))
        } else if Path::new(specifier).is_absolute() {
            self.resolve_file(ScriptPath::new(specifier))
        } else {
            self.resolve_package(from, specifier)
        };
        trace!(
            from = %from,
            specifier,
            resolved = ?resolved.as_ref().map(ToString::to_string),
            "resolve"
        );
        resolved
    }
}

/// Table of `(importer, specifier)` pairs. Entries registered with
/// [`MapResolver::insert_any`] match every importer.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    entries: HashMap<(Option<ScriptPath>, String), ScriptPath>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: ScriptPath, specifier: impl Into<String>, target: ScriptPath) {
        self.entries.insert((Some(from), specifier.into()), target);
    }

    pub fn insert_any(&mut self, specifier: impl Into<String>, target: ScriptPath) {
        self.entries.insert((None, specifier.into()), target);
    }

    pub fn with(mut self, specifier: impl Into<String>, target: ScriptPath) -> Self {
        self.insert_any(specifier, target);
        self
    }
}

impl DependencyResolver for MapResolver {
    fn resolve(&self, from: &ScriptPath, specifier: &str) -> Option<ScriptPath> {
        self.entries
            .get(&(Some(from.clone()), specifier.to_string()))
            .or_else(|| self.entries.get(&(None, specifier.to_string())))
            .cloned()
    }
}

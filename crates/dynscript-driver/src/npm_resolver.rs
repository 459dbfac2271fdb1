//! Package resolution through `node_modules`.
//!
//! Walks up from the importing file's directory looking for
//! `node_modules/<package>`, stopping after the project root.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::package_json::PackageJson;
use crate::path::ScriptPath;

#[derive(Debug, Clone)]
pub struct NpmResolver {
    project_root: PathBuf,
}

impl NpmResolver {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Nearest ancestor of `start` (inclusive) holding a `package.json`.
    pub fn find_project_root(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| dir.join("package.json").is_file())
            .map(Path::to_path_buf)
    }

    /// Entry file for `specifier` as seen from `from_file`.
    pub fn resolve(&self, specifier: &str, from_file: &Path) -> Option<PathBuf> {
        let (package, subpath) = parse_package_specifier(specifier);

        for dir in from_file.parent()?.ancestors() {
            let package_dir = dir.join("node_modules").join(package);
            if package_dir.is_dir() {
                trace!(package, dir = %package_dir.display(), "found package");
                return self.resolve_package_entry(&package_dir, subpath);
            }
            if dir == self.project_root {
                break;
            }
        }
        debug!(specifier, "package not found in node_modules");
        None
    }

    fn resolve_package_entry(&self, package_dir: &Path, subpath: Option<&str>) -> Option<PathBuf> {
        if let Some(sub) = subpath {
            return try_resolve_file(&package_dir.join(sub));
        }

        let manifest = package_dir.join("package.json");
        if manifest.is_file() {
            match PackageJson::read(&manifest) {
                Ok(pkg) => {
                    let entry = pkg
                        .entry_candidates()
                        .into_iter()
                        .find_map(|entry| try_resolve_file(&package_dir.join(entry)));
                    if entry.is_some() {
                        return entry;
                    }
                }
                Err(err) => debug!(error = %err, "ignoring unreadable package.json"),
            }
        }

        try_resolve_file(&package_dir.join("index"))
    }

    /// Dependencies declared by the project's own `package.json`.
    pub fn declared_dependencies(&self) -> Vec<String> {
        match PackageJson::read(&self.project_root.join("package.json")) {
            Ok(pkg) => pkg
                .dependencies
                .into_keys()
                .chain(pkg.dev_dependencies.into_keys())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Splits a bare specifier into package name and subpath:
/// `lodash/fp` gives `("lodash", Some("fp"))`, `@types/node` gives
/// `("@types/node", None)`.
pub fn parse_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    let name_segments = if specifier.starts_with('@') { 2 } else { 1 };
    match specifier.match_indices('/').nth(name_segments - 1) {
        Some((pos, _)) => (&specifier[..pos], Some(&specifier[pos + 1..])),
        None => (specifier, None),
    }
}

fn try_resolve_file(target: &Path) -> Option<PathBuf> {
    if target.is_file() {
        return Some(target.to_path_buf());
    }
    ScriptPath::new(target)
        .extension_candidates()
        .into_iter()
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_package_specifier() {
        assert_eq!(parse_package_specifier("lodash"), ("lodash", None));
        assert_eq!(parse_package_specifier("lodash/fp"), ("lodash", Some("fp")));
        assert_eq!(parse_package_specifier("@types/node"), ("@types/node", None));
        assert_eq!(
            parse_package_specifier("@types/node/fs"),
            ("@types/node", Some("fs"))
        );
    }

    #[test]
    fn test_find_project_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name":"test"}"#).unwrap();
        let nested = dir.path().join("src/components");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            NpmResolver::find_project_root(&nested).as_deref(),
            Some(dir.path())
        );
    }

    #[test]
    fn test_resolves_main_and_subpath() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("node_modules/left-pad");
        fs::create_dir_all(pkg.join("lib")).unwrap();
        fs::write(pkg.join("package.json"), r#"{"name":"left-pad","main":"lib/main"}"#).unwrap();
        fs::write(pkg.join("lib/main.js"), "module.exports = 1;").unwrap();
        fs::write(pkg.join("lib/extra.ts"), "export const x = 1;").unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let from = dir.path().join("src/app.ts");

        let resolver = NpmResolver::new(dir.path());
        assert_eq!(resolver.resolve("left-pad", &from), Some(pkg.join("lib/main.js")));
        assert_eq!(
            resolver.resolve("left-pad/lib/extra", &from),
            Some(pkg.join("lib/extra.ts"))
        );
        assert_eq!(resolver.resolve("right-pad", &from), None);
    }

    #[test]
    fn test_falls_back_to_index() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("node_modules/@scope/util");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("index.ts"), "export {};").unwrap();

        let resolver = NpmResolver::new(dir.path());
        assert_eq!(
            resolver.resolve("@scope/util", &dir.path().join("main.ts")),
            Some(pkg.join("index.ts"))
        );
    }
}

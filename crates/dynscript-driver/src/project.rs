//! Project facade: configuration, resolution policy and entry points.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use dynscript_sandbox::Value;
use tracing::{debug, info, info_span};

use crate::config::ProjectConfig;
use crate::dep_graph::DepGraph;
use crate::error::LoaderError;
use crate::path::{ScriptPath, RECOGNIZED_EXTENSIONS};
use crate::resolver::{DependencyResolver, FsResolver};
use crate::script::Script;

pub struct Project {
    root: PathBuf,
    resolver: Rc<dyn DependencyResolver>,
    config: ProjectConfig,
}

impl Project {
    /// Opens the project at `root`: reads its `tsconfig.json` and resolves
    /// imports on disk, with packages looked up below `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, LoaderError> {
        let root = ScriptPath::new(root.as_ref()).absolute_path().to_path_buf();
        let config = ProjectConfig::load(&root)?;
        debug!(root = %root.display(), ?config, "opened project");
        let resolver = FsResolver::new(Some(root.clone()));
        Ok(Self::with_resolver(root, resolver, config))
    }

    pub fn with_resolver(
        root: impl AsRef<Path>,
        resolver: impl DependencyResolver + 'static,
        config: ProjectConfig,
    ) -> Self {
        Self {
            root: ScriptPath::new(root.as_ref()).absolute_path().to_path_buf(),
            resolver: Rc::new(resolver),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ProjectConfig {
        &mut self.config
    }

    /// Shared with every sandbox a run creates.
    pub fn resolver(&self) -> Rc<dyn DependencyResolver> {
        Rc::clone(&self.resolver)
    }

    /// Same lookup the graph builder uses, for callers embedding a project.
    pub fn resolve_dependency(&self, from: &ScriptPath, specifier: &str) -> Option<ScriptPath> {
        self.resolver.resolve(from, specifier)
    }

    /// `entry` relative to the project root, extension resolved.
    pub fn entry_path(&self, entry: impl AsRef<Path>) -> Result<ScriptPath, LoaderError> {
        let mut path = ScriptPath::new(self.root.join(entry.as_ref()));
        if !path.has_extension(RECOGNIZED_EXTENSIONS) {
            path.resolve_extension()?;
        }
        Ok(path)
    }

    /// Loads and transpiles `entry` together with everything it imports.
    pub fn prepare(&self, entry: impl AsRef<Path>) -> Result<Script, LoaderError> {
        let path = self.entry_path(entry)?;
        let _span = info_span!("prepare", entry = %path).entered();

        if self.config.detect_cycles {
            self.discover(&path)?.detect_cycles()?;
        }
        let mut script = Script::load(path, self.config.compiler_options)?;
        script.transpile(self.resolver.as_ref())?;
        info!(modules = script.module_count(), "prepared");
        Ok(script)
    }

    /// Prepares `entry` and executes it, returning its exports.
    pub fn run(&self, entry: impl AsRef<Path>) -> Result<Value, LoaderError> {
        let script = self.prepare(entry)?;
        script.execute_with(self.resolver(), self.config.sandbox)
    }

    /// Import graph of `entry`, each module once.
    pub fn graph(&self, entry: impl AsRef<Path>) -> Result<DepGraph, LoaderError> {
        let path = self.entry_path(entry)?;
        self.discover(&path)
    }

    fn discover(&self, entry: &ScriptPath) -> Result<DepGraph, LoaderError> {
        DepGraph::discover(
            entry.clone(),
            self.resolver.as_ref(),
            self.config.compiler_options.target,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MapResolver;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_open_reads_tsconfig() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("tsconfig.json"),
            r#"{"compilerOptions": {"target": "ES2015"}, "dynscript": {"detectCycles": true}}"#,
        )
        .unwrap();
        let project = Project::open(dir.path()).unwrap();
        assert!(project.config().detect_cycles);
        assert_eq!(
            project.config().compiler_options.target,
            dynscript_transpile::ScriptTarget::ES2015
        );
    }

    #[test]
    fn test_entry_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.ts"), "export const ok = true;").unwrap();
        let project = Project::open(dir.path()).unwrap();

        assert_eq!(project.entry_path("main").unwrap().basename(), "main.ts");
        assert_eq!(project.run("main").unwrap().to_json(), json!({ "ok": true }));
    }

    #[test]
    fn test_cycle_check_is_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "import './b';").unwrap();
        fs::write(dir.path().join("b.ts"), "import './a';").unwrap();

        let mut project = Project::open(dir.path()).unwrap();
        project.config_mut().detect_cycles = true;
        match project.prepare("a.ts") {
            Err(LoaderError::CircularDependency { cycle }) => {
                let names: Vec<String> = cycle.iter().map(ScriptPath::basename).collect();
                assert_eq!(names, vec!["a.ts", "b.ts", "a.ts"]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_resolver() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.ts"), "import { n } from 'numbers';\nexport const doubled = n * 2;").unwrap();
        fs::write(dir.path().join("numbers.ts"), "export const n = 21;").unwrap();

        let resolver = MapResolver::new().with("numbers", ScriptPath::new(dir.path().join("numbers.ts")));
        let project = Project::with_resolver(dir.path(), resolver, ProjectConfig::default());
        let value = project.run("main.ts").unwrap();
        assert_eq!(value.to_json(), json!({ "doubled": 42 }));
    }
}

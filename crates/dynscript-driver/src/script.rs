//! Modules: loading, transpilation, graph building and sandboxed execution.
//!
//! A [`Script`] goes through three steps:
//!
//! ```text
//! load (read source) ──► transpile (+ build dependencies, recursively) ──► execute (lazy)
//! ```
//!
//! Preparation is eager and depth first. Execution is lazy: a dependency
//! only runs when module code calls `require` for it, and every call runs
//! it again in a fresh sandbox.

use std::cell::Cell;
use std::rc::Rc;

use dynscript_parser::parse_module;
use dynscript_sandbox::{
    HostError, JsValue, ModuleHost, SandboxContext, SandboxError, SandboxOptions, Value,
};
use dynscript_transpile::{transpile_program, CompilerOptions, TranspileOptions};
use tracing::{debug, debug_span, trace};

use crate::error::LoaderError;
use crate::path::{ScriptPath, RECOGNIZED_EXTENSIONS};
use crate::resolver::DependencyResolver;
use crate::scanner::{import_specifiers, scan};
use crate::source::SourceAsset;

/// Execution state of a [`Script`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptState {
    Unexecuted,
    Running,
    Executed,
}

#[derive(Debug)]
pub struct Script {
    path: ScriptPath,
    raw_content: String,
    transpiled: Option<String>,
    dependencies: Vec<Rc<Script>>,
    compiler_options: CompilerOptions,
    state: Cell<ScriptState>,
}

impl Script {
    /// Reads the module at `path`.
    pub fn load(path: ScriptPath, compiler_options: CompilerOptions) -> Result<Self, LoaderError> {
        Ok(Self::from_asset(SourceAsset::read(path)?, compiler_options))
    }

    pub fn from_asset(asset: SourceAsset, compiler_options: CompilerOptions) -> Self {
        let (path, raw_content) = asset.into_parts();
        Self {
            path,
            raw_content,
            transpiled: None,
            dependencies: Vec::new(),
            compiler_options,
            state: Cell::new(ScriptState::Unexecuted),
        }
    }

    pub fn path(&self) -> &ScriptPath {
        &self.path
    }

    pub fn raw_content(&self) -> &str {
        &self.raw_content
    }

    /// `None` until [`Script::transpile`] succeeded.
    pub fn transpiled_content(&self) -> Option<&str> {
        self.transpiled.as_deref()
    }

    pub fn is_transpiled(&self) -> bool {
        self.transpiled.is_some()
    }

    /// One entry per import declaration, in source order. Empty before
    /// transpilation.
    pub fn dependencies(&self) -> &[Rc<Script>] {
        &self.dependencies
    }

    pub fn compiler_options(&self) -> CompilerOptions {
        self.compiler_options
    }

    pub fn state(&self) -> ScriptState {
        self.state.get()
    }

    /// Module instances in this graph, counting shared modules once per
    /// reference.
    pub fn module_count(&self) -> usize {
        1 + self
            .dependencies
            .iter()
            .map(|dependency| dependency.module_count())
            .sum::<usize>()
    }

    /// Transpiles the source, then builds and transpiles the dependency
    /// graph below it. The source is parsed once for both. Calling it again
    /// recomputes everything; on failure the previous result is kept.
    pub fn transpile(&mut self, resolver: &dyn DependencyResolver) -> Result<(), LoaderError> {
        let _span = debug_span!("transpile", path = %self.path).entered();

        let program = parse_module(&self.raw_content, 0).map_err(|errors| LoaderError::Parse {
            path: self.path.clone(),
            errors,
        })?;
        let options = TranspileOptions::new(self.compiler_options)
            .with_module_name(self.path.basename());
        let output = transpile_program(&program, &options);
        let dependencies = self.load_dependencies(import_specifiers(&program), resolver)?;

        self.transpiled = Some(output.code);
        self.dependencies = dependencies;
        Ok(())
    }

    /// Resolves every imported specifier and loads one child module per
    /// import. Children are transpiled, recursively, once the list is
    /// complete. Any failure aborts the whole build.
    pub fn build_dependencies(&mut self, resolver: &dyn DependencyResolver) -> Result<(), LoaderError> {
        let specifiers = scan(&self.path, &self.raw_content, self.compiler_options.target)?;
        self.dependencies = self.load_dependencies(specifiers, resolver)?;
        Ok(())
    }

    fn load_dependencies(
        &self,
        specifiers: Vec<String>,
        resolver: &dyn DependencyResolver,
    ) -> Result<Vec<Rc<Script>>, LoaderError> {
        let mut dependencies = Vec::with_capacity(specifiers.len());
        for specifier in specifiers {
            let mut path = resolver.resolve(&self.path, &specifier).ok_or_else(|| {
                LoaderError::UnresolvedDependency {
                    specifier: specifier.clone(),
                    from: self.path.clone(),
                }
            })?;
            if !path.has_extension(RECOGNIZED_EXTENSIONS) {
                path.resolve_extension()?;
            }
            trace!(specifier = %specifier, path = %path, "dependency");
            dependencies.push(Script::load(path, self.compiler_options)?);
        }

        for dependency in &mut dependencies {
            dependency.transpile(resolver)?;
        }
        debug!(count = dependencies.len(), "built dependencies");
        Ok(dependencies.into_iter().map(Rc::new).collect())
    }

    /// Runs the transpiled module in a fresh sandbox with default limits.
    pub fn execute(&self, resolver: Rc<dyn DependencyResolver>) -> Result<Value, LoaderError> {
        self.execute_with(resolver, SandboxOptions::default())
    }

    /// Runs the transpiled module in a fresh sandbox and returns what it
    /// exported. `require` calls are answered from [`Script::dependencies`].
    pub fn execute_with(
        &self,
        resolver: Rc<dyn DependencyResolver>,
        options: SandboxOptions,
    ) -> Result<Value, LoaderError> {
        let context = self.run(resolver, options)?;
        context
            .into_value()
            .map_err(|err| self.execution_error(err))
    }

    fn run(
        &self,
        resolver: Rc<dyn DependencyResolver>,
        options: SandboxOptions,
    ) -> Result<SandboxContext, LoaderError> {
        let code = self
            .transpiled
            .as_deref()
            .ok_or_else(|| LoaderError::NotTranspiled {
                path: self.path.clone(),
            })?;
        let _span = debug_span!("execute", path = %self.path).entered();

        self.state.set(ScriptState::Running);
        let host = Rc::new(ScriptHost {
            path: self.path.clone(),
            dependencies: self.dependencies.clone(),
            resolver,
            options,
        });
        let label = self.path.to_string();
        let evaluated = SandboxContext::new(host, options).and_then(|mut context| {
            context.evaluate(&label, code)?;
            Ok(context)
        });
        match evaluated {
            Ok(context) => {
                self.state.set(ScriptState::Executed);
                debug!("executed");
                Ok(context)
            }
            Err(err) => {
                self.state.set(ScriptState::Unexecuted);
                Err(self.execution_error(err))
            }
        }
    }

    fn execution_error(&self, err: SandboxError) -> LoaderError {
        match err {
            SandboxError::Host(inner) => match inner.downcast::<LoaderError>() {
                Ok(loader) => *loader,
                Err(other) => LoaderError::Execution {
                    path: self.path.clone(),
                    message: other.to_string(),
                },
            },
            SandboxError::Uncaught { message, .. } => LoaderError::Execution {
                path: self.path.clone(),
                message,
            },
            other @ (SandboxError::Syntax { .. } | SandboxError::Setup { .. }) => {
                LoaderError::Execution {
                    path: self.path.clone(),
                    message: other.to_string(),
                }
            }
        }
    }
}

/// Answers `require` for one module. Every sandbox gets its own host, so
/// functions a module exports keep resolving against that module.
struct ScriptHost {
    path: ScriptPath,
    dependencies: Vec<Rc<Script>>,
    resolver: Rc<dyn DependencyResolver>,
    options: SandboxOptions,
}

impl ScriptHost {
    /// The dependency `require(specifier)` names, found by path equality.
    fn find_dependency(&self, specifier: &str) -> Result<&Script, LoaderError> {
        let mut path = self.resolver.resolve(&self.path, specifier).ok_or_else(|| {
            LoaderError::UnresolvedRuntimeModule {
                specifier: specifier.to_string(),
                from: self.path.clone(),
            }
        })?;
        // imports were extension-resolved when the graph was built
        if !path.has_extension(RECOGNIZED_EXTENSIONS) {
            path.resolve_extension()?;
        }
        self.dependencies
            .iter()
            .find(|dependency| dependency.path == path)
            .map(|dependency| dependency.as_ref())
            .ok_or_else(|| LoaderError::MissingRuntimeDependency {
                specifier: specifier.to_string(),
                from: self.path.clone(),
            })
    }
}

impl ModuleHost for ScriptHost {
    fn require(&self, specifier: &str) -> Result<JsValue, HostError> {
        trace!(from = %self.path, specifier, "require");
        let dependency = self.find_dependency(specifier)?;
        let mut context = dependency.run(self.resolver.clone(), self.options)?;
        Ok(context
            .exported_value()
            .map_err(|err| dependency.execution_error(err))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{FsResolver, MapResolver};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn load(dir: &Path, name: &str) -> Script {
        Script::load(ScriptPath::new(dir.join(name)), CompilerOptions::default()).unwrap()
    }

    fn run(files: &[(&str, &str)]) -> Result<Value, LoaderError> {
        let dir = project(files);
        let resolver: Rc<dyn DependencyResolver> = Rc::new(FsResolver::default());
        let mut main = load(dir.path(), files[0].0);
        main.transpile(resolver.as_ref())?;
        main.execute(resolver)
    }

    #[test]
    fn test_load_sets_raw_content_only() {
        let dir = project(&[("a.ts", "export const a = 1;")]);
        let script = load(dir.path(), "a.ts");
        assert_eq!(script.raw_content(), "export const a = 1;");
        assert_eq!(script.transpiled_content(), None);
        assert!(script.dependencies().is_empty());
        assert_eq!(script.state(), ScriptState::Unexecuted);
    }

    #[test]
    fn test_transpile_builds_one_dependency_per_import() {
        let dir = project(&[
            ("main.ts", "import { a } from './a';\nimport './b.js';\nimport { a as again } from './a';\nexport const x = a + again;"),
            ("a.ts", "import './lib';\nexport const a = 1;"),
            ("b.js", "exports.b = 2;"),
            ("lib/index.ts", "export {};"),
        ]);
        let mut main = load(dir.path(), "main.ts");
        main.transpile(&FsResolver::default()).unwrap();

        let names: Vec<String> = main.dependencies().iter().map(|d| d.path().basename()).collect();
        assert_eq!(names, vec!["a.ts", "b.js", "a.ts"]);
        assert!(main.dependencies().iter().all(|d| d.is_transpiled()));
        assert_eq!(
            main.dependencies()[0].dependencies()[0].path().absolute_path(),
            dir.path().join("lib/index.ts")
        );
        assert_eq!(main.module_count(), 6);

        // a second run recomputes the same graph
        let first = main.transpiled_content().map(str::to_string);
        main.transpile(&FsResolver::default()).unwrap();
        assert_eq!(main.transpiled_content().map(str::to_string), first);
        assert_eq!(main.dependencies().len(), 3);
    }

    #[test]
    fn test_unresolved_import_is_fatal() {
        let dir = project(&[("main.ts", "import './present';\nimport './absent';"), ("present.ts", "")]);
        let mut main = load(dir.path(), "main.ts");
        let err = main.transpile(&FsResolver::default()).unwrap_err();
        match err {
            LoaderError::UnresolvedDependency { specifier, from } => {
                assert_eq!(specifier, "./absent");
                assert_eq!(from.basename(), "main.ts");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(main.dependencies().is_empty());
        assert!(!main.is_transpiled());
    }

    #[test]
    fn test_failed_transpile_keeps_previous_result() {
        let dir = project(&[("main.ts", "import 'dep';
export const x = 1;"), ("dep.ts", "")]);
        let resolver = MapResolver::new().with("dep", ScriptPath::new(dir.path().join("dep.ts")));
        let mut main = load(dir.path(), "main.ts");
        main.transpile(&resolver).unwrap();
        let code = main.transpiled_content().map(str::to_string);

        let err = main.transpile(&MapResolver::new()).unwrap_err();
        assert!(matches!(err, LoaderError::UnresolvedDependency { .. }));
        assert_eq!(main.transpiled_content().map(str::to_string), code);
        assert_eq!(main.dependencies().len(), 1);
    }

    #[test]
    fn test_nested_imports_become_dependencies() {
        let dir = project(&[
            ("main.ts", "if (true) { import './inner'; }\nfunction f() { import './fn'; }\n{ import './blk'; }\nmodule.exports = 1;"),
            ("inner.ts", ""),
            ("fn.ts", ""),
            ("blk.ts", ""),
        ]);
        let mut main = load(dir.path(), "main.ts");
        main.transpile(&FsResolver::default()).unwrap();
        let names: Vec<String> = main.dependencies().iter().map(|d| d.path().basename()).collect();
        assert_eq!(names, vec!["inner.ts", "fn.ts", "blk.ts"]);
    }

    #[test]
    fn test_parse_error_names_module() {
        let dir = project(&[("main.ts", "import './bad';"), ("bad.ts", "let = ;")]);
        let mut main = load(dir.path(), "main.ts");
        let err = main.transpile(&FsResolver::default()).unwrap_err();
        let (path, errors) = err.parse_errors().unwrap();
        assert_eq!(path.basename(), "bad.ts");
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_execute_before_transpile() {
        let dir = project(&[("a.ts", "module.exports = 1;")]);
        let script = load(dir.path(), "a.ts");
        assert!(matches!(
            script.execute(Rc::new(FsResolver::default())),
            Err(LoaderError::NotTranspiled { .. })
        ));
    }

    #[test]
    fn test_module_exports_wins_over_exports() {
        let value = run(&[("a.js", "module.exports = { a: 1 };\nexports.b = 2;")]).unwrap();
        assert_eq!(value.to_json(), json!({ "a": 1 }));
    }

    #[test]
    fn test_exports_container_used_when_module_exports_empty() {
        let value = run(&[("a.js", "exports.b = 2;")]).unwrap();
        assert_eq!(value.to_json(), json!({ "b": 2 }));

        let value = run(&[("a.ts", "export const answer = 42;\nexport default 'x';")]).unwrap();
        assert_eq!(value.to_json(), json!({ "answer": 42, "default": "x" }));
    }

    #[test]
    fn test_lazy_end_to_end() {
        let dir = project(&[
            (
                "a.ts",
                "import { helper } from 'B';\nimport type { Answer } from 'C';\nconst c: Answer = require('C');\nmodule.exports = c;",
            ),
            ("b.ts", "import * as c from 'C';\nexport const helper = () => c;"),
            ("c.ts", "module.exports = 42;"),
        ]);
        let resolver = Rc::new(
            MapResolver::new()
                .with("B", ScriptPath::new(dir.path().join("b.ts")))
                .with("C", ScriptPath::new(dir.path().join("c.ts"))),
        );

        let mut main = load(dir.path(), "a.ts");
        main.transpile(resolver.as_ref()).unwrap();
        let b = &main.dependencies()[0];
        assert!(b.is_transpiled());
        assert_eq!(b.dependencies()[0].path().basename(), "c.ts");

        let value = main.execute(resolver).unwrap();
        assert_eq!(value.to_json(), json!(42));
        assert_eq!(main.state(), ScriptState::Executed);
        assert_eq!(main.dependencies()[0].state(), ScriptState::Unexecuted);
        assert_eq!(main.dependencies()[1].state(), ScriptState::Executed);
    }

    #[test]
    fn test_require_outside_dependencies() {
        let err = run(&[("main.js", "module.exports = require('./late');"), ("late.js", "")]).unwrap_err();
        match err {
            LoaderError::MissingRuntimeDependency { specifier, from } => {
                assert_eq!(specifier, "./late");
                assert_eq!(from.basename(), "main.js");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_require_unresolvable() {
        let err = run(&[("main.js", "require('fs');")]).unwrap_err();
        assert_eq!(err.to_string(), "No path found for module fs");
    }

    #[test]
    fn test_require_errors_are_catchable() {
        let value = run(&[(
            "main.js",
            "var message;\ntry { require('./nowhere'); } catch (e) { message = e.message; }\nmodule.exports = message;",
        )])
        .unwrap();
        assert_eq!(value.to_json(), json!("No path found for module ./nowhere"));
    }

    #[test]
    fn test_dependency_failure_keeps_its_type() {
        let err = run(&[
            ("main.ts", "import { value } from './dep';\nexport const x = value;"),
            ("dep.ts", "export const value = require('./other');"),
            ("other.ts", ""),
        ])
        .unwrap_err();
        match err {
            LoaderError::MissingRuntimeDependency { from, .. } => assert_eq!(from.basename(), "dep.ts"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_uncaught_exception() {
        let err = run(&[("main.js", "throw new TypeError('bad input');")]).unwrap_err();
        match err {
            LoaderError::Execution { path, message } => {
                assert_eq!(path.basename(), "main.js");
                assert_eq!(message, "TypeError: bad input");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_each_require_runs_a_fresh_context() {
        let value = run(&[
            ("main.ts", "import { next } from './counter';\nimport * as again from './counter';\nexport const values = [next(), next(), again.next()];"),
            ("counter.ts", "let count = 0;\nexport function next() { count += 1; return count; }"),
        ])
        .unwrap();
        assert_eq!(value.to_json(), json!({ "values": [1, 2, 1] }));
    }

    #[test]
    fn test_exported_function_requires_from_its_own_module() {
        let value = run(&[
            ("main.ts", "import * as b from './lib/b';\nmodule.exports = b.get();"),
            ("lib/b.ts", "import './c';\nexport function get() { return require('./c'); }"),
            ("lib/c.ts", "module.exports = 42;"),
        ])
        .unwrap();
        assert_eq!(value.to_json(), json!(42));
    }

    #[test]
    fn test_default_limits_allow_ordinary_recursion() {
        let value = run(&[(
            "main.js",
            "function f(n) { if (n > 0) return f(n - 1); return 0; }\nexports.v = f(80);",
        )])
        .unwrap();
        assert_eq!(value.to_json(), json!({ "v": 0 }));
    }

    #[test]
    fn test_deep_nesting_is_a_parse_error() {
        let depth = 3000;
        let source = format!("exports.v = {}1{};", "(".repeat(depth), ")".repeat(depth));
        let err = run(&[("main.js", source.as_str())]).unwrap_err();
        let (path, errors) = err.parse_errors().unwrap();
        assert_eq!(path.basename(), "main.js");
        assert!(!errors.is_empty());
    }
}

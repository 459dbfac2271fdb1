//! dynscript driver library
//!
//! Loads TypeScript and JavaScript modules from disk, builds their import
//! graph and executes it in isolated sandbox contexts.
//!
//! ```text
//! entry ──scan──► specifiers ──resolve──► child Scripts ──transpile──► … (recursive)
//!                                                                   │
//! Script::execute ◄──require (lazy, path equality)──────────────────┘
//! ```

pub mod config;
pub mod dep_graph;
pub mod diagnostics;
pub mod error;
pub mod npm_resolver;
pub mod package_json;
pub mod path;
pub mod project;
pub mod resolver;
pub mod scanner;
pub mod script;
pub mod source;

pub use config::ProjectConfig;
pub use dep_graph::{DepGraph, ModuleNode};
pub use error::LoaderError;
pub use path::ScriptPath;
pub use project::Project;
pub use resolver::{DependencyResolver, FsResolver, MapResolver};
pub use scanner::scan;
pub use script::{Script, ScriptState};
pub use source::SourceAsset;

pub use dynscript_sandbox::{SandboxOptions, Value};
pub use dynscript_transpile::{CompilerOptions, ModuleKind, ScriptTarget};

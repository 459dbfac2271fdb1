//! # dynscript transpiler
//!
//! Turns TypeScript or JavaScript module source into JavaScript the sandbox
//! can run: types are erased, ES module syntax is lowered to CommonJS and,
//! for ES3/ES5 targets, block-scoped declarations, arrows and template
//! literals are rewritten.
//!
//! ```text
//! source ──parse──► Program ──Emitter──► JavaScript text
//! ```

mod analysis;
mod emitter;
mod enums;
mod error;
mod module;
mod options;

pub use error::TranspileError;
pub use options::{CompilerOptions, ModuleKind, ScriptTarget, TranspileOptions};

use dynscript_ast::Program;
use dynscript_parser::parse_module;
use tracing::debug;

use emitter::Emitter;

/// Module name used when the caller did not provide one.
const ANONYMOUS_MODULE: &str = "module.ts";

/// Result of [`transpile_module`].
#[derive(Debug, Clone, PartialEq)]
pub struct TranspileOutput {
    pub code: String,
    pub module_name: String,
}

/// Transpiles one module. Output is fully determined by `source` and the
/// compiler options.
pub fn transpile_module(
    source: &str,
    options: &TranspileOptions,
) -> Result<TranspileOutput, TranspileError> {
    let program = parse_module(source, 0).map_err(|errors| TranspileError::Parse {
        module_name: module_name(options),
        errors,
    })?;
    Ok(transpile_program(&program, options))
}

/// Emits JavaScript for an already parsed module.
pub fn transpile_program(program: &Program, options: &TranspileOptions) -> TranspileOutput {
    let module_name = module_name(options);
    let compiler_options = &options.compiler_options;
    let _span = tracing::debug_span!(
        "transpile",
        module = %module_name,
        target = %compiler_options.target,
        format = %compiler_options.module
    )
    .entered();

    let mut emitter = Emitter::new(compiler_options);
    emitter.emit_program(program);
    let code = emitter.finish();
    debug!(bytes = code.len(), items = program.items.len(), "transpiled");

    TranspileOutput { code, module_name }
}

fn module_name(options: &TranspileOptions) -> String {
    options
        .module_name
        .clone()
        .unwrap_or_else(|| ANONYMOUS_MODULE.to_string())
}

//! Static import discovery.

use dynscript_ast::visit::Visit;
use dynscript_ast::{ImportDecl, Program, Span};
use dynscript_parser::parse_module;
use dynscript_transpile::ScriptTarget;
use tracing::{debug, debug_span};

use crate::error::LoaderError;
use crate::path::ScriptPath;

/// Specifiers of every import declaration in `raw`, in source order,
/// duplicates kept. Declarations nested in blocks, function bodies and
/// `namespace`/`module` blocks are included, as are `import type`
/// declarations. `export ... from`,
/// `require()` and `import()` are not import declarations.
///
/// The parser accepts a single dialect, so `target` only labels the span.
pub fn scan(path: &ScriptPath, raw: &str, target: ScriptTarget) -> Result<Vec<String>, LoaderError> {
    let _span = debug_span!("scan", path = %path, target = %target).entered();

    let program = parse_module(raw, 0).map_err(|errors| LoaderError::Parse {
        path: path.clone(),
        errors,
    })?;
    let specifiers = import_specifiers(&program);
    debug!(count = specifiers.len(), "scanned imports");
    Ok(specifiers)
}

pub fn import_specifiers(program: &Program) -> Vec<String> {
    let mut collector = ImportCollector::default();
    collector.visit_program(program);
    collector.specifiers
}

#[derive(Default)]
struct ImportCollector {
    specifiers: Vec<String>,
}

impl Visit for ImportCollector {
    fn visit_import(&mut self, import: &ImportDecl, _span: Span) {
        self.specifiers.push(import.source.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan_str(raw: &str) -> Vec<String> {
        scan(&ScriptPath::new("/test/main.ts"), raw, ScriptTarget::ES5).unwrap()
    }

    #[test]
    fn test_no_imports() {
        assert!(scan_str("const x = 1;\nexport default x;").is_empty());
        assert!(scan_str("").is_empty());
    }

    #[test]
    fn test_every_import_form_in_order() {
        let raw = r#"
            import "./side-effect";
            import def from "./default";
            import * as ns from './namespace';
            import { a, b as c } from "./named";
            import type { T } from "./types";
            import d, { e } from "./mixed";
            import def2 from "./default";
        "#;
        assert_eq!(
            scan_str(raw),
            vec![
                "./side-effect",
                "./default",
                "./namespace",
                "./named",
                "./types",
                "./mixed",
                "./default",
            ]
        );
    }

    #[test]
    fn test_nested_namespace_imports() {
        let raw = r#"
            import "./first";
            namespace Outer.Inner {
                import "./nested";
                export const x = 1;
            }
            declare module "ambient" {
                import "./ambient-dep";
            }
            import "./last";
        "#;
        assert_eq!(
            scan_str(raw),
            vec!["./first", "./nested", "./ambient-dep", "./last"]
        );
    }

    #[test]
    fn test_imports_in_blocks_and_functions() {
        let raw = r#"
            if (true) { import "./inner"; }
            function f() { import "./fn"; }
            { import './blk'; }
            const g = () => { import "./arrow"; };
        "#;
        assert_eq!(scan_str(raw), vec!["./inner", "./fn", "./blk", "./arrow"]);
    }

    #[test]
    fn test_ignores_non_declarations() {
        let raw = r#"
            export { x } from "./reexport";
            export * from "./star";
            const m = require("./required");
            function later() { return require("./lazy"); }
        "#;
        assert!(scan_str(raw).is_empty());
    }

    #[test]
    fn test_parse_failure() {
        let err = scan(&ScriptPath::new("/test/bad.ts"), "import { from", ScriptTarget::ES5)
            .unwrap_err();
        match err {
            LoaderError::Parse { path, errors } => {
                assert_eq!(path, ScriptPath::new("/test/bad.ts"));
                assert!(!errors.is_empty());
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}

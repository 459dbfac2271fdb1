//! Read-only passes over the AST that feed emission decisions.

use std::collections::HashSet;

use dynscript_ast::visit::{self, Visit};
use dynscript_ast::*;

/// Whether an arrow body observes the enclosing `this`. Nested arrows are
/// searched, ordinary functions and classes rebind `this` and are not.
pub(crate) fn uses_this(arrow: &ArrowFunction) -> bool {
    let mut finder = ThisFinder { found: false };
    visit::walk_arrow(&mut finder, arrow);
    finder.found
}

struct ThisFinder {
    found: bool,
}

impl Visit for ThisFinder {
    fn visit_expr(&mut self, expr: &Node<Expr>) {
        if self.found {
            return;
        }
        match &expr.value {
            Expr::This | Expr::Super => self.found = true,
            _ => visit::walk_expr(self, expr),
        }
    }

    fn visit_function(&mut self, _function: &Function) {}

    fn visit_class(&mut self, class: &ClassDecl) {
        if let Some(extends) = &class.extends {
            self.visit_expr(&extends.base);
        }
    }
}

/// Names referenced in value position anywhere in the program. Import
/// bindings missing from this set are only used as types and get elided.
pub(crate) fn value_references(program: &Program) -> HashSet<String> {
    let mut collector = ValueRefs::default();
    collector.visit_program(program);
    collector.names
}

#[derive(Default)]
struct ValueRefs {
    names: HashSet<String>,
}

impl Visit for ValueRefs {
    fn visit_export(&mut self, export: &ExportDecl, span: Span) {
        if let ExportDecl::Named {
            specifiers,
            source: None,
            type_only: false,
        } = export
        {
            for specifier in specifiers.iter().filter(|s| !s.type_only) {
                self.names.insert(specifier.local.value.name.clone());
            }
        }
        visit::walk_export(self, export, span);
    }

    fn visit_expr(&mut self, expr: &Node<Expr>) {
        if let Expr::Ident(ident) = &expr.value {
            self.names.insert(ident.name.clone());
        }
        visit::walk_expr(self, expr);
    }
}

/// Top-level names that exist only as types: interfaces, type aliases,
/// ambient declarations and type-only imports. A name that also has a value
/// declaration is not included.
pub(crate) fn type_only_names(program: &Program) -> HashSet<String> {
    let mut types = HashSet::new();
    let mut values = HashSet::new();

    for item in &program.items {
        let decl = match &item.value {
            ModuleItem::Stmt(stmt) => match &stmt.value {
                Stmt::Decl(decl) => decl,
                _ => continue,
            },
            ModuleItem::Export(ExportDecl::Decl(decl)) => &decl.value,
            ModuleItem::Import(import) => {
                for specifier in &import.specifiers {
                    let type_only = import.type_only
                        || matches!(specifier, ImportSpecifier::Named { type_only: true, .. });
                    if type_only {
                        types.insert(specifier.local_name().to_string());
                    }
                }
                continue;
            }
            ModuleItem::Export(_) => continue,
        };

        let bucket = if decl.is_type_only() {
            &mut types
        } else {
            &mut values
        };
        for name in decl.bound_names() {
            bucket.insert(name.to_string());
        }
    }

    types.retain(|name| !values.contains(name));
    types
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynscript_parser::parse_module;

    fn first_arrow(source: &str) -> std::rc::Rc<ArrowFunction> {
        struct FindArrow(Option<std::rc::Rc<ArrowFunction>>);
        impl Visit for FindArrow {
            fn visit_arrow(&mut self, arrow: &ArrowFunction) {
                if self.0.is_none() {
                    self.0 = Some(std::rc::Rc::new(arrow.clone()));
                }
            }
        }
        let program = parse_module(source, 0).unwrap();
        let mut finder = FindArrow(None);
        finder.visit_program(&program);
        finder.0.unwrap()
    }

    #[test]
    fn test_this_in_arrow_body() {
        assert!(uses_this(&first_arrow("const f = () => this.x;")));
        assert!(uses_this(&first_arrow("const f = () => () => this;")));
        assert!(uses_this(&first_arrow("const f = () => { super.go(); };")));
        assert!(!uses_this(&first_arrow("const f = (a) => a + 1;")));
    }

    #[test]
    fn test_this_inside_nested_function_is_not_lexical() {
        assert!(!uses_this(&first_arrow(
            "const f = () => function () { return this; };"
        )));
        assert!(!uses_this(&first_arrow(
            "const f = () => class { m() { return this; } };"
        )));
    }

    #[test]
    fn test_value_references_skip_type_positions() {
        let program = parse_module(
            "import { A, B, C } from './m';\nlet x: A = new B();\nexport { C };",
            0,
        )
        .unwrap();
        let refs = value_references(&program);
        assert!(!refs.contains("A"));
        assert!(refs.contains("B"));
        assert!(refs.contains("C"));
    }

    #[test]
    fn test_type_only_names() {
        let program = parse_module(
            "interface Shape {}\ntype Id = string;\ninterface Both {}\nclass Both {}\nimport type { T } from './t';\ndeclare const ambient: number;",
            0,
        )
        .unwrap();
        let names = type_only_names(&program);
        assert!(names.contains("Shape"));
        assert!(names.contains("Id"));
        assert!(names.contains("T"));
        assert!(names.contains("ambient"));
        assert!(!names.contains("Both"));
    }
}

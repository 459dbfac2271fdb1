//! # dynscript AST
//!
//! Abstract Syntax Tree definitions for the dynscript toolchain.
//! Covers the JavaScript subset the sandbox evaluates plus the TypeScript
//! syntax the transpiler erases.

use std::fmt;

// =============================================================================
// Core Types (kept in lib.rs - used by all modules)
// =============================================================================

/// Source location information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub file_id: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, file_id: usize) -> Self {
        Self { start, end, file_id }
    }

    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            file_id: self.file_id,
        }
    }
}

/// AST node wrapper that includes span information
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    pub span: Span,
    pub value: T,
}

impl<T> Node<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { span, value }
    }
}

/// Identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: String,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// =============================================================================
// Module Declarations
// =============================================================================

pub mod types;
pub mod expr;
pub mod stmt;
pub mod decl;
pub mod module;
pub mod visit;

pub use types::*;
pub use expr::*;
pub use stmt::*;
pub use decl::*;
pub use module::*;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_span() -> Span {
        Span::new(0, 0, 0)
    }

    #[test]
    fn test_span_merge() {
        let a = Span::new(4, 9, 1);
        let b = Span::new(2, 6, 1);
        let merged = a.merge(&b);
        assert_eq!(merged.start, 2);
        assert_eq!(merged.end, 9);
        assert_eq!(merged.file_id, 1);
    }

    #[test]
    fn test_basic_types() {
        let array_type = Type::Array(Box::new(Node::new(
            Type::Keyword(KeywordType::String),
            dummy_span(),
        )));
        assert!(matches!(array_type, Type::Array(_)));
        assert_eq!(format!("{}", KeywordType::Number), "number");
    }

    #[test]
    fn test_expressions() {
        let literal = Expr::Literal(Literal::Number(42.0));
        assert!(matches!(literal, Expr::Literal(Literal::Number(n)) if n == 42.0));

        let ident = Expr::Ident(Ident::new("x"));
        assert!(matches!(ident, Expr::Ident(_)));
    }

    #[test]
    fn test_binary_op() {
        assert_eq!(format!("{}", BinaryOp::Add), "+");
        assert_eq!(format!("{}", BinaryOp::StrictEq), "===");
        assert_eq!(format!("{}", AssignmentOp::NullishAssign), "??=");
    }

    #[test]
    fn test_var_decl() {
        let decl = VarDecl {
            kind: VarDeclKind::Let,
            declarations: vec![VarDeclarator {
                pattern: Node::new(
                    Pattern::Ident(Node::new(Ident::new("x"), dummy_span())),
                    dummy_span(),
                ),
                type_annotation: None,
                init: Some(Node::new(Expr::Literal(Literal::Number(10.0)), dummy_span())),
            }],
            is_declare: false,
        };

        assert_eq!(decl.kind, VarDeclKind::Let);
        assert_eq!(decl.declarations.len(), 1);
        assert_eq!(decl.kind.to_string(), "let");
        assert_eq!(Decl::Var(decl).bound_names(), vec!["x"]);
    }

    #[test]
    fn test_pattern_bound_names() {
        let ident = |name: &str| {
            Node::new(
                Pattern::Ident(Node::new(Ident::new(name), dummy_span())),
                dummy_span(),
            )
        };
        let pattern = Pattern::Object {
            properties: vec![ObjectPatternProperty {
                key: PropertyName::Ident(Node::new(Ident::new("a"), dummy_span())),
                value: ident("renamed"),
                shorthand: false,
            }],
            rest: Some(Box::new(ident("others"))),
        };

        assert_eq!(pattern.bound_names(), vec!["renamed", "others"]);
    }

    #[test]
    fn test_function_decl() {
        let func = Function {
            name: Some(Node::new(Ident::new("foo"), dummy_span())),
            type_params: None,
            params: vec![],
            return_type: Some(Box::new(Node::new(
                Type::Keyword(KeywordType::Void),
                dummy_span(),
            ))),
            body: Some(Node::new(BlockStmt { stmts: vec![] }, dummy_span())),
            is_async: false,
            is_generator: false,
            is_declare: false,
        };

        assert_eq!(func.name.as_ref().map(|n| n.value.name.as_str()), Some("foo"));
        assert!(!Decl::Function(std::rc::Rc::new(func)).is_type_only());
    }

    #[test]
    fn test_decl_runtime_presence() {
        let interface = Decl::Interface(InterfaceDecl {
            name: Node::new(Ident::new("Shape"), dummy_span()),
            type_params: None,
            extends: vec![],
            members: vec![],
        });
        assert!(interface.is_type_only());

        let declared = Decl::Var(VarDecl {
            kind: VarDeclKind::Const,
            declarations: vec![],
            is_declare: true,
        });
        assert!(declared.is_type_only());

        let empty_namespace = Decl::Module(ModuleDecl {
            name: ModuleName::Ident(Node::new(Ident::new("Types"), dummy_span())),
            body: ModuleBody::Block(vec![]),
            is_declare: false,
        });
        assert!(empty_namespace.is_type_only());
    }
}

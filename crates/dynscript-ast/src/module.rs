//! Module system definitions for the AST

use super::*;

/// Module item (top-level in a module, or inside a namespace body)
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleItem {
    /// Import declaration
    Import(ImportDecl),

    /// Export declaration
    Export(ExportDecl),

    /// Statement (declarations included)
    Stmt(Node<Stmt>),
}

/// Import declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
    pub type_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    /// import name from "module"
    Default(Node<Ident>),

    /// import * as name from "module"
    Namespace(Node<Ident>),

    /// import { name } from "module" or import { name as alias } from "module"
    Named {
        imported: Node<Ident>,
        local: Option<Node<Ident>>,
        type_only: bool,
    },
}

impl ImportSpecifier {
    /// The local binding this specifier introduces.
    pub fn local_name(&self) -> &str {
        match self {
            ImportSpecifier::Default(ident) | ImportSpecifier::Namespace(ident) => {
                &ident.value.name
            }
            ImportSpecifier::Named { imported, local, .. } => local
                .as_ref()
                .map(|l| l.value.name.as_str())
                .unwrap_or(imported.value.name.as_str()),
        }
    }
}

/// Export declaration
#[derive(Debug, Clone, PartialEq)]
pub enum ExportDecl {
    /// export { name }
    Named {
        specifiers: Vec<ExportSpecifier>,
        source: Option<String>,
        type_only: bool,
    },

    /// export default expr
    Default(Node<Expr>),

    /// export default declaration
    DefaultDecl(Box<Node<Decl>>),

    /// export * from "module"
    All {
        source: String,
        as_name: Option<Node<Ident>>,
        type_only: bool,
    },

    /// export declaration
    Decl(Box<Node<Decl>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
    pub local: Node<Ident>,
    pub exported: Option<Node<Ident>>,
    pub type_only: bool,
}

impl ExportSpecifier {
    pub fn exported_name(&self) -> &str {
        self.exported
            .as_ref()
            .map(|e| e.value.name.as_str())
            .unwrap_or(self.local.value.name.as_str())
    }
}

/// Root AST node - represents a complete source file
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub items: Vec<Node<ModuleItem>>,
    pub span: Span,
}

impl Program {
    /// True when the file uses `import`/`export` syntax at the top level.
    pub fn is_module(&self) -> bool {
        self.items
            .iter()
            .any(|item| matches!(item.value, ModuleItem::Import(_) | ModuleItem::Export(_)))
    }
}

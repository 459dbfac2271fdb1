//! Declaration definitions for the AST

use super::*;
use std::fmt;
use std::rc::Rc;

/// Declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// Function declaration
    Function(Rc<Function>),

    /// Class declaration
    Class(Rc<ClassDecl>),

    /// Interface declaration
    Interface(InterfaceDecl),

    /// Type alias declaration
    TypeAlias(TypeAliasDecl),

    /// Enum declaration
    Enum(EnumDecl),

    /// Module/namespace declaration
    Module(ModuleDecl),

    /// Variable declaration
    Var(VarDecl),
}

impl Decl {
    /// True when the declaration has no runtime representation.
    pub fn is_type_only(&self) -> bool {
        match self {
            Decl::Interface(_) | Decl::TypeAlias(_) => true,
            Decl::Function(func) => func.is_declare || func.body.is_none(),
            Decl::Class(class) => class.is_declare,
            Decl::Enum(e) => e.is_declare,
            Decl::Module(m) => m.is_declare || !m.has_runtime_content(),
            Decl::Var(var) => var.is_declare,
        }
    }

    /// Names this declaration introduces into the enclosing scope.
    pub fn bound_names(&self) -> Vec<&str> {
        match self {
            Decl::Function(func) => func
                .name
                .as_ref()
                .map(|n| vec![n.value.name.as_str()])
                .unwrap_or_default(),
            Decl::Class(class) => class
                .name
                .as_ref()
                .map(|n| vec![n.value.name.as_str()])
                .unwrap_or_default(),
            Decl::Interface(i) => vec![i.name.value.name.as_str()],
            Decl::TypeAlias(t) => vec![t.name.value.name.as_str()],
            Decl::Enum(e) => vec![e.name.value.name.as_str()],
            Decl::Module(m) => match &m.name {
                ModuleName::Ident(ident) => vec![ident.value.name.as_str()],
                ModuleName::String(_) => vec![],
            },
            Decl::Var(var) => var
                .declarations
                .iter()
                .flat_map(|d| d.pattern.value.bound_names())
                .collect(),
        }
    }
}

/// Function (declaration, expression, method, accessor or constructor)
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Option<Node<Ident>>,
    pub type_params: Option<Vec<TypeParam>>,
    pub params: Vec<Param>,
    pub return_type: Option<Box<Node<Type>>>,
    /// `None` for overload signatures, abstract members and `declare` forms
    pub body: Option<Node<BlockStmt>>,
    pub is_async: bool,
    pub is_generator: bool,
    pub is_declare: bool,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub pattern: Node<Pattern>,
    pub type_annotation: Option<Box<Node<Type>>>,
    pub optional: bool,
    pub is_rest: bool,
    /// Constructor parameter property modifier: `constructor(private x)`
    pub access: Option<AccessModifier>,
    pub is_readonly: bool,
}

impl Param {
    /// True when this is a constructor parameter property.
    pub fn is_property(&self) -> bool {
        self.access.is_some() || self.is_readonly
    }

    /// `this` parameters are a type-level annotation only.
    pub fn is_this_param(&self) -> bool {
        matches!(&self.pattern.value, Pattern::Ident(ident) if ident.value.name == "this")
    }
}

/// Class declaration or expression
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Option<Node<Ident>>,
    pub type_params: Option<Vec<TypeParam>>,
    pub extends: Option<ClassExtends>,
    pub implements: Vec<Node<Type>>,
    pub members: Vec<Node<ClassMember>>,
    pub is_abstract: bool,
    pub is_declare: bool,
}

impl ClassDecl {
    pub fn constructor(&self) -> Option<&Rc<Function>> {
        self.members.iter().find_map(|m| match &m.value {
            ClassMember::Constructor(func) if func.body.is_some() => Some(func),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassExtends {
    pub base: Box<Node<Expr>>,
    pub type_args: Option<Vec<Node<Type>>>,
}

/// Class member
#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    /// Constructor
    Constructor(Rc<Function>),

    /// Method, getter or setter
    Method {
        name: PropertyName,
        kind: MethodKind,
        function: Rc<Function>,
        access: Option<AccessModifier>,
        is_static: bool,
        is_abstract: bool,
        is_optional: bool,
        is_override: bool,
    },

    /// Property/field
    Property {
        name: PropertyName,
        type_annotation: Option<Box<Node<Type>>>,
        init: Option<Node<Expr>>,
        access: Option<AccessModifier>,
        is_static: bool,
        is_readonly: bool,
        is_abstract: bool,
        is_optional: bool,
        is_declare: bool,
    },

    /// Index signature
    IndexSignature {
        key_name: Node<Ident>,
        key_type: Node<Type>,
        value_type: Node<Type>,
        is_readonly: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessModifier {
    Public,
    Private,
    Protected,
}

/// Interface declaration
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub name: Node<Ident>,
    pub type_params: Option<Vec<TypeParam>>,
    pub extends: Vec<Node<Type>>,
    pub members: Vec<ObjectTypeMember>,
}

/// Type alias declaration
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub name: Node<Ident>,
    pub type_params: Option<Vec<TypeParam>>,
    pub ty: Node<Type>,
}

/// Enum declaration
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: Node<Ident>,
    pub members: Vec<EnumMember>,
    pub is_const: bool,
    pub is_declare: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: PropertyName,
    pub init: Option<Node<Expr>>,
}

/// Module/namespace declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    pub name: ModuleName,
    pub body: ModuleBody,
    pub is_declare: bool,
}

impl ModuleDecl {
    /// True when the body contains anything that survives type erasure.
    pub fn has_runtime_content(&self) -> bool {
        match &self.body {
            ModuleBody::Block(items) => items.iter().any(|item| match &item.value {
                ModuleItem::Import(_) => false,
                ModuleItem::Export(ExportDecl::Decl(decl)) => !decl.value.is_type_only(),
                ModuleItem::Export(_) => false,
                ModuleItem::Stmt(stmt) => match &stmt.value {
                    Stmt::Decl(decl) => !decl.is_type_only(),
                    _ => true,
                },
            }),
            ModuleBody::Namespace(inner) => inner.value.has_runtime_content(),
            ModuleBody::None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleName {
    Ident(Node<Ident>),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleBody {
    Block(Vec<Node<ModuleItem>>),
    /// Dotted namespace: `namespace a.b { }` nests `b` inside `a`
    Namespace(Box<Node<ModuleDecl>>),
    /// Shorthand ambient module: `declare module "x";`
    None,
}

// Display implementations

impl fmt::Display for AccessModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessModifier::Public => write!(f, "public"),
            AccessModifier::Private => write!(f, "private"),
            AccessModifier::Protected => write!(f, "protected"),
        }
    }
}

//! Type annotation definitions for the AST
//!
//! Types are parsed so the transpiler can erase them; nothing downstream
//! checks them.

use super::*;
use std::fmt;

/// Type expression
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Keyword types: number, string, boolean, void, any, ...
    Keyword(KeywordType),

    /// Type reference, possibly qualified: `ns.Thing<T>`
    Reference {
        name: Vec<Node<Ident>>,
        type_args: Option<Vec<Node<Type>>>,
    },

    /// Array type: T[]
    Array(Box<Node<Type>>),

    /// Tuple type: [T1, T2, ...]
    Tuple(Vec<Node<Type>>),

    /// Union type: T1 | T2 | ...
    Union(Vec<Node<Type>>),

    /// Intersection type: T1 & T2 & ...
    Intersection(Vec<Node<Type>>),

    /// Function type: (args) => ReturnType
    Function(FunctionType),

    /// Object type literal: { prop: Type; method(): Type }
    Object(Vec<ObjectTypeMember>),

    /// Literal type: "hello" | 42 | true
    Literal(LiteralType),

    /// keyof T
    Keyof(Box<Node<Type>>),

    /// typeof expr (entity name only)
    Typeof(Vec<Node<Ident>>),

    /// Indexed access type: T[K]
    IndexedAccess {
        object_type: Box<Node<Type>>,
        index_type: Box<Node<Type>>,
    },

    /// Parenthesized type
    Paren(Box<Node<Type>>),

    /// Conditional type: `T extends U ? X : Y`
    Conditional {
        check_type: Box<Node<Type>>,
        extends_type: Box<Node<Type>>,
        true_type: Box<Node<Type>>,
        false_type: Box<Node<Type>>,
    },

    /// Mapped type: `{ [K in Keys]: V }`
    Mapped {
        param: Node<Ident>,
        constraint: Box<Node<Type>>,
        value_type: Option<Box<Node<Type>>>,
    },

    /// `infer X` inside a conditional type's extends clause
    Infer(Node<Ident>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordType {
    Number,
    String,
    Boolean,
    Void,
    Null,
    Undefined,
    Any,
    Never,
    Unknown,
    Object,
    Symbol,
    BigInt,
}

impl KeywordType {
    pub fn from_name(name: &str) -> Option<Self> {
        let kw = match name {
            "number" => KeywordType::Number,
            "string" => KeywordType::String,
            "boolean" => KeywordType::Boolean,
            "void" => KeywordType::Void,
            "null" => KeywordType::Null,
            "undefined" => KeywordType::Undefined,
            "any" => KeywordType::Any,
            "never" => KeywordType::Never,
            "unknown" => KeywordType::Unknown,
            "object" => KeywordType::Object,
            "symbol" => KeywordType::Symbol,
            "bigint" => KeywordType::BigInt,
            _ => return None,
        };
        Some(kw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub type_params: Option<Vec<TypeParam>>,
    pub params: Vec<FunctionTypeParam>,
    pub return_type: Box<Node<Type>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTypeParam {
    pub name: Option<Node<Ident>>,
    pub ty: Option<Node<Type>>,
    pub optional: bool,
    pub is_rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectTypeMember {
    Property {
        name: PropertyName,
        ty: Option<Node<Type>>,
        optional: bool,
        readonly: bool,
    },
    Method {
        name: PropertyName,
        type_params: Option<Vec<TypeParam>>,
        params: Vec<FunctionTypeParam>,
        return_type: Option<Node<Type>>,
        optional: bool,
    },
    IndexSignature {
        key_name: Node<Ident>,
        key_type: Node<Type>,
        value_type: Node<Type>,
    },
    CallSignature {
        type_params: Option<Vec<TypeParam>>,
        params: Vec<FunctionTypeParam>,
        return_type: Option<Node<Type>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralType {
    String(String),
    Number(f64),
    Boolean(bool),
}

/// Type parameter (generic)
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: Node<Ident>,
    pub constraint: Option<Box<Node<Type>>>,
    pub default: Option<Box<Node<Type>>>,
}

impl fmt::Display for KeywordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KeywordType::Number => "number",
            KeywordType::String => "string",
            KeywordType::Boolean => "boolean",
            KeywordType::Void => "void",
            KeywordType::Null => "null",
            KeywordType::Undefined => "undefined",
            KeywordType::Any => "any",
            KeywordType::Never => "never",
            KeywordType::Unknown => "unknown",
            KeywordType::Object => "object",
            KeywordType::Symbol => "symbol",
            KeywordType::BigInt => "bigint",
        };
        write!(f, "{}", s)
    }
}

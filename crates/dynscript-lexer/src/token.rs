use dynscript_ast::Span;

/// Represents the different kinds of tokens in TypeScript/JavaScript.
///
/// Only reserved words get their own kind. Contextual keywords such as
/// `type`, `as`, `from`, `of`, `async` or `namespace` lex as
/// [`TokenKind::Identifier`] and are recognised by the parser in context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Reserved words
    Let,
    Const,
    Var,
    Function,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    Class,
    Extends,
    Enum,
    Import,
    Export,
    New,
    This,
    Super,
    Typeof,
    Instanceof,
    In,
    Void,
    Delete,
    Null,
    True,
    False,
    Await,
    Yield,
    Try,
    Catch,
    Finally,
    Throw,
    Debugger,
    With,

    // Literals
    NumberLiteral,
    StringLiteral,
    /// Raw template body between the backticks, `${` nesting preserved
    TemplateLiteral,
    BigIntLiteral,

    // Identifier
    Identifier,

    // Operators
    Plus,              // +
    Minus,             // -
    Star,              // *
    Slash,             // /
    Percent,           // %
    StarStar,          // **
    Eq,                // =
    EqEq,              // ==
    EqEqEq,            // ===
    BangEq,            // !=
    BangEqEq,          // !==
    Lt,                // <
    Gt,                // >
    LtEq,              // <=
    GtEq,              // >=
    AmpAmp,            // &&
    PipePipe,          // ||
    Bang,              // !
    Amp,               // &
    Pipe,              // |
    Caret,             // ^
    Tilde,             // ~
    LtLt,              // <<
    GtGt,              // >>
    GtGtGt,            // >>>
    PlusEq,            // +=
    MinusEq,           // -=
    StarEq,            // *=
    SlashEq,           // /=
    PercentEq,         // %=
    StarStarEq,        // **=
    AmpAmpEq,          // &&=
    PipePipeEq,        // ||=
    QuestionQuestionEq,// ??=
    LtLtEq,            // <<=
    GtGtEq,            // >>=
    GtGtGtEq,          // >>>=
    AmpEq,             // &=
    PipeEq,            // |=
    CaretEq,           // ^=
    QuestionQuestion,  // ??
    QuestionDot,       // ?.
    PlusPlus,          // ++
    MinusMinus,        // --
    FatArrow,          // =>
    DotDotDot,         // ...

    // Delimiters
    LParen,            // (
    RParen,            // )
    LBrace,            // {
    RBrace,            // }
    LBracket,          // [
    RBracket,          // ]
    Semicolon,         // ;
    Comma,             // ,
    Dot,               // .
    Colon,             // :
    Question,          // ?
    At,                // @

    // Special
    Eof,
    Error,
}

impl TokenKind {
    /// Maps a reserved word to its token kind.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "var" => TokenKind::Var,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "class" => TokenKind::Class,
            "extends" => TokenKind::Extends,
            "enum" => TokenKind::Enum,
            "import" => TokenKind::Import,
            "export" => TokenKind::Export,
            "new" => TokenKind::New,
            "this" => TokenKind::This,
            "super" => TokenKind::Super,
            "typeof" => TokenKind::Typeof,
            "instanceof" => TokenKind::Instanceof,
            "in" => TokenKind::In,
            "void" => TokenKind::Void,
            "delete" => TokenKind::Delete,
            "null" => TokenKind::Null,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "await" => TokenKind::Await,
            "yield" => TokenKind::Yield,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "throw" => TokenKind::Throw,
            "debugger" => TokenKind::Debugger,
            "with" => TokenKind::With,
            _ => return None,
        };
        Some(kind)
    }

    /// True for reserved words. Reserved words are valid property names
    /// (`obj.default`, `{ new: 1 }`) and import/export specifier names.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Let
                | TokenKind::Const
                | TokenKind::Var
                | TokenKind::Function
                | TokenKind::Return
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Switch
                | TokenKind::Case
                | TokenKind::Default
                | TokenKind::Class
                | TokenKind::Extends
                | TokenKind::Enum
                | TokenKind::Import
                | TokenKind::Export
                | TokenKind::New
                | TokenKind::This
                | TokenKind::Super
                | TokenKind::Typeof
                | TokenKind::Instanceof
                | TokenKind::In
                | TokenKind::Void
                | TokenKind::Delete
                | TokenKind::Null
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Await
                | TokenKind::Yield
                | TokenKind::Try
                | TokenKind::Catch
                | TokenKind::Finally
                | TokenKind::Throw
                | TokenKind::Debugger
                | TokenKind::With
        )
    }
}

/// Represents a token with its kind, span, and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub value: String,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, span: Span, value: String) -> Self {
        Self {
            kind,
            span,
            value,
            newline_before: false,
        }
    }

    /// Numeric value of a `NumberLiteral` token (decimal, hex, octal or binary).
    pub fn number_value(&self) -> Option<f64> {
        parse_number(&self.value)
    }
}

/// Parses the normalized text the lexer stores for number literals.
pub fn parse_number(text: &str) -> Option<f64> {
    let radix_body = |prefix: &[&str]| {
        prefix
            .iter()
            .find_map(|p| text.strip_prefix(p))
    };

    if let Some(hex) = radix_body(&["0x", "0X"]) {
        return u64::from_str_radix(hex, 16).ok().map(|n| n as f64);
    }
    if let Some(oct) = radix_body(&["0o", "0O"]) {
        return u64::from_str_radix(oct, 8).ok().map(|n| n as f64);
    }
    if let Some(bin) = radix_body(&["0b", "0B"]) {
        return u64::from_str_radix(bin, 2).ok().map(|n| n as f64);
    }
    text.parse::<f64>().ok()
}

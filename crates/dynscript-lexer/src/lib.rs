pub mod token;
pub mod lexer;
pub mod template;

// Re-export all public types from modules
pub use token::{parse_number, Token, TokenKind};
pub use lexer::Lexer;
pub use template::{split_template, Substitution, TemplateParts};

//! Core Parser struct and main parsing methods

use super::*;
use crate::stack::ensure_sufficient_stack;

/// Statements, expressions and types nested deeper than this are rejected.
pub const MAX_NESTING_DEPTH: usize = 1000;

/// Recursive descent parser for TypeScript and JavaScript modules
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) current: usize,
    /// Tokens replaced while splitting `>>` in type argument lists, kept so
    /// speculative parses can rewind them.
    pub(crate) rewrites: Vec<(usize, Token)>,
    /// Set while parsing a `for` head, where `in` ends the initializer.
    pub(crate) no_in: bool,
    /// Current statement/expression/type nesting.
    pub(crate) depth: usize,
}

impl Parser {
    /// Creates a new parser from a token stream
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map_or(true, |t| t.kind != TokenKind::Eof) {
            let end = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span::new(end.end, end.end, end.file_id),
                value: String::new(),
                newline_before: false,
            });
        }
        Self {
            tokens,
            current: 0,
            rewrites: Vec::new(),
            no_in: false,
            depth: 0,
        }
    }

    /// Runs one level of recursive descent, bounded by [`MAX_NESTING_DEPTH`].
    pub(crate) fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error(format!(
                "Nesting exceeds the maximum depth of {MAX_NESTING_DEPTH}"
            )));
        }
        self.depth += 1;
        let result = ensure_sufficient_stack(|| f(self));
        self.depth -= 1;
        result
    }

    /// Parses a complete program
    pub fn parse_program(&mut self) -> Result<Program, Vec<ParseError>> {
        let start_span = self.current_token().span;
        let mut items = Vec::new();
        let mut errors = Vec::new();

        while !self.is_at_end() {
            if self.check(&TokenKind::Error) {
                errors.push(self.error(String::new()));
                self.advance();
                continue;
            }
            match self.parse_module_item() {
                Ok(item) => items.push(item),
                Err(err) => {
                    errors.push(err);
                    self.synchronize();
                }
            }
        }

        if errors.is_empty() {
            let end_span = items.last().map(|item: &Node<ModuleItem>| item.span).unwrap_or(start_span);
            Ok(Program {
                items,
                span: start_span.merge(&end_span),
            })
        } else {
            Err(errors)
        }
    }

    /// Parses a single expression covering the whole token stream.
    pub fn parse_standalone_expression(&mut self) -> ParseResult<Node<Expr>> {
        let expr = self.parse_expression()?;
        if !self.is_at_end() {
            return Err(self.error(format!(
                "Unexpected {:?} after expression",
                self.current_token().kind
            )));
        }
        Ok(expr)
    }

    // =========================================================================
    // Module Items
    // =========================================================================

    pub(crate) fn parse_module_item(&mut self) -> ParseResult<Node<ModuleItem>> {
        let start = self.current_token().span;

        let item = match self.current_token().kind {
            // `import(...)` and `import.meta` are expressions
            TokenKind::Import
                if !matches!(self.peek_kind(1), Some(TokenKind::LParen) | Some(TokenKind::Dot)) =>
            {
                ModuleItem::Import(self.parse_import_decl()?)
            }
            TokenKind::Export => ModuleItem::Export(self.parse_export_decl()?),
            _ => ModuleItem::Stmt(self.parse_statement()?),
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(item, span))
    }

    pub(crate) fn parse_import_decl(&mut self) -> ParseResult<ImportDecl> {
        self.consume(TokenKind::Import)?;

        // import type X from / import type { X } from
        let type_only = self.check_contextual("type")
            && match self.peek_kind(1) {
                Some(TokenKind::LBrace) | Some(TokenKind::Star) => true,
                Some(TokenKind::Identifier) => self
                    .peek_token(1)
                    .map_or(false, |t| t.value != "from")
                    || self.peek_token(2).map_or(false, |t| t.value == "from"),
                _ => false,
            };
        if type_only {
            self.advance();
        }

        // Side-effect import: import "module";
        if self.check(&TokenKind::StringLiteral) {
            let source = self.advance().value.clone();
            self.skip_import_attributes()?;
            self.consume_semicolon()?;
            return Ok(ImportDecl {
                specifiers: Vec::new(),
                source,
                type_only,
            });
        }

        let mut specifiers = Vec::new();

        if self.check(&TokenKind::Identifier) {
            // `import x = require("m")` has no ES module equivalent here
            if self.peek_kind(1) == Some(&TokenKind::Eq) {
                return Err(self.error(
                    "'import = require()' syntax is not supported; use an import declaration"
                        .to_string(),
                ));
            }
            specifiers.push(ImportSpecifier::Default(self.parse_identifier()?));
            if self.check(&TokenKind::Comma) {
                self.advance();
            }
        }

        if self.check(&TokenKind::Star) {
            self.advance();
            self.consume_contextual("as")?;
            specifiers.push(ImportSpecifier::Namespace(self.parse_identifier()?));
        } else if self.check(&TokenKind::LBrace) {
            self.advance();
            while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
                specifiers.push(self.parse_named_import()?);
                if !self.check(&TokenKind::RBrace) {
                    self.consume(TokenKind::Comma)?;
                }
            }
            self.consume(TokenKind::RBrace)?;
        }

        if specifiers.is_empty() {
            return Err(self.error("Expected import specifiers".to_string()));
        }

        self.consume_contextual("from")?;
        let source = self.consume(TokenKind::StringLiteral)?.value.clone();
        self.skip_import_attributes()?;
        self.consume_semicolon()?;

        Ok(ImportDecl {
            specifiers,
            source,
            type_only,
        })
    }

    fn parse_named_import(&mut self) -> ParseResult<ImportSpecifier> {
        // `{ type X }` marks a single binding as type-only
        let type_only = self.check_contextual("type")
            && self.peek_token(1).map_or(false, |t| {
                (t.kind == TokenKind::Identifier || t.kind.is_keyword()) && t.value != "as"
            });
        if type_only {
            self.advance();
        }

        let imported = if self.check(&TokenKind::StringLiteral) {
            let token = self.advance();
            Node::new(Ident::new(token.value.clone()), token.span)
        } else {
            self.parse_identifier_name()?
        };
        let local = if self.check_contextual("as") {
            self.advance();
            Some(self.parse_identifier()?)
        } else {
            None
        };

        Ok(ImportSpecifier::Named {
            imported,
            local,
            type_only,
        })
    }

    /// Skips `with { type: "json" }` / `assert { ... }` import attributes.
    fn skip_import_attributes(&mut self) -> ParseResult<()> {
        if (self.check(&TokenKind::With) || self.check_contextual("assert"))
            && !self.current_token().newline_before
            && self.peek_kind(1) == Some(&TokenKind::LBrace)
        {
            self.advance();
            self.parse_primary()?;
        }
        Ok(())
    }

    pub(crate) fn parse_export_decl(&mut self) -> ParseResult<ExportDecl> {
        self.consume(TokenKind::Export)?;

        // export default ...
        if self.check(&TokenKind::Default) {
            self.advance();
            return self.parse_export_default();
        }

        if self.check(&TokenKind::Eq) {
            return Err(self.error(
                "'export =' syntax is not supported; use 'export default'".to_string(),
            ));
        }

        // export as namespace Foo; (UMD declaration, type-level only)
        if self.check_contextual("as") {
            self.advance();
            self.consume_contextual("namespace")?;
            self.parse_identifier()?;
            self.consume_semicolon()?;
            return Ok(ExportDecl::Named {
                specifiers: Vec::new(),
                source: None,
                type_only: true,
            });
        }

        let type_only = self.check_contextual("type")
            && matches!(self.peek_kind(1), Some(TokenKind::LBrace) | Some(TokenKind::Star));
        if type_only {
            self.advance();
        }

        // export * from "module" / export * as ns from "module"
        if self.check(&TokenKind::Star) {
            self.advance();
            let as_name = if self.check_contextual("as") {
                self.advance();
                Some(self.parse_identifier_name()?)
            } else {
                None
            };
            self.consume_contextual("from")?;
            let source = self.consume(TokenKind::StringLiteral)?.value.clone();
            self.skip_import_attributes()?;
            self.consume_semicolon()?;
            return Ok(ExportDecl::All {
                source,
                as_name,
                type_only,
            });
        }

        // export { a, b as c } [from "module"]
        if self.check(&TokenKind::LBrace) {
            self.advance();
            let mut specifiers = Vec::new();
            while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
                specifiers.push(self.parse_export_specifier()?);
                if !self.check(&TokenKind::RBrace) {
                    self.consume(TokenKind::Comma)?;
                }
            }
            self.consume(TokenKind::RBrace)?;

            let source = if self.check_contextual("from") {
                self.advance();
                let source = self.consume(TokenKind::StringLiteral)?.value.clone();
                self.skip_import_attributes()?;
                Some(source)
            } else {
                None
            };
            self.consume_semicolon()?;

            return Ok(ExportDecl::Named {
                specifiers,
                source,
                type_only,
            });
        }

        // export <declaration>
        let decl = if self.at_declaration_start() {
            self.parse_declaration()?
        } else {
            match self.current_token().kind {
                TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                    let start = self.current_token().span;
                    let var_decl = self.parse_var_decl(false)?;
                    self.consume_semicolon()?;
                    let span = start.merge(&self.previous_token().span);
                    Node::new(Decl::Var(var_decl), span)
                }
                _ => {
                    return Err(self.error(format!(
                        "Unexpected {:?} after 'export'",
                        self.current_token().kind
                    )))
                }
            }
        };

        Ok(ExportDecl::Decl(Box::new(decl)))
    }

    fn parse_export_default(&mut self) -> ParseResult<ExportDecl> {
        let is_async_function = self.check_contextual("async")
            && self.peek_kind(1) == Some(&TokenKind::Function)
            && self.peek_same_line(1);
        let is_abstract_class =
            self.check_contextual("abstract") && self.peek_kind(1) == Some(&TokenKind::Class);
        let is_interface = self.check_contextual("interface")
            && self.peek_kind(1) == Some(&TokenKind::Identifier);

        if self.check(&TokenKind::Function)
            || self.check(&TokenKind::Class)
            || is_async_function
            || is_abstract_class
            || is_interface
        {
            let decl = self.parse_declaration()?;
            return Ok(ExportDecl::DefaultDecl(Box::new(decl)));
        }

        let expr = self.parse_assignment_expression()?;
        self.consume_semicolon()?;
        Ok(ExportDecl::Default(expr))
    }

    fn parse_export_specifier(&mut self) -> ParseResult<ExportSpecifier> {
        let type_only = self.check_contextual("type")
            && self.peek_token(1).map_or(false, |t| {
                (t.kind == TokenKind::Identifier || t.kind.is_keyword()) && t.value != "as"
            });
        if type_only {
            self.advance();
        }

        let local = self.parse_export_name()?;
        let exported = if self.check_contextual("as") {
            self.advance();
            Some(self.parse_export_name()?)
        } else {
            None
        };

        Ok(ExportSpecifier {
            local,
            exported,
            type_only,
        })
    }

    fn parse_export_name(&mut self) -> ParseResult<Node<Ident>> {
        if self.check(&TokenKind::StringLiteral) {
            let token = self.advance();
            return Ok(Node::new(Ident::new(token.value.clone()), token.span));
        }
        self.parse_identifier_name()
    }
}

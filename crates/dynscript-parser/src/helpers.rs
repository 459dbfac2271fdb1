//! Helper methods and utilities

use super::*;

/// Saved parser position for speculative parsing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    current: usize,
    rewrites: usize,
    no_in: bool,
}

impl Parser {
    pub(crate) fn parse_identifier(&mut self) -> ParseResult<Node<Ident>> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Node::new(Ident::new(token.value.clone()), token.span))
    }

    /// IdentifierName: an identifier or any reserved word.
    /// Valid after `.`, as object keys and in import/export specifiers.
    pub(crate) fn parse_identifier_name(&mut self) -> ParseResult<Node<Ident>> {
        let token = self.current_token();
        if token.kind == TokenKind::Identifier || token.kind.is_keyword() {
            let token = self.advance();
            Ok(Node::new(Ident::new(token.value.clone()), token.span))
        } else {
            Err(self.error(format!(
                "Expected identifier, found {:?}",
                self.current_token().kind
            )))
        }
    }

    pub(crate) fn is_identifier_name(&self) -> bool {
        let kind = &self.current_token().kind;
        *kind == TokenKind::Identifier || kind.is_keyword()
    }

    pub(crate) fn parse_property_name(&mut self) -> ParseResult<PropertyName> {
        match self.current_token().kind {
            TokenKind::StringLiteral => {
                let value = self.advance().value.clone();
                Ok(PropertyName::String(value))
            }
            TokenKind::NumberLiteral => {
                let token = self.advance();
                let num = token.number_value().unwrap_or(f64::NAN);
                Ok(PropertyName::Number(num))
            }
            TokenKind::LBracket => {
                self.advance();
                let expr = self.with_in_allowed(|p| p.parse_assignment_expression())?;
                self.consume(TokenKind::RBracket)?;
                Ok(PropertyName::Computed(Box::new(expr)))
            }
            _ if self.is_identifier_name() => {
                let ident = self.parse_identifier_name()?;
                Ok(PropertyName::Ident(ident))
            }
            _ => Err(self.error("Expected property name".to_string())),
        }
    }

    pub(crate) fn parse_function_params(&mut self) -> ParseResult<Vec<Param>> {
        let mut params = Vec::new();

        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            params.push(self.parse_function_param()?);
            if !self.check(&TokenKind::RParen) {
                self.consume(TokenKind::Comma)?;
            }
        }

        Ok(params)
    }

    pub(crate) fn parse_function_param(&mut self) -> ParseResult<Param> {
        // Constructor parameter properties: `private x`, `readonly y`, `public readonly z`
        let mut access = None;
        let mut is_readonly = false;
        loop {
            let modifier = match self.current_token().value.as_str() {
                "public" => Some(AccessModifier::Public),
                "private" => Some(AccessModifier::Private),
                "protected" => Some(AccessModifier::Protected),
                _ => None,
            };
            let is_modifier_word = self.check(&TokenKind::Identifier)
                && (modifier.is_some() || self.current_token().value == "readonly")
                && matches!(
                    self.peek_kind(1),
                    Some(TokenKind::Identifier) | Some(TokenKind::LBrace) | Some(TokenKind::LBracket)
                );
            if !is_modifier_word {
                break;
            }
            match modifier {
                Some(m) => access = Some(m),
                None => is_readonly = true,
            }
            self.advance();
        }

        let is_rest = if self.check(&TokenKind::DotDotDot) {
            self.advance();
            true
        } else {
            false
        };

        let mut pattern = if self.check(&TokenKind::This) {
            let token = self.advance();
            Node::new(
                Pattern::Ident(Node::new(Ident::new("this"), token.span)),
                token.span,
            )
        } else {
            self.parse_pattern()?
        };

        let optional = if self.check(&TokenKind::Question) {
            self.advance();
            true
        } else {
            false
        };

        let type_annotation = if self.check(&TokenKind::Colon) {
            self.advance();
            Some(Box::new(self.parse_type()?))
        } else {
            None
        };

        if self.check(&TokenKind::Eq) {
            self.advance();
            let default = Box::new(self.with_in_allowed(|p| p.parse_assignment_expression())?);
            let span = pattern.span.merge(&default.span);
            pattern = Node::new(
                Pattern::Assignment {
                    pattern: Box::new(pattern),
                    default,
                },
                span,
            );
        }

        Ok(Param {
            pattern,
            type_annotation,
            optional,
            is_rest,
            access,
            is_readonly,
        })
    }

    /// Optional `: Type` return annotation, including `x is T` predicates.
    pub(crate) fn parse_return_type(&mut self) -> ParseResult<Option<Box<Node<Type>>>> {
        if !self.check(&TokenKind::Colon) {
            return Ok(None);
        }
        self.advance();

        // asserts x [is T]
        if self.check_contextual("asserts")
            && matches!(self.peek_kind(1), Some(TokenKind::Identifier) | Some(TokenKind::This))
        {
            let start = self.current_token().span;
            self.advance();
            self.advance();
            if self.check_contextual("is") {
                self.advance();
                self.parse_type()?;
            }
            let span = start.merge(&self.previous_token().span);
            return Ok(Some(Box::new(Node::new(
                Type::Keyword(KeywordType::Void),
                span,
            ))));
        }

        // x is T
        if matches!(self.current_token().kind, TokenKind::Identifier | TokenKind::This)
            && self.peek_token(1).map_or(false, |t| t.kind == TokenKind::Identifier && t.value == "is")
        {
            let start = self.current_token().span;
            self.advance();
            self.advance();
            self.parse_type()?;
            let span = start.merge(&self.previous_token().span);
            return Ok(Some(Box::new(Node::new(
                Type::Keyword(KeywordType::Boolean),
                span,
            ))));
        }

        Ok(Some(Box::new(self.parse_type()?)))
    }

    pub(crate) fn parse_binary_operator(&mut self) -> ParseResult<BinaryOp> {
        let op = match self.current_token().kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::StarStar => BinaryOp::Pow,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::BangEq => BinaryOp::NotEq,
            TokenKind::EqEqEq => BinaryOp::StrictEq,
            TokenKind::BangEqEq => BinaryOp::StrictNotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::LtEq => BinaryOp::LtEq,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::GtEq => BinaryOp::GtEq,
            TokenKind::AmpAmp => BinaryOp::And,
            TokenKind::PipePipe => BinaryOp::Or,
            TokenKind::QuestionQuestion => BinaryOp::NullishCoalesce,
            TokenKind::Amp => BinaryOp::BitAnd,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::LtLt => BinaryOp::LeftShift,
            TokenKind::GtGt => BinaryOp::RightShift,
            TokenKind::GtGtGt => BinaryOp::UnsignedRightShift,
            TokenKind::In => BinaryOp::In,
            TokenKind::Instanceof => BinaryOp::InstanceOf,
            _ => return Err(self.error("Expected binary operator".to_string())),
        };
        self.advance();
        Ok(op)
    }

    pub(crate) fn assignment_operator(&self) -> Option<AssignmentOp> {
        let op = match self.current_token().kind {
            TokenKind::Eq => AssignmentOp::Assign,
            TokenKind::PlusEq => AssignmentOp::AddAssign,
            TokenKind::MinusEq => AssignmentOp::SubAssign,
            TokenKind::StarEq => AssignmentOp::MulAssign,
            TokenKind::SlashEq => AssignmentOp::DivAssign,
            TokenKind::PercentEq => AssignmentOp::ModAssign,
            TokenKind::StarStarEq => AssignmentOp::PowAssign,
            TokenKind::AmpAmpEq => AssignmentOp::AndAssign,
            TokenKind::PipePipeEq => AssignmentOp::OrAssign,
            TokenKind::QuestionQuestionEq => AssignmentOp::NullishAssign,
            TokenKind::LtLtEq => AssignmentOp::LeftShiftAssign,
            TokenKind::GtGtEq => AssignmentOp::RightShiftAssign,
            TokenKind::GtGtGtEq => AssignmentOp::UnsignedRightShiftAssign,
            TokenKind::AmpEq => AssignmentOp::BitAndAssign,
            TokenKind::PipeEq => AssignmentOp::BitOrAssign,
            TokenKind::CaretEq => AssignmentOp::BitXorAssign,
            _ => return None,
        };
        Some(op)
    }

    // =========================================================================
    // Operator Precedence
    // =========================================================================

    /// Binary operator precedence; 0 means "not a binary operator here".
    pub(crate) fn get_infix_precedence(&self) -> u8 {
        match self.current_token().kind {
            TokenKind::QuestionQuestion => 3,
            TokenKind::PipePipe => 4,
            TokenKind::AmpAmp => 5,
            TokenKind::Pipe => 6,
            TokenKind::Caret => 7,
            TokenKind::Amp => 8,
            TokenKind::EqEq | TokenKind::BangEq | TokenKind::EqEqEq | TokenKind::BangEqEq => 9,
            TokenKind::In if self.no_in => 0,
            TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEq
            | TokenKind::GtEq
            | TokenKind::In
            | TokenKind::Instanceof => 10,
            // `as` / `satisfies` bind like relational operators, same line only
            TokenKind::Identifier
                if !self.current_token().newline_before
                    && matches!(self.current_token().value.as_str(), "as" | "satisfies") =>
            {
                10
            }
            TokenKind::LtLt | TokenKind::GtGt | TokenKind::GtGtGt => 11,
            TokenKind::Plus | TokenKind::Minus => 12,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 13,
            TokenKind::StarStar => 14,
            _ => 0,
        }
    }

    // =========================================================================
    // Utility Methods (Token Manipulation)
    // =========================================================================

    pub(crate) fn current_token(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    pub(crate) fn previous_token(&self) -> &Token {
        &self.tokens[(self.current.saturating_sub(1)).min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_token(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.current + offset)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous_token()
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        !self.is_at_end() && &self.current_token().kind == kind
    }

    /// True when the current token is the contextual keyword `word`.
    pub(crate) fn check_contextual(&self, word: &str) -> bool {
        self.check(&TokenKind::Identifier) && self.current_token().value == word
    }

    pub(crate) fn consume_contextual(&mut self, word: &str) -> ParseResult<()> {
        if self.check_contextual(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "Expected '{}', found {:?}",
                word,
                self.current_token().kind
            )))
        }
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.peek_token(offset).map(|t| &t.kind)
    }

    /// True when the token at `offset` starts on the same line as its predecessor.
    pub(crate) fn peek_same_line(&self, offset: usize) -> bool {
        self.peek_token(offset).map_or(false, |t| !t.newline_before)
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.current_token().kind == TokenKind::Eof
    }

    pub(crate) fn consume(&mut self, kind: TokenKind) -> ParseResult<&Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!(
                "Expected {:?}, found {:?}",
                kind,
                self.current_token().kind
            )))
        }
    }

    /// Consumes a single `>`, splitting `>>`, `>>>`, `>=` and friends when
    /// they close a type argument list.
    pub(crate) fn consume_gt(&mut self) -> ParseResult<()> {
        let rest = match self.current_token().kind {
            TokenKind::Gt => {
                self.advance();
                return Ok(());
            }
            TokenKind::GtGt => (TokenKind::Gt, ">"),
            TokenKind::GtGtGt => (TokenKind::GtGt, ">>"),
            TokenKind::GtEq => (TokenKind::Eq, "="),
            TokenKind::GtGtEq => (TokenKind::GtEq, ">="),
            TokenKind::GtGtGtEq => (TokenKind::GtGtEq, ">>="),
            _ => {
                return Err(self.error(format!(
                    "Expected '>', found {:?}",
                    self.current_token().kind
                )))
            }
        };

        let index = self.current;
        let original = self.tokens[index].clone();
        let mut split = original.clone();
        split.kind = rest.0;
        split.value = rest.1.to_string();
        split.span.start += 1;
        split.newline_before = false;
        self.rewrites.push((index, original));
        self.tokens[index] = split;
        Ok(())
    }

    /// Statement terminator with automatic semicolon insertion: an explicit
    /// `;`, or a following `}`, end of input or line break.
    pub(crate) fn consume_semicolon(&mut self) -> ParseResult<()> {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            return Ok(());
        }
        if self.check(&TokenKind::RBrace) || self.is_at_end() || self.current_token().newline_before {
            return Ok(());
        }
        Err(self.error(format!(
            "Expected ';', found {:?}",
            self.current_token().kind
        )))
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            current: self.current,
            rewrites: self.rewrites.len(),
            no_in: self.no_in,
        }
    }

    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        while self.rewrites.len() > checkpoint.rewrites {
            if let Some((index, token)) = self.rewrites.pop() {
                self.tokens[index] = token;
            }
        }
        self.current = checkpoint.current;
        self.no_in = checkpoint.no_in;
    }

    /// Runs `f` speculatively, rewinding on failure.
    pub(crate) fn try_parse<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> Option<T> {
        let checkpoint = self.checkpoint();
        match f(self) {
            Ok(value) => Some(value),
            Err(_) => {
                self.restore(checkpoint);
                None
            }
        }
    }

    /// Parses with the `in` operator enabled (inside brackets and bodies).
    pub(crate) fn with_in_allowed<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = f(self);
        self.no_in = saved;
        result
    }

    pub(crate) fn error(&self, message: String) -> ParseError {
        let token = self.current_token();
        if token.kind == TokenKind::Error {
            return ParseError::new(token.value.clone(), token.span);
        }
        ParseError::new(message, token.span)
    }

    pub(crate) fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous_token().kind == TokenKind::Semicolon
                || self.previous_token().kind == TokenKind::RBrace
            {
                return;
            }

            match self.current_token().kind {
                TokenKind::Class
                | TokenKind::Function
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Return
                | TokenKind::Import
                | TokenKind::Export => return,
                _ => {}
            }

            self.advance();
        }
    }
}

//! Expression parsing using Pratt parsing for operator precedence

use super::*;
use std::rc::Rc;

impl Parser {
    /// Full expression, including the comma operator.
    pub(crate) fn parse_expression(&mut self) -> ParseResult<Node<Expr>> {
        let first = self.parse_assignment_expression()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut exprs = vec![first];
        while self.check(&TokenKind::Comma) {
            self.advance();
            exprs.push(self.parse_assignment_expression()?);
        }

        let span = exprs[0].span.merge(&self.previous_token().span);
        Ok(Node::new(Expr::Sequence(exprs), span))
    }

    pub(crate) fn parse_assignment_expression(&mut self) -> ParseResult<Node<Expr>> {
        self.nested(|p| p.parse_assignment_expression_inner())
    }

    fn parse_assignment_expression_inner(&mut self) -> ParseResult<Node<Expr>> {
        if let Some(arrow) = self.try_parse_arrow_function()? {
            return Ok(arrow);
        }

        if self.check(&TokenKind::Yield) {
            return self.parse_yield();
        }

        let target = self.parse_conditional()?;

        if let Some(op) = self.assignment_operator() {
            if !is_assignment_target(&target.value, op) {
                return Err(ParseError::new("Invalid assignment target", target.span));
            }
            self.advance();
            let value = self.parse_assignment_expression()?;
            let span = target.span.merge(&value.span);
            return Ok(Node::new(
                Expr::Assignment {
                    target: Box::new(target),
                    op,
                    value: Box::new(value),
                },
                span,
            ));
        }

        Ok(target)
    }

    fn parse_yield(&mut self) -> ParseResult<Node<Expr>> {
        let start = self.current_token().span;
        self.consume(TokenKind::Yield)?;

        let delegate = if self.check(&TokenKind::Star) {
            self.advance();
            true
        } else {
            false
        };

        let ends_here = self.current_token().newline_before
            || matches!(
                self.current_token().kind,
                TokenKind::RParen
                    | TokenKind::RBracket
                    | TokenKind::RBrace
                    | TokenKind::Comma
                    | TokenKind::Semicolon
                    | TokenKind::Colon
                    | TokenKind::Eof
            );
        let argument = if ends_here && !delegate {
            None
        } else {
            Some(Box::new(self.parse_assignment_expression()?))
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(Expr::Yield { argument, delegate }, span))
    }

    // =========================================================================
    // Arrow Functions
    // =========================================================================

    /// Recognizes `x => ...`, `(a, b) => ...`, `<T>(a: T) => ...` and their
    /// `async` forms. Returns `None` (with the position untouched) when the
    /// tokens ahead are not an arrow function.
    fn try_parse_arrow_function(&mut self) -> ParseResult<Option<Node<Expr>>> {
        let start = self.current_token().span;

        let is_async = self.check_contextual("async")
            && self.peek_same_line(1)
            && matches!(
                self.peek_kind(1),
                Some(TokenKind::Identifier) | Some(TokenKind::LParen) | Some(TokenKind::Lt)
            );
        let offset = usize::from(is_async);

        // Single identifier parameter
        if self.peek_kind(offset) == Some(&TokenKind::Identifier)
            && self.peek_kind(offset + 1) == Some(&TokenKind::FatArrow)
            && self.peek_same_line(offset + 1)
        {
            if is_async {
                self.advance();
            }
            let ident = self.parse_identifier()?;
            self.consume(TokenKind::FatArrow)?;
            let param = Param {
                pattern: Node::new(Pattern::Ident(ident.clone()), ident.span),
                type_annotation: None,
                optional: false,
                is_rest: false,
                access: None,
                is_readonly: false,
            };
            let arrow = self.parse_arrow_body(start, None, vec![param], None, is_async)?;
            return Ok(Some(arrow));
        }

        if !matches!(
            self.peek_kind(offset),
            Some(TokenKind::LParen) | Some(TokenKind::Lt)
        ) {
            return Ok(None);
        }

        let checkpoint = self.checkpoint();
        if is_async {
            self.advance();
        }
        match self.try_parse(|p| p.parse_arrow_head()) {
            Some((type_params, params, return_type)) => {
                let arrow =
                    self.parse_arrow_body(start, type_params, params, return_type, is_async)?;
                Ok(Some(arrow))
            }
            None => {
                self.restore(checkpoint);
                Ok(None)
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn parse_arrow_head(
        &mut self,
    ) -> ParseResult<(Option<Vec<TypeParam>>, Vec<Param>, Option<Box<Node<Type>>>)> {
        let type_params = if self.check(&TokenKind::Lt) {
            Some(self.parse_type_params()?)
        } else {
            None
        };

        self.consume(TokenKind::LParen)?;
        let params = self.with_in_allowed(|p| p.parse_function_params())?;
        self.consume(TokenKind::RParen)?;

        let return_type = self.parse_return_type()?;

        if !self.check(&TokenKind::FatArrow) || self.current_token().newline_before {
            return Err(self.error("Expected '=>'".to_string()));
        }
        self.advance();

        Ok((type_params, params, return_type))
    }

    fn parse_arrow_body(
        &mut self,
        start: Span,
        type_params: Option<Vec<TypeParam>>,
        params: Vec<Param>,
        return_type: Option<Box<Node<Type>>>,
        is_async: bool,
    ) -> ParseResult<Node<Expr>> {
        let body = if self.check(&TokenKind::LBrace) {
            ArrowBody::Block(self.parse_block_statement()?)
        } else {
            ArrowBody::Expr(Box::new(self.parse_assignment_expression()?))
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(
            Expr::Arrow(Rc::new(ArrowFunction {
                type_params,
                params,
                return_type,
                body,
                is_async,
            })),
            span,
        ))
    }

    // =========================================================================
    // Conditional and Binary Expressions
    // =========================================================================

    fn parse_conditional(&mut self) -> ParseResult<Node<Expr>> {
        let condition = self.parse_expression_with_precedence(1)?;

        if !self.check(&TokenKind::Question) {
            return Ok(condition);
        }
        self.advance();

        let then_expr = self.with_in_allowed(|p| p.parse_assignment_expression())?;
        self.consume(TokenKind::Colon)?;
        let else_expr = self.parse_assignment_expression()?;

        let span = condition.span.merge(&else_expr.span);
        Ok(Node::new(
            Expr::Ternary {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    /// Pratt loop over binary operators with precedence >= `min_precedence`.
    pub(crate) fn parse_expression_with_precedence(
        &mut self,
        min_precedence: u8,
    ) -> ParseResult<Node<Expr>> {
        let mut left = self.parse_unary()?;

        loop {
            let precedence = self.get_infix_precedence();
            if precedence == 0 || precedence < min_precedence {
                break;
            }

            // x as T / x satisfies T
            if self.check(&TokenKind::Identifier) {
                let is_as = self.current_token().value == "as";
                self.advance();
                let ty = self.parse_type()?;
                let span = left.span.merge(&ty.span);
                let expr = Box::new(left);
                let ty = Box::new(ty);
                left = if is_as {
                    Node::new(Expr::TypeCast { expr, ty }, span)
                } else {
                    Node::new(Expr::Satisfies { expr, ty }, span)
                };
                continue;
            }

            let op = self.parse_binary_operator()?;
            // ** is right-associative
            let next_precedence = if op == BinaryOp::Pow {
                precedence
            } else {
                precedence + 1
            };
            let right = self.parse_expression_with_precedence(next_precedence)?;

            let span = left.span.merge(&right.span);
            left = Node::new(
                Expr::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Node<Expr>> {
        self.nested(|p| p.parse_unary_inner())
    }

    fn parse_unary_inner(&mut self) -> ParseResult<Node<Expr>> {
        let start = self.current_token().span;

        let op = match self.current_token().kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Typeof => Some(UnaryOp::TypeOf),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            TokenKind::PlusPlus => Some(UnaryOp::PreIncrement),
            TokenKind::MinusMinus => Some(UnaryOp::PreDecrement),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            if op.is_update() && !is_assignment_target(&operand.value, AssignmentOp::AddAssign) {
                return Err(ParseError::new(
                    "Invalid left-hand side expression in prefix operation",
                    operand.span,
                ));
            }
            let span = start.merge(&operand.span);
            return Ok(Node::new(
                Expr::Unary {
                    op,
                    expr: Box::new(operand),
                },
                span,
            ));
        }

        if self.check(&TokenKind::Await) {
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.merge(&operand.span);
            return Ok(Node::new(Expr::Await(Box::new(operand)), span));
        }

        // Angle-bracket assertion: <T>expr
        if self.check(&TokenKind::Lt) {
            self.advance();
            let ty = self.parse_type()?;
            self.consume_gt()?;
            let operand = self.parse_unary()?;
            let span = start.merge(&operand.span);
            return Ok(Node::new(
                Expr::TypeCast {
                    expr: Box::new(operand),
                    ty: Box::new(ty),
                },
                span,
            ));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Node<Expr>> {
        let expr = self.parse_left_hand_side(true)?;

        let op = match self.current_token().kind {
            TokenKind::PlusPlus if !self.current_token().newline_before => UnaryOp::PostIncrement,
            TokenKind::MinusMinus if !self.current_token().newline_before => UnaryOp::PostDecrement,
            _ => return Ok(expr),
        };

        if !is_assignment_target(&expr.value, AssignmentOp::AddAssign) {
            return Err(ParseError::new(
                "Invalid left-hand side expression in postfix operation",
                expr.span,
            ));
        }
        self.advance();
        let span = expr.span.merge(&self.previous_token().span);
        Ok(Node::new(
            Expr::Unary {
                op,
                expr: Box::new(expr),
            },
            span,
        ))
    }

    // =========================================================================
    // Member Access and Calls
    // =========================================================================

    /// Member accesses, calls and `new`. With `allow_call` unset, stops
    /// before an argument list (used for `new` callees).
    pub(crate) fn parse_left_hand_side(&mut self, allow_call: bool) -> ParseResult<Node<Expr>> {
        let start = self.current_token().span;
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary()?
        };

        loop {
            match self.current_token().kind {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.parse_identifier_name()?;
                    let span = start.merge(&property.span);
                    expr = Node::new(
                        Expr::Member {
                            object: Box::new(expr),
                            property,
                        },
                        span,
                    );
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    expr = self.parse_optional_chain_link(start, expr)?;
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.with_in_allowed(|p| p.parse_expression())?;
                    self.consume(TokenKind::RBracket)?;
                    let span = start.merge(&self.previous_token().span);
                    expr = Node::new(
                        Expr::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::LParen if allow_call => {
                    let args = self.parse_arguments()?;
                    let span = start.merge(&self.previous_token().span);
                    expr = Node::new(
                        Expr::Call {
                            callee: Box::new(expr),
                            type_args: None,
                            args,
                        },
                        span,
                    );
                }
                TokenKind::Lt if allow_call => {
                    // f<T>(x): only a call when an argument list follows the type arguments
                    let type_args = self.try_parse(|p| {
                        let args = p.parse_type_arguments()?;
                        if p.check(&TokenKind::LParen) {
                            Ok(args)
                        } else {
                            Err(p.error("Expected '('".to_string()))
                        }
                    });
                    let Some(type_args) = type_args else { break };
                    let args = self.parse_arguments()?;
                    let span = start.merge(&self.previous_token().span);
                    expr = Node::new(
                        Expr::Call {
                            callee: Box::new(expr),
                            type_args: Some(type_args),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::Bang if !self.current_token().newline_before => {
                    self.advance();
                    let span = start.merge(&self.previous_token().span);
                    expr = Node::new(Expr::NonNullAssertion(Box::new(expr)), span);
                }
                TokenKind::TemplateLiteral => {
                    return Err(self.error("Tagged templates are not supported".to_string()));
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_optional_chain_link(&mut self, start: Span, object: Node<Expr>) -> ParseResult<Node<Expr>> {
        let link = match self.current_token().kind {
            TokenKind::LParen => Expr::OptionalCall {
                callee: Box::new(object),
                type_args: None,
                args: self.parse_arguments()?,
            },
            TokenKind::Lt => {
                let type_args = self.parse_type_arguments()?;
                Expr::OptionalCall {
                    callee: Box::new(object),
                    type_args: Some(type_args),
                    args: self.parse_arguments()?,
                }
            }
            TokenKind::LBracket => {
                self.advance();
                let index = self.with_in_allowed(|p| p.parse_expression())?;
                self.consume(TokenKind::RBracket)?;
                Expr::OptionalIndex {
                    object: Box::new(object),
                    index: Box::new(index),
                }
            }
            _ => Expr::OptionalMember {
                object: Box::new(object),
                property: self.parse_identifier_name()?,
            },
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(link, span))
    }

    fn parse_new_expression(&mut self) -> ParseResult<Node<Expr>> {
        let start = self.current_token().span;
        self.consume(TokenKind::New)?;

        if self.check(&TokenKind::Dot) {
            return Err(self.error("'new.target' is not supported".to_string()));
        }

        let callee = self.parse_left_hand_side(false)?;

        let type_args = if self.check(&TokenKind::Lt) {
            self.try_parse(|p| p.parse_type_arguments())
        } else {
            None
        };

        let args = if self.check(&TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(
            Expr::New {
                callee: Box::new(callee),
                type_args,
                args,
            },
            span,
        ))
    }

    pub(crate) fn parse_arguments(&mut self) -> ParseResult<Vec<Node<Expr>>> {
        self.consume(TokenKind::LParen)?;
        let args = self.with_in_allowed(|p| {
            let mut args = Vec::new();
            while !p.check(&TokenKind::RParen) && !p.is_at_end() {
                args.push(p.parse_spread_or_assignment()?);
                if !p.check(&TokenKind::RParen) {
                    p.consume(TokenKind::Comma)?;
                }
            }
            Ok(args)
        })?;
        self.consume(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_spread_or_assignment(&mut self) -> ParseResult<Node<Expr>> {
        if self.check(&TokenKind::DotDotDot) {
            let start = self.current_token().span;
            self.advance();
            let inner = self.parse_assignment_expression()?;
            let span = start.merge(&inner.span);
            return Ok(Node::new(Expr::Spread(Box::new(inner)), span));
        }
        self.parse_assignment_expression()
    }

    // =========================================================================
    // Primary Expressions
    // =========================================================================

    pub(crate) fn parse_primary(&mut self) -> ParseResult<Node<Expr>> {
        let start = self.current_token().span;

        let expr = match self.current_token().kind {
            TokenKind::NumberLiteral | TokenKind::BigIntLiteral => {
                let token = self.advance();
                let value = token.number_value().unwrap_or(f64::NAN);
                Expr::Literal(Literal::Number(value))
            }
            TokenKind::StringLiteral => {
                let value = self.advance().value.clone();
                Expr::Literal(Literal::String(value))
            }
            TokenKind::TemplateLiteral => return self.parse_template_literal(),
            TokenKind::True => {
                self.advance();
                Expr::Literal(Literal::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Expr::Literal(Literal::Boolean(false))
            }
            TokenKind::Null => {
                self.advance();
                Expr::Literal(Literal::Null)
            }
            TokenKind::This => {
                self.advance();
                Expr::This
            }
            TokenKind::Super => {
                self.advance();
                Expr::Super
            }
            TokenKind::Identifier
                if self.current_token().value == "async"
                    && self.peek_kind(1) == Some(&TokenKind::Function)
                    && self.peek_same_line(1) =>
            {
                self.advance();
                let func = self.parse_function(true, false, false)?;
                Expr::Function(Rc::new(func))
            }
            TokenKind::Identifier => {
                let name = self.advance().value.clone();
                Expr::Ident(Ident::new(name))
            }
            TokenKind::Function => {
                let func = self.parse_function(false, false, false)?;
                Expr::Function(Rc::new(func))
            }
            TokenKind::Class => {
                let class = self.parse_class(false, false)?;
                Expr::Class(Rc::new(class))
            }
            TokenKind::Import if self.peek_kind(1) == Some(&TokenKind::LParen) => {
                let token = self.advance();
                Expr::Ident(Ident::new(token.value.clone()))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.with_in_allowed(|p| p.parse_expression())?;
                self.consume(TokenKind::RParen)?;
                Expr::Paren(Box::new(inner))
            }
            TokenKind::LBracket => self.parse_array_literal()?,
            TokenKind::LBrace => self.parse_object_literal()?,
            TokenKind::Slash | TokenKind::SlashEq => {
                return Err(self.error("Regular expression literals are not supported".to_string()));
            }
            _ => {
                return Err(self.error(format!(
                    "Unexpected token: {:?}",
                    self.current_token().kind
                )))
            }
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(expr, span))
    }

    /// Splits the raw template body and parses each `${}` substitution with
    /// a sub-parser whose spans point back into the enclosing source.
    fn parse_template_literal(&mut self) -> ParseResult<Node<Expr>> {
        let token = self.advance().clone();
        let parts = split_template(&token.value)
            .map_err(|message| ParseError::new(message, token.span))?;

        let body_start = token.span.start + 1;
        let mut exprs = Vec::with_capacity(parts.substitutions.len());
        for substitution in &parts.substitutions {
            let tokens = Lexer::with_offset(
                &substitution.source,
                token.span.file_id,
                body_start + substitution.offset,
            )
            .tokenize();
            let mut parser = Parser::new(tokens);
            exprs.push(parser.parse_standalone_expression()?);
        }

        Ok(Node::new(
            Expr::Template {
                parts: parts.quasis,
                exprs,
            },
            token.span,
        ))
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expr> {
        self.consume(TokenKind::LBracket)?;

        let elements = self.with_in_allowed(|p| {
            let mut elements = Vec::new();
            while !p.check(&TokenKind::RBracket) && !p.is_at_end() {
                // hole: [a, , b]
                if p.check(&TokenKind::Comma) {
                    p.advance();
                    elements.push(None);
                    continue;
                }
                elements.push(Some(p.parse_spread_or_assignment()?));
                if !p.check(&TokenKind::RBracket) {
                    p.consume(TokenKind::Comma)?;
                }
            }
            Ok(elements)
        })?;

        self.consume(TokenKind::RBracket)?;
        Ok(Expr::Array(elements))
    }

    fn parse_object_literal(&mut self) -> ParseResult<Expr> {
        self.consume(TokenKind::LBrace)?;

        let properties = self.with_in_allowed(|p| {
            let mut properties = Vec::new();
            while !p.check(&TokenKind::RBrace) && !p.is_at_end() {
                if p.check(&TokenKind::DotDotDot) {
                    p.advance();
                    properties.push(ObjectProperty::Spread(p.parse_assignment_expression()?));
                } else {
                    properties.push(p.parse_object_member()?);
                }
                if !p.check(&TokenKind::RBrace) {
                    p.consume(TokenKind::Comma)?;
                }
            }
            Ok(properties)
        })?;

        self.consume(TokenKind::RBrace)?;
        Ok(Expr::Object(properties))
    }

    fn parse_object_member(&mut self) -> ParseResult<ObjectProperty> {
        let (kind, is_async, is_generator) = self.parse_method_prefix();
        let key = self.parse_property_name()?;

        if self.check(&TokenKind::LParen) || self.check(&TokenKind::Lt) {
            let function = self.parse_function_rest(None, is_async, is_generator, false, false)?;
            return Ok(ObjectProperty::Method {
                key,
                kind,
                function: Rc::new(function),
            });
        }

        if kind != MethodKind::Method || is_async || is_generator {
            return Err(self.error("Expected '(' after method name".to_string()));
        }

        if self.check(&TokenKind::Colon) {
            self.advance();
            let value = self.parse_assignment_expression()?;
            return Ok(ObjectProperty::Property {
                key,
                value,
                shorthand: false,
            });
        }

        // Shorthand `{ a }`, or `{ a = 1 }` inside a destructuring assignment
        let PropertyName::Ident(ident) = &key else {
            return Err(self.error("Expected ':' after property name".to_string()));
        };
        let mut value = Node::new(Expr::Ident(ident.value.clone()), ident.span);
        if self.check(&TokenKind::Eq) {
            self.advance();
            let default = self.parse_assignment_expression()?;
            let span = value.span.merge(&default.span);
            value = Node::new(
                Expr::Assignment {
                    target: Box::new(value),
                    op: AssignmentOp::Assign,
                    value: Box::new(default),
                },
                span,
            );
        }

        Ok(ObjectProperty::Property {
            key,
            value,
            shorthand: true,
        })
    }
}

/// Whether `expr` may appear on the left of `op`. Array and object literals
/// are destructuring targets for plain `=` only.
fn is_assignment_target(expr: &Expr, op: AssignmentOp) -> bool {
    match expr {
        Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. } => true,
        Expr::Paren(inner) | Expr::TypeCast { expr: inner, .. } | Expr::NonNullAssertion(inner) => {
            is_assignment_target(&inner.value, op)
        }
        Expr::Array(_) | Expr::Object(_) => op == AssignmentOp::Assign,
        _ => false,
    }
}

//! Type annotation parsing

use super::*;

impl Parser {
    pub(crate) fn parse_type(&mut self) -> ParseResult<Node<Type>> {
        self.nested(|p| p.parse_type_inner())
    }

    fn parse_type_inner(&mut self) -> ParseResult<Node<Type>> {
        let start = self.current_token().span;

        // abstract new (...) => T
        if self.check_contextual("abstract") && self.peek_kind(1) == Some(&TokenKind::New) {
            self.advance();
        }
        if self.check(&TokenKind::New) {
            self.advance();
            return self.parse_function_type(start);
        }

        if self.check(&TokenKind::Lt) {
            return self.parse_function_type(start);
        }

        if self.check(&TokenKind::LParen) {
            if let Some(func) = self.try_parse(|p| p.parse_function_type(start)) {
                return Ok(func);
            }
        }

        let check_type = self.parse_union_type()?;

        if self.check(&TokenKind::Extends) && !self.current_token().newline_before {
            self.advance();
            let extends_type = self.parse_union_type()?;
            self.consume(TokenKind::Question)?;
            let true_type = self.parse_type()?;
            self.consume(TokenKind::Colon)?;
            let false_type = self.parse_type()?;
            let span = start.merge(&false_type.span);
            return Ok(Node::new(
                Type::Conditional {
                    check_type: Box::new(check_type),
                    extends_type: Box::new(extends_type),
                    true_type: Box::new(true_type),
                    false_type: Box::new(false_type),
                },
                span,
            ));
        }

        Ok(check_type)
    }

    /// `<T>(a: A, b?: B) => R`
    fn parse_function_type(&mut self, start: Span) -> ParseResult<Node<Type>> {
        let type_params = if self.check(&TokenKind::Lt) {
            Some(self.parse_type_params()?)
        } else {
            None
        };

        self.consume(TokenKind::LParen)?;
        let params = self.parse_function_type_params()?;
        self.consume(TokenKind::RParen)?;
        self.consume(TokenKind::FatArrow)?;
        let return_type = self.parse_type_or_predicate()?;

        let span = start.merge(&return_type.span);
        Ok(Node::new(
            Type::Function(FunctionType {
                type_params,
                params,
                return_type: Box::new(return_type),
            }),
            span,
        ))
    }

    /// A type, or a `x is T` / `asserts x` predicate (erased to boolean/void).
    fn parse_type_or_predicate(&mut self) -> ParseResult<Node<Type>> {
        let start = self.current_token().span;

        if self.check_contextual("asserts")
            && matches!(self.peek_kind(1), Some(TokenKind::Identifier) | Some(TokenKind::This))
        {
            self.advance();
            self.advance();
            if self.check_contextual("is") {
                self.advance();
                self.parse_type()?;
            }
            let span = start.merge(&self.previous_token().span);
            return Ok(Node::new(Type::Keyword(KeywordType::Void), span));
        }

        if matches!(self.current_token().kind, TokenKind::Identifier | TokenKind::This)
            && self
                .peek_token(1)
                .map_or(false, |t| t.kind == TokenKind::Identifier && t.value == "is")
        {
            self.advance();
            self.advance();
            self.parse_type()?;
            let span = start.merge(&self.previous_token().span);
            return Ok(Node::new(Type::Keyword(KeywordType::Boolean), span));
        }

        self.parse_type()
    }

    pub(crate) fn parse_function_type_params(&mut self) -> ParseResult<Vec<FunctionTypeParam>> {
        let mut params = Vec::new();

        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            let is_rest = if self.check(&TokenKind::DotDotDot) {
                self.advance();
                true
            } else {
                false
            };

            let name = match self.current_token().kind {
                TokenKind::Identifier | TokenKind::This
                    if matches!(
                        self.peek_kind(1),
                        Some(TokenKind::Colon)
                            | Some(TokenKind::Question)
                            | Some(TokenKind::Comma)
                            | Some(TokenKind::RParen)
                    ) =>
                {
                    let token = self.advance();
                    Some(Node::new(Ident::new(token.value.clone()), token.span))
                }
                TokenKind::LBrace | TokenKind::LBracket => {
                    self.parse_pattern()?;
                    None
                }
                _ => return Err(self.error("Expected parameter name".to_string())),
            };

            let optional = if self.check(&TokenKind::Question) {
                self.advance();
                true
            } else {
                false
            };

            let ty = if self.check(&TokenKind::Colon) {
                self.advance();
                Some(self.parse_type()?)
            } else {
                None
            };

            params.push(FunctionTypeParam {
                name,
                ty,
                optional,
                is_rest,
            });

            if !self.check(&TokenKind::RParen) {
                self.consume(TokenKind::Comma)?;
            }
        }

        Ok(params)
    }

    fn parse_union_type(&mut self) -> ParseResult<Node<Type>> {
        let start = self.current_token().span;
        if self.check(&TokenKind::Pipe) {
            self.advance();
        }

        let first = self.parse_intersection_type()?;
        if !self.check(&TokenKind::Pipe) {
            return Ok(first);
        }

        let mut types = vec![first];
        while self.check(&TokenKind::Pipe) {
            self.advance();
            types.push(self.parse_intersection_type()?);
        }

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(Type::Union(types), span))
    }

    fn parse_intersection_type(&mut self) -> ParseResult<Node<Type>> {
        let start = self.current_token().span;
        if self.check(&TokenKind::Amp) {
            self.advance();
        }

        let first = self.parse_type_operator()?;
        if !self.check(&TokenKind::Amp) {
            return Ok(first);
        }

        let mut types = vec![first];
        while self.check(&TokenKind::Amp) {
            self.advance();
            types.push(self.parse_type_operator()?);
        }

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(Type::Intersection(types), span))
    }

    fn parse_type_operator(&mut self) -> ParseResult<Node<Type>> {
        let start = self.current_token().span;
        let operand_follows = self.peek_token(1).map_or(false, |t| {
            !matches!(
                t.kind,
                TokenKind::Comma
                    | TokenKind::RParen
                    | TokenKind::RBracket
                    | TokenKind::Gt
                    | TokenKind::Semicolon
                    | TokenKind::Eq
                    | TokenKind::Pipe
                    | TokenKind::Amp
                    | TokenKind::Eof
            )
        });

        if self.check(&TokenKind::Identifier) && operand_follows {
            match self.current_token().value.as_str() {
                "keyof" => {
                    self.advance();
                    let inner = self.parse_type_operator()?;
                    let span = start.merge(&inner.span);
                    return Ok(Node::new(Type::Keyof(Box::new(inner)), span));
                }
                "unique" | "readonly" => {
                    self.advance();
                    return self.parse_type_operator();
                }
                "infer" => {
                    self.advance();
                    let name = self.parse_identifier()?;
                    let span = start.merge(&name.span);
                    return Ok(Node::new(Type::Infer(name), span));
                }
                _ => {}
            }
        }

        self.parse_postfix_type()
    }

    fn parse_postfix_type(&mut self) -> ParseResult<Node<Type>> {
        let start = self.current_token().span;
        let mut ty = self.parse_primary_type()?;

        while self.check(&TokenKind::LBracket) && !self.current_token().newline_before {
            self.advance();
            if self.check(&TokenKind::RBracket) {
                self.advance();
                let span = start.merge(&self.previous_token().span);
                ty = Node::new(Type::Array(Box::new(ty)), span);
            } else {
                let index = self.parse_type()?;
                self.consume(TokenKind::RBracket)?;
                let span = start.merge(&self.previous_token().span);
                ty = Node::new(
                    Type::IndexedAccess {
                        object_type: Box::new(ty),
                        index_type: Box::new(index),
                    },
                    span,
                );
            }
        }

        Ok(ty)
    }

    fn parse_primary_type(&mut self) -> ParseResult<Node<Type>> {
        let start = self.current_token().span;

        let ty = match self.current_token().kind {
            TokenKind::Identifier => {
                let word = self.current_token().value.clone();
                match KeywordType::from_name(&word) {
                    Some(kw) if self.peek_kind(1) != Some(&TokenKind::Dot) => {
                        self.advance();
                        Type::Keyword(kw)
                    }
                    _ => return self.parse_type_reference(),
                }
            }
            TokenKind::Void => {
                self.advance();
                Type::Keyword(KeywordType::Void)
            }
            TokenKind::Null => {
                self.advance();
                Type::Keyword(KeywordType::Null)
            }
            TokenKind::This | TokenKind::Const => {
                let token = self.advance();
                Type::Reference {
                    name: vec![Node::new(Ident::new(token.value.clone()), token.span)],
                    type_args: None,
                }
            }
            TokenKind::Typeof => {
                self.advance();
                if self.check(&TokenKind::Import) {
                    return Err(self.error("'typeof import()' types are not supported".to_string()));
                }
                let mut path = vec![self.parse_identifier_name()?];
                while self.check(&TokenKind::Dot) {
                    self.advance();
                    path.push(self.parse_identifier_name()?);
                }
                Type::Typeof(path)
            }
            TokenKind::StringLiteral => Type::Literal(LiteralType::String(self.advance().value.clone())),
            TokenKind::TemplateLiteral => {
                Type::Literal(LiteralType::String(self.advance().value.clone()))
            }
            TokenKind::NumberLiteral => {
                let num = self.advance().number_value().unwrap_or(f64::NAN);
                Type::Literal(LiteralType::Number(num))
            }
            TokenKind::Minus if self.peek_kind(1) == Some(&TokenKind::NumberLiteral) => {
                self.advance();
                let num = self.advance().number_value().unwrap_or(f64::NAN);
                Type::Literal(LiteralType::Number(-num))
            }
            TokenKind::True => {
                self.advance();
                Type::Literal(LiteralType::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Type::Literal(LiteralType::Boolean(false))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_type()?;
                self.consume(TokenKind::RParen)?;
                Type::Paren(Box::new(inner))
            }
            TokenKind::LBracket => Type::Tuple(self.parse_tuple_elements()?),
            TokenKind::LBrace => {
                if let Some(mapped) = self.try_parse(|p| p.parse_mapped_type()) {
                    mapped
                } else {
                    Type::Object(self.parse_object_type_members()?)
                }
            }
            _ => {
                return Err(self.error(format!(
                    "Expected type, found {:?}",
                    self.current_token().kind
                )))
            }
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(ty, span))
    }

    fn parse_type_reference(&mut self) -> ParseResult<Node<Type>> {
        let start = self.current_token().span;
        let mut name = vec![self.parse_identifier()?];
        while self.check(&TokenKind::Dot) {
            self.advance();
            name.push(self.parse_identifier_name()?);
        }

        let type_args = if self.check(&TokenKind::Lt) && !self.current_token().newline_before {
            Some(self.parse_type_arguments()?)
        } else {
            None
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(Type::Reference { name, type_args }, span))
    }

    fn parse_tuple_elements(&mut self) -> ParseResult<Vec<Node<Type>>> {
        self.consume(TokenKind::LBracket)?;
        let mut elements = Vec::new();

        while !self.check(&TokenKind::RBracket) && !self.is_at_end() {
            if self.check(&TokenKind::DotDotDot) {
                self.advance();
            }
            // Labeled element: `name: T` or `name?: T`
            let labeled = self.check(&TokenKind::Identifier)
                && (self.peek_kind(1) == Some(&TokenKind::Colon)
                    || (self.peek_kind(1) == Some(&TokenKind::Question)
                        && self.peek_kind(2) == Some(&TokenKind::Colon)));
            if labeled {
                self.advance();
                if self.check(&TokenKind::Question) {
                    self.advance();
                }
                self.consume(TokenKind::Colon)?;
            }

            elements.push(self.parse_type()?);
            if self.check(&TokenKind::Question) {
                self.advance();
            }

            if !self.check(&TokenKind::RBracket) {
                self.consume(TokenKind::Comma)?;
            }
        }

        self.consume(TokenKind::RBracket)?;
        Ok(elements)
    }

    /// `{ readonly [K in Keys]?: V }`
    fn parse_mapped_type(&mut self) -> ParseResult<Type> {
        self.consume(TokenKind::LBrace)?;
        if self.check(&TokenKind::Plus) || self.check(&TokenKind::Minus) {
            self.advance();
        }
        if self.check_contextual("readonly") {
            self.advance();
        }
        self.consume(TokenKind::LBracket)?;
        let param = self.parse_identifier()?;
        self.consume(TokenKind::In)?;
        let constraint = self.parse_type()?;
        if self.check_contextual("as") {
            self.advance();
            self.parse_type()?;
        }
        self.consume(TokenKind::RBracket)?;

        if self.check(&TokenKind::Plus) || self.check(&TokenKind::Minus) {
            self.advance();
        }
        if self.check(&TokenKind::Question) {
            self.advance();
        }

        let value_type = if self.check(&TokenKind::Colon) {
            self.advance();
            Some(Box::new(self.parse_type()?))
        } else {
            None
        };

        if self.check(&TokenKind::Semicolon) || self.check(&TokenKind::Comma) {
            self.advance();
        }
        self.consume(TokenKind::RBrace)?;

        Ok(Type::Mapped {
            param,
            constraint: Box::new(constraint),
            value_type,
        })
    }

    /// Members of an object type literal or interface body, braces included.
    pub(crate) fn parse_object_type_members(&mut self) -> ParseResult<Vec<ObjectTypeMember>> {
        self.consume(TokenKind::LBrace)?;
        let mut members = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            members.push(self.parse_object_type_member()?);
            if self.check(&TokenKind::Semicolon) || self.check(&TokenKind::Comma) {
                self.advance();
            }
        }

        self.consume(TokenKind::RBrace)?;
        Ok(members)
    }

    fn parse_object_type_member(&mut self) -> ParseResult<ObjectTypeMember> {
        let readonly = self.check_contextual("readonly")
            && !matches!(
                self.peek_kind(1),
                Some(TokenKind::LParen)
                    | Some(TokenKind::Colon)
                    | Some(TokenKind::Question)
                    | Some(TokenKind::Semicolon)
                    | Some(TokenKind::Comma)
                    | Some(TokenKind::RBrace)
            );
        if readonly {
            self.advance();
        }

        // Index signature
        if self.check(&TokenKind::LBracket)
            && self.peek_kind(1) == Some(&TokenKind::Identifier)
            && self.peek_kind(2) == Some(&TokenKind::Colon)
        {
            self.advance();
            let key_name = self.parse_identifier()?;
            self.consume(TokenKind::Colon)?;
            let key_type = self.parse_type()?;
            self.consume(TokenKind::RBracket)?;
            self.consume(TokenKind::Colon)?;
            let value_type = self.parse_type()?;
            return Ok(ObjectTypeMember::IndexSignature {
                key_name,
                key_type,
                value_type,
            });
        }

        // Call and construct signatures
        let is_construct = self.check(&TokenKind::New)
            && matches!(self.peek_kind(1), Some(TokenKind::LParen) | Some(TokenKind::Lt));
        if is_construct {
            self.advance();
        }
        if self.check(&TokenKind::LParen) || self.check(&TokenKind::Lt) {
            let (type_params, params, return_type) = self.parse_signature()?;
            return Ok(ObjectTypeMember::CallSignature {
                type_params,
                params,
                return_type,
            });
        }

        // Accessor signatures are recorded as methods
        self.parse_method_prefix();

        let name = self.parse_property_name()?;
        let optional = if self.check(&TokenKind::Question) {
            self.advance();
            true
        } else {
            false
        };

        if self.check(&TokenKind::LParen) || self.check(&TokenKind::Lt) {
            let (type_params, params, return_type) = self.parse_signature()?;
            return Ok(ObjectTypeMember::Method {
                name,
                type_params,
                params,
                return_type,
                optional,
            });
        }

        let ty = if self.check(&TokenKind::Colon) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };

        Ok(ObjectTypeMember::Property {
            name,
            ty,
            optional,
            readonly,
        })
    }

    #[allow(clippy::type_complexity)]
    fn parse_signature(
        &mut self,
    ) -> ParseResult<(Option<Vec<TypeParam>>, Vec<FunctionTypeParam>, Option<Node<Type>>)> {
        let type_params = if self.check(&TokenKind::Lt) {
            Some(self.parse_type_params()?)
        } else {
            None
        };
        self.consume(TokenKind::LParen)?;
        let params = self.parse_function_type_params()?;
        self.consume(TokenKind::RParen)?;
        let return_type = if self.check(&TokenKind::Colon) {
            self.advance();
            Some(self.parse_type_or_predicate()?)
        } else {
            None
        };
        Ok((type_params, params, return_type))
    }

    pub(crate) fn parse_type_params(&mut self) -> ParseResult<Vec<TypeParam>> {
        self.consume(TokenKind::Lt)?;
        let mut params = Vec::new();

        while !self.check(&TokenKind::Gt) && !self.is_at_end() {
            // Variance and const modifiers: <in T>, <out T>, <const T>
            while (self.check(&TokenKind::Const)
                || self.check(&TokenKind::In)
                || self.check_contextual("out"))
                && self.peek_kind(1) == Some(&TokenKind::Identifier)
            {
                self.advance();
            }

            let name = self.parse_identifier()?;

            let constraint = if self.check(&TokenKind::Extends) {
                self.advance();
                Some(Box::new(self.parse_type()?))
            } else {
                None
            };

            let default = if self.check(&TokenKind::Eq) {
                self.advance();
                Some(Box::new(self.parse_type()?))
            } else {
                None
            };

            params.push(TypeParam {
                name,
                constraint,
                default,
            });

            if !self.check(&TokenKind::Gt) {
                self.consume(TokenKind::Comma)?;
            }
        }

        self.consume_gt()?;
        if params.is_empty() {
            return Err(self.error("Type parameter list cannot be empty".to_string()));
        }
        Ok(params)
    }

    pub(crate) fn parse_type_arguments(&mut self) -> ParseResult<Vec<Node<Type>>> {
        self.consume(TokenKind::Lt)?;
        let mut args = Vec::new();

        loop {
            args.push(self.parse_type()?);
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        self.consume_gt()?;
        Ok(args)
    }
}

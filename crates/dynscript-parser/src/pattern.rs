//! Binding pattern parsing (destructuring)

use super::*;

impl Parser {
    /// Identifier, array pattern or object pattern. Defaults on the pattern
    /// itself are left to the caller (declarator or parameter).
    pub(crate) fn parse_pattern(&mut self) -> ParseResult<Node<Pattern>> {
        let start = self.current_token().span;

        let pattern = match self.current_token().kind {
            TokenKind::Identifier => Pattern::Ident(self.parse_identifier()?),
            TokenKind::LBracket => self.parse_array_pattern()?,
            TokenKind::LBrace => self.parse_object_pattern()?,
            _ => {
                return Err(self.error(format!(
                    "Expected binding pattern, found {:?}",
                    self.current_token().kind
                )))
            }
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(pattern, span))
    }

    /// A nested pattern with an optional `= default`.
    fn parse_binding_element(&mut self) -> ParseResult<Node<Pattern>> {
        let pattern = self.parse_pattern()?;
        if !self.check(&TokenKind::Eq) {
            return Ok(pattern);
        }
        self.advance();
        let default = self.with_in_allowed(|p| p.parse_assignment_expression())?;
        let span = pattern.span.merge(&default.span);
        Ok(Node::new(
            Pattern::Assignment {
                pattern: Box::new(pattern),
                default: Box::new(default),
            },
            span,
        ))
    }

    fn parse_array_pattern(&mut self) -> ParseResult<Pattern> {
        self.consume(TokenKind::LBracket)?;
        let mut elements = Vec::new();
        let mut rest = None;

        while !self.check(&TokenKind::RBracket) && !self.is_at_end() {
            if self.check(&TokenKind::Comma) {
                self.advance();
                elements.push(None);
                continue;
            }

            if self.check(&TokenKind::DotDotDot) {
                self.advance();
                rest = Some(Box::new(self.parse_pattern()?));
                if self.check(&TokenKind::Comma) {
                    return Err(self.error("Rest element must be last".to_string()));
                }
                break;
            }

            elements.push(Some(self.parse_binding_element()?));
            if !self.check(&TokenKind::RBracket) {
                self.consume(TokenKind::Comma)?;
            }
        }

        self.consume(TokenKind::RBracket)?;
        Ok(Pattern::Array { elements, rest })
    }

    fn parse_object_pattern(&mut self) -> ParseResult<Pattern> {
        self.consume(TokenKind::LBrace)?;
        let mut properties = Vec::new();
        let mut rest = None;

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.check(&TokenKind::DotDotDot) {
                self.advance();
                rest = Some(Box::new(self.parse_pattern()?));
                if self.check(&TokenKind::Comma) {
                    return Err(self.error("Rest element must be last".to_string()));
                }
                break;
            }

            let key = self.parse_property_name()?;

            let property = if self.check(&TokenKind::Colon) {
                self.advance();
                ObjectPatternProperty {
                    key,
                    value: self.parse_binding_element()?,
                    shorthand: false,
                }
            } else {
                let PropertyName::Ident(ident) = &key else {
                    return Err(self.error("Expected ':' in object pattern".to_string()));
                };
                let mut value = Node::new(Pattern::Ident(ident.clone()), ident.span);
                if self.check(&TokenKind::Eq) {
                    self.advance();
                    let default = self.with_in_allowed(|p| p.parse_assignment_expression())?;
                    let span = value.span.merge(&default.span);
                    value = Node::new(
                        Pattern::Assignment {
                            pattern: Box::new(value),
                            default: Box::new(default),
                        },
                        span,
                    );
                }
                ObjectPatternProperty {
                    key,
                    value,
                    shorthand: true,
                }
            };
            properties.push(property);

            if !self.check(&TokenKind::RBrace) {
                self.consume(TokenKind::Comma)?;
            }
        }

        self.consume(TokenKind::RBrace)?;
        Ok(Pattern::Object { properties, rest })
    }
}

//! Statement parsing

use super::*;

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> ParseResult<Node<Stmt>> {
        self.nested(|p| p.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> ParseResult<Node<Stmt>> {
        let start = self.current_token().span;

        let stmt = match self.current_token().kind {
            TokenKind::LBrace => Stmt::Block(self.parse_block_statement()?.value),
            TokenKind::Semicolon => {
                self.advance();
                Stmt::Empty
            }
            TokenKind::Let | TokenKind::Var => {
                let decl = self.parse_var_decl(false)?;
                self.consume_semicolon()?;
                Stmt::Decl(Decl::Var(decl))
            }
            TokenKind::Const if self.peek_kind(1) != Some(&TokenKind::Enum) => {
                let decl = self.parse_var_decl(false)?;
                self.consume_semicolon()?;
                Stmt::Decl(Decl::Var(decl))
            }
            TokenKind::If => self.parse_if_statement()?,
            TokenKind::For => self.parse_for_statement()?,
            TokenKind::While => self.parse_while_statement()?,
            TokenKind::Do => self.parse_do_while_statement()?,
            TokenKind::Return => self.parse_return_statement()?,
            TokenKind::Break | TokenKind::Continue => self.parse_jump_statement()?,
            TokenKind::Throw => self.parse_throw_statement()?,
            TokenKind::Try => self.parse_try_statement()?,
            TokenKind::Switch => self.parse_switch_statement()?,
            TokenKind::Debugger => {
                self.advance();
                self.consume_semicolon()?;
                Stmt::Debugger
            }
            TokenKind::With => {
                return Err(self.error("'with' statements are not supported".to_string()));
            }
            // `import(...)` and `import.meta` are expressions
            TokenKind::Import
                if !matches!(self.peek_kind(1), Some(TokenKind::LParen) | Some(TokenKind::Dot)) =>
            {
                Stmt::Import(self.parse_import_decl()?)
            }
            TokenKind::Export => {
                return Err(self.error("Export declarations may only appear at top level".to_string()));
            }
            _ if self.at_declaration_start() => Stmt::Decl(self.parse_declaration()?.value),
            TokenKind::Identifier if self.peek_kind(1) == Some(&TokenKind::Colon) => {
                let label = self.parse_identifier()?;
                self.consume(TokenKind::Colon)?;
                let body = self.parse_statement()?;
                Stmt::Labeled {
                    label,
                    stmt: Box::new(body),
                }
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                Stmt::Expr(expr)
            }
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(stmt, span))
    }

    pub(crate) fn parse_block_statement(&mut self) -> ParseResult<Node<BlockStmt>> {
        let start = self.current_token().span;
        self.consume(TokenKind::LBrace)?;

        let stmts = self.with_in_allowed(|p| {
            let mut stmts = Vec::new();
            while !p.check(&TokenKind::RBrace) && !p.is_at_end() {
                stmts.push(p.parse_statement()?);
            }
            Ok(stmts)
        })?;

        self.consume(TokenKind::RBrace)?;
        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(BlockStmt { stmts }, span))
    }

    fn parse_if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::If)?;
        let condition = self.parse_parenthesized_expression()?;

        let then_stmt = Box::new(self.parse_statement()?);
        let else_stmt = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_stmt,
            else_stmt,
        })
    }

    fn parse_parenthesized_expression(&mut self) -> ParseResult<Node<Expr>> {
        self.consume(TokenKind::LParen)?;
        let expr = self.with_in_allowed(|p| p.parse_expression())?;
        self.consume(TokenKind::RParen)?;
        Ok(expr)
    }

    /// `for (init; cond; update)`, `for (x in obj)`, `for (x of iter)` and
    /// `for await (x of iter)`.
    fn parse_for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::For)?;

        let is_await = if self.check(&TokenKind::Await) {
            self.advance();
            true
        } else {
            false
        };

        self.consume(TokenKind::LParen)?;

        // The head is parsed with `in` disabled so `for (x in o)` is not a binary expression
        let saved_no_in = std::mem::replace(&mut self.no_in, true);
        let head = self.parse_for_head();
        self.no_in = saved_no_in;

        let init = match head? {
            ForHead::Each { left, of } => {
                let right = if of {
                    self.with_in_allowed(|p| p.parse_assignment_expression())?
                } else {
                    self.with_in_allowed(|p| p.parse_expression())?
                };
                self.consume(TokenKind::RParen)?;
                let body = Box::new(self.parse_statement()?);
                return Ok(if of {
                    Stmt::ForOf {
                        left,
                        right,
                        body,
                        is_await,
                    }
                } else {
                    Stmt::ForIn { left, right, body }
                });
            }
            ForHead::Init(init) => init,
        };

        if is_await {
            return Err(self.error("'for await' requires an 'of' clause".to_string()));
        }

        self.consume(TokenKind::Semicolon)?;

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.with_in_allowed(|p| p.parse_expression())?)
        };
        self.consume(TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.with_in_allowed(|p| p.parse_expression())?)
        };
        self.consume(TokenKind::RParen)?;

        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::For {
            init,
            condition,
            update,
            body,
        })
    }

    fn parse_for_head(&mut self) -> ParseResult<ForHead> {
        if self.check(&TokenKind::Semicolon) {
            return Ok(ForHead::Init(None));
        }

        if matches!(
            self.current_token().kind,
            TokenKind::Let | TokenKind::Const | TokenKind::Var
        ) {
            let decl = self.parse_var_decl(false)?;
            let single = decl.declarations.len() == 1;
            if single && self.check(&TokenKind::In) {
                self.advance();
                return Ok(ForHead::Each {
                    left: ForInLeft::VarDecl(decl),
                    of: false,
                });
            }
            if single && self.check_contextual("of") {
                self.advance();
                return Ok(ForHead::Each {
                    left: ForInLeft::VarDecl(decl),
                    of: true,
                });
            }
            return Ok(ForHead::Init(Some(ForInit::VarDecl(decl))));
        }

        let expr = self.parse_expression()?;
        if self.check(&TokenKind::In) {
            self.advance();
            return Ok(ForHead::Each {
                left: ForInLeft::Expr(expr),
                of: false,
            });
        }
        if self.check_contextual("of") {
            self.advance();
            return Ok(ForHead::Each {
                left: ForInLeft::Expr(expr),
                of: true,
            });
        }
        Ok(ForHead::Init(Some(ForInit::Expr(expr))))
    }

    fn parse_while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::While)?;
        let condition = self.parse_parenthesized_expression()?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::While { condition, body })
    }

    fn parse_do_while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::Do)?;
        let body = Box::new(self.parse_statement()?);
        self.consume(TokenKind::While)?;
        let condition = self.parse_parenthesized_expression()?;
        // The semicolon after do-while is always optional
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }
        Ok(Stmt::DoWhile { body, condition })
    }

    fn parse_return_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::Return)?;

        // A line break after `return` ends the statement
        let value = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RBrace)
            || self.is_at_end()
            || self.current_token().newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.consume_semicolon()?;
        Ok(Stmt::Return(value))
    }

    fn parse_jump_statement(&mut self) -> ParseResult<Stmt> {
        let is_break = self.check(&TokenKind::Break);
        self.advance();

        let label = if self.check(&TokenKind::Identifier) && !self.current_token().newline_before {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        self.consume_semicolon()?;

        Ok(if is_break {
            Stmt::Break(label)
        } else {
            Stmt::Continue(label)
        })
    }

    fn parse_throw_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::Throw)?;
        if self.current_token().newline_before {
            return Err(self.error("Illegal newline after throw".to_string()));
        }
        let value = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Stmt::Throw(value))
    }

    fn parse_try_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::Try)?;
        let block = self.parse_block_statement()?;

        let catch = if self.check(&TokenKind::Catch) {
            self.advance();
            let param = if self.check(&TokenKind::LParen) {
                self.advance();
                let param = self.parse_pattern()?;
                // `catch (e: unknown)`
                if self.check(&TokenKind::Colon) {
                    self.advance();
                    self.parse_type()?;
                }
                self.consume(TokenKind::RParen)?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block_statement()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finally = if self.check(&TokenKind::Finally) {
            self.advance();
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        if catch.is_none() && finally.is_none() {
            return Err(self.error("Missing catch or finally after try".to_string()));
        }

        Ok(Stmt::Try {
            block,
            catch,
            finally,
        })
    }

    fn parse_switch_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::Switch)?;
        let discriminant = self.parse_parenthesized_expression()?;
        self.consume(TokenKind::LBrace)?;

        let mut cases = Vec::new();
        let mut seen_default = false;

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let test = if self.check(&TokenKind::Case) {
                self.advance();
                Some(self.with_in_allowed(|p| p.parse_expression())?)
            } else if self.check(&TokenKind::Default) {
                if seen_default {
                    return Err(self.error("More than one default clause in switch".to_string()));
                }
                seen_default = true;
                self.advance();
                None
            } else {
                return Err(self.error("Expected 'case' or 'default'".to_string()));
            };
            self.consume(TokenKind::Colon)?;

            let mut consequent = Vec::new();
            while !matches!(
                self.current_token().kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                consequent.push(self.parse_statement()?);
            }

            cases.push(SwitchCase { test, consequent });
        }

        self.consume(TokenKind::RBrace)?;
        Ok(Stmt::Switch {
            discriminant,
            cases,
        })
    }
}

/// What the parenthesized head of a `for` turned out to be.
enum ForHead {
    Init(Option<ForInit>),
    Each { left: ForInLeft, of: bool },
}

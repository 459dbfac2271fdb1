//! Declaration parsing

use super::*;
use std::rc::Rc;

/// Modifiers collected in front of a class member.
#[derive(Default)]
struct MemberModifiers {
    access: Option<AccessModifier>,
    is_static: bool,
    is_readonly: bool,
    is_abstract: bool,
    is_override: bool,
    is_declare: bool,
}

impl Parser {
    /// True when the current token begins a function, class, interface,
    /// type alias, enum, namespace or `declare` declaration.
    pub(crate) fn at_declaration_start(&self) -> bool {
        match self.current_token().kind {
            TokenKind::Function | TokenKind::Class | TokenKind::Enum => true,
            TokenKind::Const => self.peek_kind(1) == Some(&TokenKind::Enum),
            TokenKind::Identifier => {
                let next_same_line = self.peek_same_line(1);
                match self.current_token().value.as_str() {
                    "async" => self.peek_kind(1) == Some(&TokenKind::Function) && next_same_line,
                    "abstract" => self.peek_kind(1) == Some(&TokenKind::Class) && next_same_line,
                    "interface" => {
                        self.peek_kind(1) == Some(&TokenKind::Identifier) && next_same_line
                    }
                    "type" => {
                        self.peek_kind(1) == Some(&TokenKind::Identifier)
                            && next_same_line
                            && matches!(self.peek_kind(2), Some(TokenKind::Eq) | Some(TokenKind::Lt))
                    }
                    "namespace" | "module" => {
                        matches!(
                            self.peek_kind(1),
                            Some(TokenKind::Identifier) | Some(TokenKind::StringLiteral)
                        ) && next_same_line
                    }
                    "declare" => {
                        next_same_line
                            && self.peek_token(1).map_or(false, |t| {
                                t.kind == TokenKind::Identifier || t.kind.is_keyword()
                            })
                    }
                    "global" => self.peek_kind(1) == Some(&TokenKind::LBrace),
                    _ => false,
                }
            }
            _ => false,
        }
    }

    pub(crate) fn parse_declaration(&mut self) -> ParseResult<Node<Decl>> {
        let start = self.current_token().span;

        let decl = if self.check_contextual("declare") {
            self.advance();
            self.parse_ambient_declaration()?
        } else {
            self.parse_declaration_body(false)?
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(decl, span))
    }

    fn parse_ambient_declaration(&mut self) -> ParseResult<Decl> {
        match self.current_token().kind {
            TokenKind::Let | TokenKind::Const | TokenKind::Var
                if self.peek_kind(1) != Some(&TokenKind::Enum) =>
            {
                let decl = self.parse_var_decl(true)?;
                self.consume_semicolon()?;
                Ok(Decl::Var(decl))
            }
            _ if self.check_contextual("global") => {
                let name = self.parse_identifier()?;
                let body = self.parse_module_block()?;
                Ok(Decl::Module(ModuleDecl {
                    name: ModuleName::Ident(name),
                    body,
                    is_declare: true,
                }))
            }
            _ => self.parse_declaration_body(true),
        }
    }

    fn parse_declaration_body(&mut self, is_declare: bool) -> ParseResult<Decl> {
        match self.current_token().kind {
            TokenKind::Function => {
                let func = self.parse_function(false, is_declare, true)?;
                Ok(Decl::Function(Rc::new(func)))
            }
            TokenKind::Class => {
                let class = self.parse_class(false, is_declare)?;
                Ok(Decl::Class(Rc::new(class)))
            }
            TokenKind::Enum => self.parse_enum(false, is_declare),
            TokenKind::Const if self.peek_kind(1) == Some(&TokenKind::Enum) => {
                self.advance();
                self.parse_enum(true, is_declare)
            }
            TokenKind::Identifier => match self.current_token().value.as_str() {
                "async" => {
                    self.advance();
                    let func = self.parse_function(true, is_declare, true)?;
                    Ok(Decl::Function(Rc::new(func)))
                }
                "abstract" => {
                    self.advance();
                    let class = self.parse_class(true, is_declare)?;
                    Ok(Decl::Class(Rc::new(class)))
                }
                "interface" => self.parse_interface(),
                "type" => self.parse_type_alias(),
                "namespace" | "module" => {
                    self.advance();
                    Ok(Decl::Module(self.parse_module_decl(is_declare)?))
                }
                "global" => {
                    let name = self.parse_identifier()?;
                    let body = self.parse_module_block()?;
                    Ok(Decl::Module(ModuleDecl {
                        name: ModuleName::Ident(name),
                        body,
                        is_declare: true,
                    }))
                }
                other => Err(self.error(format!("Expected declaration, found '{}'", other))),
            },
            _ => Err(self.error(format!(
                "Expected declaration, found {:?}",
                self.current_token().kind
            ))),
        }
    }

    /// Parses `let`/`const`/`var` declarators (without the terminator).
    pub(crate) fn parse_var_decl(&mut self, is_declare: bool) -> ParseResult<VarDecl> {
        let kind = match self.current_token().kind {
            TokenKind::Let => VarDeclKind::Let,
            TokenKind::Const => VarDeclKind::Const,
            TokenKind::Var => VarDeclKind::Var,
            _ => return Err(self.error("Expected 'let', 'const' or 'var'".to_string())),
        };
        self.advance();

        let mut declarations = Vec::new();
        loop {
            let pattern = self.parse_pattern()?;

            // definite assignment: `let x!: number;`
            if self.check(&TokenKind::Bang) {
                self.advance();
            }

            let type_annotation = if self.check(&TokenKind::Colon) {
                self.advance();
                Some(Box::new(self.parse_type()?))
            } else {
                None
            };

            let init = if self.check(&TokenKind::Eq) {
                self.advance();
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };

            declarations.push(VarDeclarator {
                pattern,
                type_annotation,
                init,
            });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(VarDecl {
            kind,
            declarations,
            is_declare,
        })
    }

    /// Parses `function [*] [name] <T>(params): R { body }` after any `async`.
    ///
    /// Declarations without a body (overload signatures, ambient functions)
    /// end with a semicolon.
    pub(crate) fn parse_function(
        &mut self,
        is_async: bool,
        is_declare: bool,
        allow_bodyless: bool,
    ) -> ParseResult<Function> {
        self.consume(TokenKind::Function)?;

        let is_generator = if self.check(&TokenKind::Star) {
            self.advance();
            true
        } else {
            false
        };

        let name = if self.check(&TokenKind::Identifier) {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        self.parse_function_rest(name, is_async, is_generator, is_declare, allow_bodyless)
    }

    /// Everything after a function's name: type params, params, return type, body.
    pub(crate) fn parse_function_rest(
        &mut self,
        name: Option<Node<Ident>>,
        is_async: bool,
        is_generator: bool,
        is_declare: bool,
        allow_bodyless: bool,
    ) -> ParseResult<Function> {
        let type_params = if self.check(&TokenKind::Lt) {
            Some(self.parse_type_params()?)
        } else {
            None
        };

        self.consume(TokenKind::LParen)?;
        let params = self.with_in_allowed(|p| p.parse_function_params())?;
        self.consume(TokenKind::RParen)?;

        let return_type = self.parse_return_type()?;

        let body = if self.check(&TokenKind::LBrace) && !is_declare {
            Some(self.parse_block_statement()?)
        } else if allow_bodyless {
            self.consume_semicolon()?;
            None
        } else {
            return Err(self.error("Expected function body".to_string()));
        };

        Ok(Function {
            name,
            type_params,
            params,
            return_type,
            body,
            is_async,
            is_generator,
            is_declare,
        })
    }

    /// Parses `class [Name] <T> extends Base<U> implements I { members }`.
    pub(crate) fn parse_class(&mut self, is_abstract: bool, is_declare: bool) -> ParseResult<ClassDecl> {
        self.consume(TokenKind::Class)?;

        let name = if self.check(&TokenKind::Identifier) && !self.check_contextual("implements") {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        let type_params = if self.check(&TokenKind::Lt) {
            Some(self.parse_type_params()?)
        } else {
            None
        };

        let extends = if self.check(&TokenKind::Extends) {
            self.advance();
            let base = self.parse_left_hand_side(true)?;
            let type_args = if self.check(&TokenKind::Lt) {
                Some(self.parse_type_arguments()?)
            } else {
                None
            };
            Some(ClassExtends {
                base: Box::new(base),
                type_args,
            })
        } else {
            None
        };

        let mut implements = Vec::new();
        if self.check_contextual("implements") {
            self.advance();
            loop {
                implements.push(self.parse_type()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        self.consume(TokenKind::LBrace)?;
        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.check(&TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            let start = self.current_token().span;
            let member = self.with_in_allowed(|p| p.parse_class_member(is_declare))?;
            let span = start.merge(&self.previous_token().span);
            members.push(Node::new(member, span));
        }
        self.consume(TokenKind::RBrace)?;

        Ok(ClassDecl {
            name,
            type_params,
            extends,
            implements,
            members,
            is_abstract,
            is_declare,
        })
    }

    /// True when the current identifier is a member modifier rather than
    /// the member's own name (`static() {}` is a method named "static").
    fn at_member_modifier(&self) -> bool {
        if !self.check(&TokenKind::Identifier) {
            return false;
        }
        let is_modifier = matches!(
            self.current_token().value.as_str(),
            "public" | "private" | "protected" | "static" | "readonly" | "abstract"
                | "override" | "declare" | "accessor"
        );
        is_modifier
            && self.peek_same_line(1)
            && !matches!(
                self.peek_kind(1),
                Some(TokenKind::LParen)
                    | Some(TokenKind::Eq)
                    | Some(TokenKind::Semicolon)
                    | Some(TokenKind::Colon)
                    | Some(TokenKind::Question)
                    | Some(TokenKind::Bang)
                    | Some(TokenKind::Lt)
                    | Some(TokenKind::RBrace)
                    | Some(TokenKind::Eof)
            )
    }

    fn parse_class_member(&mut self, in_declare: bool) -> ParseResult<ClassMember> {
        let mut mods = MemberModifiers {
            is_declare: in_declare,
            ..MemberModifiers::default()
        };

        while self.at_member_modifier() {
            match self.advance().value.as_str() {
                "public" => mods.access = Some(AccessModifier::Public),
                "private" => mods.access = Some(AccessModifier::Private),
                "protected" => mods.access = Some(AccessModifier::Protected),
                "static" => mods.is_static = true,
                "readonly" => mods.is_readonly = true,
                "abstract" => mods.is_abstract = true,
                "override" => mods.is_override = true,
                "declare" => mods.is_declare = true,
                _ => {}
            }
        }

        if mods.is_static && self.check(&TokenKind::LBrace) {
            return Err(self.error("Static initialization blocks are not supported".to_string()));
        }

        // Index signature: [key: string]: T
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
            self.consume_semicolon()?;
            return Ok(ClassMember::IndexSignature {
                key_name,
                key_type,
                value_type,
                is_readonly: mods.is_readonly,
            });
        }

        // Constructor
        if self.check_contextual("constructor") && self.peek_kind(1) == Some(&TokenKind::LParen) {
            self.advance();
            let func = self.parse_function_rest(None, false, false, mods.is_declare, true)?;
            return Ok(ClassMember::Constructor(Rc::new(func)));
        }

        let (kind, is_async, is_generator) = self.parse_method_prefix();
        let name = self.parse_property_name()?;

        let is_optional = if self.check(&TokenKind::Question) {
            self.advance();
            true
        } else {
            false
        };
        if self.check(&TokenKind::Bang) {
            self.advance();
        }

        if self.check(&TokenKind::LParen) || self.check(&TokenKind::Lt) {
            // Abstract members and overload signatures have no body
            let func = self.parse_function_rest(None, is_async, is_generator, mods.is_declare, true)?;
            return Ok(ClassMember::Method {
                name,
                kind,
                function: Rc::new(func),
                access: mods.access,
                is_static: mods.is_static,
                is_abstract: mods.is_abstract,
                is_optional,
                is_override: mods.is_override,
            });
        }

        if kind != MethodKind::Method || is_async || is_generator {
            return Err(self.error("Expected '(' after accessor or method name".to_string()));
        }

        let type_annotation = if self.check(&TokenKind::Colon) {
            self.advance();
            Some(Box::new(self.parse_type()?))
        } else {
            None
        };

        let init = if self.check(&TokenKind::Eq) {
            self.advance();
            Some(self.parse_assignment_expression()?)
        } else {
            None
        };
        self.consume_semicolon()?;

        Ok(ClassMember::Property {
            name,
            type_annotation,
            init,
            access: mods.access,
            is_static: mods.is_static,
            is_readonly: mods.is_readonly,
            is_abstract: mods.is_abstract,
            is_optional,
            is_declare: mods.is_declare,
        })
    }

    /// Consumes `get`/`set`/`async`/`*` in front of a method name.
    ///
    /// Each word is only a prefix when a property name follows it on the
    /// same line; otherwise it is the member's name.
    pub(crate) fn parse_method_prefix(&mut self) -> (MethodKind, bool, bool) {
        let mut kind = MethodKind::Method;
        let mut is_async = false;
        let mut is_generator = false;

        let next_is_name = |p: &Parser| {
            p.peek_same_line(1)
                && p.peek_token(1).map_or(false, |t| {
                    matches!(
                        t.kind,
                        TokenKind::Identifier
                            | TokenKind::StringLiteral
                            | TokenKind::NumberLiteral
                            | TokenKind::LBracket
                            | TokenKind::Star
                    ) || t.kind.is_keyword()
                })
        };

        if self.check_contextual("get") && next_is_name(self) {
            self.advance();
            kind = MethodKind::Getter;
        } else if self.check_contextual("set") && next_is_name(self) {
            self.advance();
            kind = MethodKind::Setter;
        } else if self.check_contextual("async") && next_is_name(self) {
            self.advance();
            is_async = true;
        }

        if kind == MethodKind::Method && self.check(&TokenKind::Star) {
            self.advance();
            is_generator = true;
        }

        (kind, is_async, is_generator)
    }

    fn parse_interface(&mut self) -> ParseResult<Decl> {
        self.consume_contextual("interface")?;
        let name = self.parse_identifier()?;

        let type_params = if self.check(&TokenKind::Lt) {
            Some(self.parse_type_params()?)
        } else {
            None
        };

        let mut extends = Vec::new();
        if self.check(&TokenKind::Extends) {
            self.advance();
            loop {
                extends.push(self.parse_type()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        let members = self.parse_object_type_members()?;

        Ok(Decl::Interface(InterfaceDecl {
            name,
            type_params,
            extends,
            members,
        }))
    }

    fn parse_type_alias(&mut self) -> ParseResult<Decl> {
        self.consume_contextual("type")?;
        let name = self.parse_identifier()?;

        let type_params = if self.check(&TokenKind::Lt) {
            Some(self.parse_type_params()?)
        } else {
            None
        };

        self.consume(TokenKind::Eq)?;
        let ty = self.parse_type()?;
        self.consume_semicolon()?;

        Ok(Decl::TypeAlias(TypeAliasDecl {
            name,
            type_params,
            ty,
        }))
    }

    fn parse_enum(&mut self, is_const: bool, is_declare: bool) -> ParseResult<Decl> {
        self.consume(TokenKind::Enum)?;
        let name = self.parse_identifier()?;
        self.consume(TokenKind::LBrace)?;

        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let member_name = match self.current_token().kind {
                TokenKind::StringLiteral => PropertyName::String(self.advance().value.clone()),
                _ if self.is_identifier_name() => PropertyName::Ident(self.parse_identifier_name()?),
                _ => return Err(self.error("Expected enum member name".to_string())),
            };

            let init = if self.check(&TokenKind::Eq) {
                self.advance();
                Some(self.with_in_allowed(|p| p.parse_assignment_expression())?)
            } else {
                None
            };

            members.push(EnumMember {
                name: member_name,
                init,
            });

            if !self.check(&TokenKind::RBrace) {
                self.consume(TokenKind::Comma)?;
            }
        }
        self.consume(TokenKind::RBrace)?;

        Ok(Decl::Enum(EnumDecl {
            name,
            members,
            is_const,
            is_declare,
        }))
    }

    /// Parses a namespace after `namespace`/`module`: `A.B.C { ... }` or
    /// `"name" { ... }` / `"name";`.
    fn parse_module_decl(&mut self, is_declare: bool) -> ParseResult<ModuleDecl> {
        if self.check(&TokenKind::StringLiteral) {
            let name = self.advance().value.clone();
            let body = if self.check(&TokenKind::LBrace) {
                self.parse_module_block()?
            } else {
                self.consume_semicolon()?;
                ModuleBody::None
            };
            return Ok(ModuleDecl {
                name: ModuleName::String(name),
                body,
                is_declare,
            });
        }

        let name = self.parse_identifier()?;

        // Dotted names nest: namespace A.B {} == namespace A { namespace B {} }
        let body = if self.check(&TokenKind::Dot) {
            self.advance();
            let start = self.current_token().span;
            let inner = self.parse_module_decl(is_declare)?;
            let span = start.merge(&self.previous_token().span);
            ModuleBody::Namespace(Box::new(Node::new(inner, span)))
        } else {
            self.parse_module_block()?
        };

        Ok(ModuleDecl {
            name: ModuleName::Ident(name),
            body,
            is_declare,
        })
    }

    fn parse_module_block(&mut self) -> ParseResult<ModuleBody> {
        self.consume(TokenKind::LBrace)?;
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            items.push(self.parse_module_item()?);
        }
        self.consume(TokenKind::RBrace)?;
        Ok(ModuleBody::Block(items))
    }
}

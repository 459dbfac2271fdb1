//! JavaScript emission with TypeScript erasure.
//!
//! The [`Emitter`] walks the AST once and prints JavaScript text. Type-only
//! syntax is dropped on the way and ES2015 constructs are lowered when the
//! target is ES5 or below. Module syntax is handled in `module.rs`, enums
//! in `enums.rs`.

use std::collections::{HashMap, HashSet};

use dynscript_ast::*;
use dynscript_parser::ensure_sufficient_stack;

use crate::analysis::uses_this;
use crate::options::CompilerOptions;

const INDENT: &str = "    ";

// Binding power of emitted expressions. A sub-expression printed with a
// lower power than its context requires gets parenthesized.
pub(crate) const PREC_SEQUENCE: u8 = 0;
pub(crate) const PREC_ASSIGN: u8 = 2;
const PREC_TERNARY: u8 = 3;
const PREC_ADDITIVE: u8 = 13;
const PREC_EXPONENT: u8 = 15;
const PREC_UNARY: u8 = 16;
const PREC_POSTFIX: u8 = 17;
const PREC_MEMBER: u8 = 18;
const PREC_PRIMARY: u8 = 20;

pub(crate) struct Emitter<'a> {
    pub(crate) options: &'a CompilerOptions,
    out: String,
    indent: usize,
    /// Counters for generated `<base>_<n>` temporaries
    temps: HashMap<String, usize>,
    /// Names read in value position; imports outside this set are elided
    pub(crate) value_refs: HashSet<String>,
    /// Top-level names that only exist as types
    pub(crate) type_names: HashSet<String>,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(options: &'a CompilerOptions) -> Self {
        Self {
            options,
            out: String::new(),
            indent: 0,
            temps: HashMap::new(),
            value_refs: HashSet::new(),
            type_names: HashSet::new(),
        }
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }

    fn lowers_es2015(&self) -> bool {
        self.options.target.is_es5_or_lower()
    }

    // =========================================================================
    // Output buffer
    // =========================================================================

    /// Writes one line at the current indentation. `text` may span several
    /// lines when it embeds an already indented block.
    pub(crate) fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    pub(crate) fn indented(&mut self, f: impl FnOnce(&mut Self)) {
        self.indent += 1;
        f(self);
        self.indent -= 1;
    }

    /// Runs `f` against an empty buffer and returns what it wrote.
    pub(crate) fn capture(&mut self, f: impl FnOnce(&mut Self)) -> String {
        let saved = std::mem::take(&mut self.out);
        f(self);
        std::mem::replace(&mut self.out, saved)
    }

    /// A `{ ... }` block whose lines are produced by `f` one level deeper.
    /// The closing brace lines up with the current indentation.
    pub(crate) fn braced(&mut self, f: impl FnOnce(&mut Self)) -> String {
        let body = self.capture(|e| e.indented(f));
        if body.is_empty() {
            return "{ }".to_string();
        }
        format!("{{\n{}{}}}", body, INDENT.repeat(self.indent))
    }

    /// The text of one statement without its leading indentation or
    /// trailing newline, for splicing after a prefix.
    fn stmt_text(&mut self, stmt: &Node<Stmt>) -> String {
        let text = self.capture(|e| e.emit_stmt(stmt));
        text.trim_start().trim_end_matches('\n').to_string()
    }

    /// Reserves a fresh temporary name `<base>_<n>`.
    pub(crate) fn fresh_temp(&mut self, base: &str) -> String {
        let count = self.temps.entry(base.to_string()).or_insert(0);
        *count += 1;
        format!("{}_{}", base, count)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub(crate) fn emit_stmts(&mut self, stmts: &[Node<Stmt>]) {
        for stmt in stmts {
            self.emit_stmt(stmt);
        }
    }

    pub(crate) fn emit_stmt(&mut self, stmt: &Node<Stmt>) {
        ensure_sufficient_stack(|| self.emit_stmt_inner(stmt))
    }

    fn emit_stmt_inner(&mut self, stmt: &Node<Stmt>) {
        match &stmt.value {
            Stmt::Expr(expr) => {
                let text = self.expr(expr, PREC_SEQUENCE);
                if needs_statement_parens(&text) {
                    self.line(format!("({});", text));
                } else {
                    self.line(format!("{};", text));
                }
            }
            Stmt::Decl(decl) => self.emit_decl(decl),
            Stmt::Return(value) => match value {
                Some(value) => {
                    let text = self.expr(value, PREC_SEQUENCE);
                    self.line(format!("return {};", text));
                }
                None => self.line("return;"),
            },
            Stmt::If { .. } => {
                let text = self.if_text(stmt);
                self.line(text);
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => {
                let init = match init {
                    Some(ForInit::VarDecl(decl)) => self.var_decl_text(decl),
                    Some(ForInit::Expr(expr)) => self.expr(expr, PREC_SEQUENCE),
                    None => String::new(),
                };
                let condition = condition
                    .as_ref()
                    .map(|c| format!(" {}", self.expr(c, PREC_SEQUENCE)))
                    .unwrap_or_default();
                let update = update
                    .as_ref()
                    .map(|u| format!(" {}", self.expr(u, PREC_SEQUENCE)))
                    .unwrap_or_default();
                let body = self.body_block(body);
                self.line(format!("for ({};{};{}) {}", init, condition, update, body));
            }
            Stmt::ForIn { left, right, body } => {
                let left = self.for_left_text(left);
                let right = self.expr(right, PREC_SEQUENCE);
                let body = self.body_block(body);
                self.line(format!("for ({} in {}) {}", left, right, body));
            }
            Stmt::ForOf {
                left,
                right,
                body,
                is_await,
            } => {
                let left = self.for_left_text(left);
                let right = self.expr(right, PREC_ASSIGN);
                let body = self.body_block(body);
                let keyword = if *is_await { "for await" } else { "for" };
                self.line(format!("{} ({} of {}) {}", keyword, left, right, body));
            }
            Stmt::While { condition, body } => {
                let condition = self.expr(condition, PREC_SEQUENCE);
                let body = self.body_block(body);
                self.line(format!("while ({}) {}", condition, body));
            }
            Stmt::DoWhile { body, condition } => {
                let body = self.body_block(body);
                let condition = self.expr(condition, PREC_SEQUENCE);
                self.line(format!("do {} while ({});", body, condition));
            }
            Stmt::Block(block) => {
                let text = self.braced(|e| e.emit_stmts(&block.stmts));
                self.line(text);
            }
            Stmt::Break(label) => match label {
                Some(label) => self.line(format!("break {};", label.value)),
                None => self.line("break;"),
            },
            Stmt::Continue(label) => match label {
                Some(label) => self.line(format!("continue {};", label.value)),
                None => self.line("continue;"),
            },
            Stmt::Throw(value) => {
                let text = self.expr(value, PREC_SEQUENCE);
                self.line(format!("throw {};", text));
            }
            Stmt::Try {
                block,
                catch,
                finally,
            } => {
                let mut text = format!("try {}", self.braced(|e| e.emit_stmts(&block.value.stmts)));
                if let Some(catch) = catch {
                    let body = self.braced(|e| e.emit_stmts(&catch.body.value.stmts));
                    match &catch.param {
                        Some(param) => {
                            let param = self.pattern(param);
                            text.push_str(&format!(" catch ({}) {}", param, body));
                        }
                        None => text.push_str(&format!(" catch {}", body)),
                    }
                }
                if let Some(finally) = finally {
                    let body = self.braced(|e| e.emit_stmts(&finally.value.stmts));
                    text.push_str(&format!(" finally {}", body));
                }
                self.line(text);
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                let discriminant = self.expr(discriminant, PREC_SEQUENCE);
                self.line(format!("switch ({}) {{", discriminant));
                self.indented(|e| {
                    for case in cases {
                        match &case.test {
                            Some(test) => {
                                let test = e.expr(test, PREC_SEQUENCE);
                                e.line(format!("case {}:", test));
                            }
                            None => e.line("default:"),
                        }
                        e.indented(|e| e.emit_stmts(&case.consequent));
                    }
                });
                self.line("}");
            }
            Stmt::Labeled { label, stmt } => {
                let text = self.stmt_text(stmt);
                self.line(format!("{}: {}", label.value, text));
            }
            Stmt::Empty => self.line(";"),
            Stmt::Debugger => self.line("debugger;"),
            Stmt::Import(import) => self.emit_nested_import(import),
        }
    }

    /// `if`/`else if`/`else` chains on one logical line.
    fn if_text(&mut self, stmt: &Node<Stmt>) -> String {
        let Stmt::If {
            condition,
            then_stmt,
            else_stmt,
        } = &stmt.value
        else {
            return self.stmt_text(stmt);
        };

        let condition = self.expr(condition, PREC_SEQUENCE);
        let then_block = self.body_block(then_stmt);
        let mut text = format!("if ({}) {}", condition, then_block);
        if let Some(else_stmt) = else_stmt {
            if matches!(else_stmt.value, Stmt::If { .. }) {
                text.push_str(&format!(" else {}", self.if_text(else_stmt)));
            } else {
                text.push_str(&format!(" else {}", self.body_block(else_stmt)));
            }
        }
        text
    }

    /// Loop and branch bodies are always printed as blocks.
    fn body_block(&mut self, stmt: &Node<Stmt>) -> String {
        match &stmt.value {
            Stmt::Block(block) => self.braced(|e| e.emit_stmts(&block.stmts)),
            _ => self.braced(|e| e.emit_stmt(stmt)),
        }
    }

    fn for_left_text(&mut self, left: &ForInLeft) -> String {
        match left {
            ForInLeft::VarDecl(decl) => self.var_decl_text(decl),
            ForInLeft::Expr(expr) => self.expr(expr, PREC_MEMBER),
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    pub(crate) fn emit_decl(&mut self, decl: &Decl) {
        if decl.is_type_only() {
            return;
        }
        match decl {
            Decl::Function(func) => {
                let text = self.function_text(func, None);
                self.line(text);
            }
            Decl::Class(class) => {
                let text = self.class_text(class, None);
                self.line(text);
            }
            Decl::Var(var) => {
                let text = self.var_decl_text(var);
                self.line(format!("{};", text));
            }
            Decl::Enum(e) => self.emit_enum(e),
            Decl::Module(module) => self.emit_namespace(module, None),
            Decl::Interface(_) | Decl::TypeAlias(_) => {}
        }
    }

    pub(crate) fn var_decl_text(&mut self, decl: &VarDecl) -> String {
        let kind = if self.lowers_es2015() {
            VarDeclKind::Var
        } else {
            decl.kind
        };
        let declarators: Vec<String> = decl
            .declarations
            .iter()
            .map(|d| {
                let pattern = self.pattern(&d.pattern);
                match &d.init {
                    Some(init) => format!("{} = {}", pattern, self.expr(init, PREC_ASSIGN)),
                    None => pattern,
                }
            })
            .collect();
        format!("{} {}", kind, declarators.join(", "))
    }

    /// `function name(params) { body }`. `name` overrides the declared name,
    /// which is how anonymous default exports get one.
    pub(crate) fn function_text(&mut self, func: &Function, name: Option<&str>) -> String {
        let mut text = String::new();
        if func.is_async {
            text.push_str("async ");
        }
        text.push_str("function");
        if func.is_generator {
            text.push('*');
        }
        let name = name.or(func.name.as_ref().map(|n| n.value.name.as_str()));
        match name {
            Some(name) => {
                text.push(' ');
                text.push_str(name);
            }
            None if !func.is_generator => text.push(' '),
            None => {}
        }
        let params = self.params_text(&func.params);
        let body = self.function_body(func, &[]);
        text.push_str(&format!("({}) {}", params, body));
        text
    }

    fn function_body(&mut self, func: &Function, prologue: &[String]) -> String {
        let stmts = func.body.as_ref().map(|b| b.value.stmts.as_slice()).unwrap_or(&[]);
        self.braced(|e| {
            for line in prologue {
                e.line(line);
            }
            e.emit_stmts(stmts);
        })
    }

    pub(crate) fn params_text(&mut self, params: &[Param]) -> String {
        let params: Vec<String> = params
            .iter()
            .filter(|p| !p.is_this_param())
            .map(|p| {
                let pattern = self.pattern(&p.pattern);
                if p.is_rest {
                    format!("...{}", pattern)
                } else {
                    pattern
                }
            })
            .collect();
        params.join(", ")
    }

    pub(crate) fn class_text(&mut self, class: &ClassDecl, name: Option<&str>) -> String {
        let mut text = String::from("class");
        if let Some(name) = name.or(class.name.as_ref().map(|n| n.value.name.as_str())) {
            text.push(' ');
            text.push_str(name);
        }
        if let Some(extends) = &class.extends {
            let base = self.expr(&extends.base, PREC_MEMBER);
            text.push_str(&format!(" extends {}", base));
        }
        let derived = class.extends.is_some();
        let body = self.braced(|e| {
            for member in &class.members {
                e.emit_class_member(&member.value, derived);
            }
        });
        text.push(' ');
        text.push_str(&body);
        text
    }

    fn emit_class_member(&mut self, member: &ClassMember, derived: bool) {
        match member {
            ClassMember::Constructor(func) => {
                if func.body.is_none() {
                    return;
                }
                let text = self.constructor_text(func, derived);
                self.line(text);
            }
            ClassMember::Method {
                name,
                kind,
                function,
                is_static,
                ..
            } => {
                if function.body.is_none() {
                    return;
                }
                let text = self.method_text(name, *kind, function, *is_static);
                self.line(text);
            }
            ClassMember::Property {
                name,
                init,
                is_static,
                is_abstract,
                is_declare,
                ..
            } => {
                // Fields without an initializer have no runtime effect
                let Some(init) = init else {
                    return;
                };
                if *is_abstract || *is_declare {
                    return;
                }
                let key = self.property_key(name);
                let value = self.expr(init, PREC_ASSIGN);
                let prefix = if *is_static { "static " } else { "" };
                self.line(format!("{}{} = {};", prefix, key, value));
            }
            ClassMember::IndexSignature { .. } => {}
        }
    }

    /// Parameter properties become `this.x = x;` at the top of the body, or
    /// right after the `super(...)` call in a derived class.
    fn constructor_text(&mut self, func: &Function, derived: bool) -> String {
        let assignments: Vec<String> = func
            .params
            .iter()
            .filter(|p| p.is_property())
            .flat_map(|p| p.pattern.value.bound_names())
            .map(|name| format!("this.{} = {};", name, name))
            .collect();
        let params = self.params_text(&func.params);
        let stmts = func.body.as_ref().map(|b| b.value.stmts.as_slice()).unwrap_or(&[]);

        let split = if derived && !assignments.is_empty() {
            stmts.iter().position(is_super_call).map(|i| i + 1).unwrap_or(0)
        } else {
            0
        };
        let body = self.braced(|e| {
            e.emit_stmts(&stmts[..split]);
            for line in &assignments {
                e.line(line);
            }
            e.emit_stmts(&stmts[split..]);
        });
        format!("constructor({}) {}", params, body)
    }

    fn method_text(
        &mut self,
        key: &PropertyName,
        kind: MethodKind,
        func: &Function,
        is_static: bool,
    ) -> String {
        let mut text = String::new();
        if is_static {
            text.push_str("static ");
        }
        match kind {
            MethodKind::Getter => text.push_str("get "),
            MethodKind::Setter => text.push_str("set "),
            MethodKind::Method => {
                if func.is_async {
                    text.push_str("async ");
                }
                if func.is_generator {
                    text.push('*');
                }
            }
        }
        text.push_str(&self.property_key(key));
        let params = self.params_text(&func.params);
        let body = self.function_body(func, &[]);
        text.push_str(&format!("({}) {}", params, body));
        text
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Prints `expr`, parenthesized when it binds looser than `min_prec`.
    pub(crate) fn expr(&mut self, expr: &Node<Expr>, min_prec: u8) -> String {
        let (text, prec) = ensure_sufficient_stack(|| self.expr_with_prec(expr));
        if prec < min_prec {
            format!("({})", text)
        } else {
            text
        }
    }

    fn expr_with_prec(&mut self, expr: &Node<Expr>) -> (String, u8) {
        match &expr.value {
            Expr::Literal(lit) => (literal_text(lit), PREC_PRIMARY),
            Expr::Ident(ident) => (ident.name.clone(), PREC_PRIMARY),
            Expr::This => ("this".to_string(), PREC_PRIMARY),
            Expr::Super => ("super".to_string(), PREC_PRIMARY),

            Expr::Binary { left, op, right } => {
                let prec = binary_precedence(*op);
                // `**` is right-associative, everything else left
                let (left_min, right_min) = if *op == BinaryOp::Pow {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                let left = self.expr(left, left_min);
                let right = self.expr(right, right_min);
                (format!("{} {} {}", left, op, right), prec)
            }

            Expr::Unary { op, expr: operand } => {
                if op.is_postfix() {
                    let operand = self.expr(operand, PREC_POSTFIX);
                    return (format!("{}{}", operand, op), PREC_POSTFIX);
                }
                let operand = self.expr(operand, PREC_UNARY);
                let text = match op {
                    UnaryOp::TypeOf | UnaryOp::Void | UnaryOp::Delete => {
                        format!("{} {}", op, operand)
                    }
                    _ => {
                        let symbol = op.to_string();
                        // `- -x` must not collapse into `--x`
                        let clash = matches!(op, UnaryOp::Minus | UnaryOp::PreDecrement)
                            && operand.starts_with('-')
                            || matches!(op, UnaryOp::Plus | UnaryOp::PreIncrement)
                                && operand.starts_with('+');
                        if clash {
                            format!("{} {}", symbol, operand)
                        } else {
                            format!("{}{}", symbol, operand)
                        }
                    }
                };
                (text, PREC_UNARY)
            }

            Expr::Assignment { target, op, value } => {
                let target = self.expr(target, PREC_POSTFIX);
                let value = self.expr(value, PREC_ASSIGN);
                (format!("{} {} {}", target, op, value), PREC_ASSIGN)
            }

            Expr::Call { callee, args, .. } => {
                let callee = self.expr(callee, PREC_MEMBER);
                let args = self.args_text(args);
                (format!("{}({})", callee, args), PREC_MEMBER)
            }
            Expr::OptionalCall { callee, args, .. } => {
                let callee = self.expr(callee, PREC_MEMBER);
                let args = self.args_text(args);
                (format!("{}?.({})", callee, args), PREC_MEMBER)
            }
            Expr::New { callee, args, .. } => {
                let callee = match &callee.value {
                    // `new (f())()` must keep the call inside the parens
                    Expr::Call { .. } | Expr::OptionalCall { .. } => {
                        format!("({})", self.expr(callee, PREC_SEQUENCE))
                    }
                    _ => self.expr(callee, PREC_MEMBER),
                };
                let args = self.args_text(args);
                (format!("new {}({})", callee, args), PREC_MEMBER)
            }

            Expr::Member { object, property } => {
                let object = self.member_object(object);
                (format!("{}.{}", object, property.value), PREC_MEMBER)
            }
            Expr::OptionalMember { object, property } => {
                let object = self.member_object(object);
                (format!("{}?.{}", object, property.value), PREC_MEMBER)
            }
            Expr::Index { object, index } => {
                let object = self.member_object(object);
                let index = self.expr(index, PREC_SEQUENCE);
                (format!("{}[{}]", object, index), PREC_MEMBER)
            }
            Expr::OptionalIndex { object, index } => {
                let object = self.member_object(object);
                let index = self.expr(index, PREC_SEQUENCE);
                (format!("{}?.[{}]", object, index), PREC_MEMBER)
            }

            Expr::Array(elements) => {
                let mut parts: Vec<String> = elements
                    .iter()
                    .map(|element| match element {
                        Some(element) => self.expr(element, PREC_ASSIGN),
                        None => String::new(),
                    })
                    .collect();
                // A trailing hole needs its own comma to keep the length
                if matches!(elements.last(), Some(None)) {
                    parts.push(String::new());
                }
                (format!("[{}]", parts.join(", ")), PREC_PRIMARY)
            }

            Expr::Object(props) => (self.object_text(props), PREC_PRIMARY),

            Expr::Arrow(arrow) => self.arrow_text(arrow),

            Expr::Function(func) => (self.function_text(func, None), PREC_PRIMARY),

            Expr::Class(class) => (self.class_text(class, None), PREC_PRIMARY),

            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                let condition = self.expr(condition, PREC_TERNARY + 1);
                let then_expr = self.expr(then_expr, PREC_ASSIGN);
                let else_expr = self.expr(else_expr, PREC_ASSIGN);
                (
                    format!("{} ? {} : {}", condition, then_expr, else_expr),
                    PREC_TERNARY,
                )
            }

            Expr::Template { parts, exprs } => self.template_text(parts, exprs),

            Expr::TypeCast { expr: inner, .. }
            | Expr::Satisfies { expr: inner, .. }
            | Expr::NonNullAssertion(inner) => self.expr_with_prec(inner),

            Expr::Paren(inner) => {
                let inner = self.expr(inner, PREC_SEQUENCE);
                (format!("({})", inner), PREC_PRIMARY)
            }

            Expr::Await(inner) => {
                let inner = self.expr(inner, PREC_UNARY);
                (format!("await {}", inner), PREC_UNARY)
            }

            Expr::Yield { argument, delegate } => {
                let keyword = if *delegate { "yield*" } else { "yield" };
                let text = match argument {
                    Some(argument) => format!("{} {}", keyword, self.expr(argument, PREC_ASSIGN)),
                    None => keyword.to_string(),
                };
                (text, PREC_ASSIGN)
            }

            Expr::Sequence(exprs) => {
                let parts: Vec<String> = exprs.iter().map(|e| self.expr(e, PREC_ASSIGN)).collect();
                (parts.join(", "), PREC_SEQUENCE)
            }

            Expr::Spread(inner) => {
                let inner = self.expr(inner, PREC_ASSIGN);
                (format!("...{}", inner), PREC_ASSIGN)
            }
        }
    }

    /// The object side of a member access. Integer literals need parens so
    /// the dot is not read as a decimal point.
    fn member_object(&mut self, object: &Node<Expr>) -> String {
        let text = self.expr(object, PREC_MEMBER);
        let is_integer = matches!(object.value, Expr::Literal(Literal::Number(_)))
            && text.bytes().all(|b| b.is_ascii_digit());
        if is_integer {
            format!("({})", text)
        } else {
            text
        }
    }

    fn args_text(&mut self, args: &[Node<Expr>]) -> String {
        let args: Vec<String> = args.iter().map(|a| self.expr(a, PREC_ASSIGN)).collect();
        args.join(", ")
    }

    fn object_text(&mut self, props: &[ObjectProperty]) -> String {
        if props.is_empty() {
            return "{}".to_string();
        }
        let parts: Vec<String> = props
            .iter()
            .map(|prop| match prop {
                ObjectProperty::Property {
                    key,
                    value,
                    shorthand,
                } => {
                    let same_name = match (key, &value.value) {
                        (PropertyName::Ident(key), Expr::Ident(ident)) => key.value.name == ident.name,
                        _ => false,
                    };
                    if *shorthand && same_name {
                        return self.property_key(key);
                    }
                    let key = self.property_key(key);
                    if *shorthand {
                        // `{ a = 1 }` only occurs as an assignment pattern
                        if let Expr::Assignment { value: default, .. } = &value.value {
                            let default = self.expr(default, PREC_ASSIGN);
                            return format!("{} = {}", key, default);
                        }
                    }
                    format!("{}: {}", key, self.expr(value, PREC_ASSIGN))
                }
                ObjectProperty::Method {
                    key,
                    kind,
                    function,
                } => self.method_text(key, *kind, function, false),
                ObjectProperty::Spread(inner) => format!("...{}", self.expr(inner, PREC_ASSIGN)),
            })
            .collect();
        format!("{{ {} }}", parts.join(", "))
    }

    fn arrow_text(&mut self, arrow: &ArrowFunction) -> (String, u8) {
        let params = self.params_text(&arrow.params);
        let prefix = if arrow.is_async { "async " } else { "" };

        if self.lowers_es2015() {
            let body = match &arrow.body {
                ArrowBody::Block(block) => self.braced(|e| e.emit_stmts(&block.value.stmts)),
                ArrowBody::Expr(expr) => {
                    let value = self.expr(expr, PREC_SEQUENCE);
                    self.braced(|e| e.line(format!("return {};", value)))
                }
            };
            let text = format!("{}function ({}) {}", prefix, params, body);
            if uses_this(arrow) {
                return (format!("{}.bind(this)", text), PREC_MEMBER);
            }
            return (text, PREC_PRIMARY);
        }

        let body = match &arrow.body {
            ArrowBody::Block(block) => self.braced(|e| e.emit_stmts(&block.value.stmts)),
            ArrowBody::Expr(expr) => {
                let text = self.expr(expr, PREC_ASSIGN);
                // An object literal body would read as a block
                if text.starts_with('{') {
                    format!("({})", text)
                } else {
                    text
                }
            }
        };
        (format!("{}({}) => {}", prefix, params, body), PREC_ASSIGN)
    }

    fn template_text(&mut self, parts: &[String], exprs: &[Node<Expr>]) -> (String, u8) {
        if self.lowers_es2015() {
            let head = parts.first().map(String::as_str).unwrap_or("");
            let mut text = quote_string(head);
            if exprs.is_empty() {
                return (text, PREC_PRIMARY);
            }
            for (i, expr) in exprs.iter().enumerate() {
                let value = self.expr(expr, PREC_ADDITIVE + 1);
                text.push_str(&format!(" + {}", value));
                if let Some(part) = parts.get(i + 1).filter(|p| !p.is_empty()) {
                    text.push_str(&format!(" + {}", quote_string(part)));
                }
            }
            return (text, PREC_ADDITIVE);
        }

        let mut text = String::from("`");
        for (i, part) in parts.iter().enumerate() {
            text.push_str(&escape_template(part));
            if let Some(expr) = exprs.get(i) {
                let value = self.expr(expr, PREC_SEQUENCE);
                text.push_str(&format!("${{{}}}", value));
            }
        }
        text.push('`');
        (text, PREC_PRIMARY)
    }

    // =========================================================================
    // Patterns and property names
    // =========================================================================

    pub(crate) fn pattern(&mut self, pattern: &Node<Pattern>) -> String {
        match &pattern.value {
            Pattern::Ident(ident) => ident.value.name.clone(),
            Pattern::Array { elements, rest } => {
                let mut parts: Vec<String> = elements
                    .iter()
                    .map(|element| match element {
                        Some(element) => self.pattern(element),
                        None => String::new(),
                    })
                    .collect();
                match rest {
                    Some(rest) => parts.push(format!("...{}", self.pattern(rest))),
                    None if matches!(elements.last(), Some(None)) => parts.push(String::new()),
                    None => {}
                }
                format!("[{}]", parts.join(", "))
            }
            Pattern::Object { properties, rest } => {
                let mut parts: Vec<String> = properties
                    .iter()
                    .map(|prop| {
                        let value = self.pattern(&prop.value);
                        if prop.shorthand {
                            value
                        } else {
                            format!("{}: {}", self.property_key(&prop.key), value)
                        }
                    })
                    .collect();
                if let Some(rest) = rest {
                    parts.push(format!("...{}", self.pattern(rest)));
                }
                if parts.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{ {} }}", parts.join(", "))
                }
            }
            Pattern::Assignment { pattern, default } => {
                let pattern = self.pattern(pattern);
                let default = self.expr(default, PREC_ASSIGN);
                format!("{} = {}", pattern, default)
            }
        }
    }

    pub(crate) fn property_key(&mut self, key: &PropertyName) -> String {
        match key {
            PropertyName::Ident(ident) => ident.value.name.clone(),
            PropertyName::String(s) => quote_string(s),
            PropertyName::Number(n) => number_text(*n),
            PropertyName::Computed(expr) => format!("[{}]", self.expr(expr, PREC_ASSIGN)),
        }
    }
}

fn is_super_call(stmt: &Node<Stmt>) -> bool {
    match &stmt.value {
        Stmt::Expr(expr) => matches!(
            &expr.value,
            Expr::Call { callee, .. } if matches!(callee.value, Expr::Super)
        ),
        _ => false,
    }
}

/// Expression statements may not begin with `function`, `class` or `{`.
fn needs_statement_parens(text: &str) -> bool {
    text.starts_with('{')
        || text.starts_with("function ")
        || text.starts_with("function(")
        || text.starts_with("function*")
        || text.starts_with("async function")
        || text.starts_with("class ")
        || text.starts_with("class{")
}

fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::NullishCoalesce => 4,
        BinaryOp::Or => 5,
        BinaryOp::And => 6,
        BinaryOp::BitOr => 7,
        BinaryOp::BitXor => 8,
        BinaryOp::BitAnd => 9,
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 10,
        BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq
        | BinaryOp::In
        | BinaryOp::InstanceOf => 11,
        BinaryOp::LeftShift | BinaryOp::RightShift | BinaryOp::UnsignedRightShift => 12,
        BinaryOp::Add | BinaryOp::Sub => PREC_ADDITIVE,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 14,
        BinaryOp::Pow => PREC_EXPONENT,
    }
}

pub(crate) fn literal_text(lit: &Literal) -> String {
    match lit {
        Literal::Number(n) => number_text(*n),
        Literal::String(s) => quote_string(s),
        Literal::Boolean(b) => b.to_string(),
        Literal::Null => "null".to_string(),
    }
}

pub(crate) fn number_text(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        format!("{}", n)
    }
}

/// A double-quoted JavaScript string literal.
pub(crate) fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{b}' => out.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\u{2028}' || c == '\u{2029}' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn escape_template(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '`' => out.push_str("\\`"),
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out
}

/// Whether `name` can follow a dot in a member expression.
pub(crate) fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// `object.name`, or `object["name"]` when `name` is not an identifier.
pub(crate) fn member_access(object: &str, name: &str) -> String {
    if is_identifier_name(name) {
        format!("{}.{}", object, name)
    } else {
        format!("{}[{}]", object, quote_string(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_string_escapes() {
        assert_eq!(quote_string("plain"), "\"plain\"");
        assert_eq!(quote_string("a\"b\\c"), "\"a\\\"b\\\\c\"");
        assert_eq!(quote_string("line\nnext\ttab"), "\"line\\nnext\\ttab\"");
        assert_eq!(quote_string("\u{1}"), "\"\\u0001\"");
    }

    #[test]
    fn test_escape_template() {
        assert_eq!(escape_template("a`b"), "a\\`b");
        assert_eq!(escape_template("cost ${x}"), "cost \\${x}");
        assert_eq!(escape_template("$5"), "$5");
    }

    #[test]
    fn test_number_text() {
        assert_eq!(number_text(42.0), "42");
        assert_eq!(number_text(0.5), "0.5");
        assert_eq!(number_text(f64::INFINITY), "Infinity");
        assert_eq!(number_text(f64::NAN), "NaN");
    }

    #[test]
    fn test_member_access() {
        assert_eq!(member_access("exports", "value"), "exports.value");
        assert_eq!(member_access("exports", "default"), "exports.default");
        assert_eq!(member_access("exports", "my-name"), "exports[\"my-name\"]");
        assert!(!is_identifier_name("1st"));
        assert!(is_identifier_name("$el"));
    }

    #[test]
    fn test_fresh_temps_count_per_base() {
        let options = CompilerOptions::default();
        let mut emitter = Emitter::new(&options);
        assert_eq!(emitter.fresh_temp("utils"), "utils_1");
        assert_eq!(emitter.fresh_temp("utils"), "utils_2");
        assert_eq!(emitter.fresh_temp("math"), "math_1");
    }

    #[test]
    fn test_braced_aligns_closing_brace() {
        let options = CompilerOptions::default();
        let mut emitter = Emitter::new(&options);
        emitter.indented(|e| {
            let block = e.braced(|e| e.line("x;"));
            e.line(format!("if (a) {}", block));
        });
        assert_eq!(emitter.finish(), "    if (a) {\n        x;\n    }\n");
    }
}

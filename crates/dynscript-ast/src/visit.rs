//! Read-only AST traversal.
//!
//! Implementors override the `visit_*` methods for the nodes they care
//! about and call the matching `walk_*` function to keep descending.
//! Defaults walk every child in source order, type annotations excluded.

use super::*;

pub trait Visit {
    fn visit_program(&mut self, program: &Program) {
        walk_program(self, program);
    }

    fn visit_module_item(&mut self, item: &Node<ModuleItem>) {
        walk_module_item(self, item);
    }

    fn visit_import(&mut self, _import: &ImportDecl, _span: Span) {}

    fn visit_export(&mut self, export: &ExportDecl, span: Span) {
        walk_export(self, export, span);
    }

    fn visit_stmt(&mut self, stmt: &Node<Stmt>) {
        walk_stmt(self, stmt);
    }

    fn visit_decl(&mut self, decl: &Decl, span: Span) {
        walk_decl(self, decl, span);
    }

    fn visit_expr(&mut self, expr: &Node<Expr>) {
        walk_expr(self, expr);
    }

    fn visit_pattern(&mut self, pattern: &Node<Pattern>) {
        walk_pattern(self, pattern);
    }

    fn visit_function(&mut self, function: &Function) {
        walk_function(self, function);
    }

    fn visit_arrow(&mut self, arrow: &ArrowFunction) {
        walk_arrow(self, arrow);
    }

    fn visit_class(&mut self, class: &ClassDecl) {
        walk_class(self, class);
    }

    fn visit_property_name(&mut self, name: &PropertyName) {
        if let PropertyName::Computed(expr) = name {
            self.visit_expr(expr);
        }
    }
}

pub fn walk_program<V: Visit + ?Sized>(v: &mut V, program: &Program) {
    for item in &program.items {
        v.visit_module_item(item);
    }
}

pub fn walk_module_item<V: Visit + ?Sized>(v: &mut V, item: &Node<ModuleItem>) {
    match &item.value {
        ModuleItem::Import(import) => v.visit_import(import, item.span),
        ModuleItem::Export(export) => v.visit_export(export, item.span),
        ModuleItem::Stmt(stmt) => v.visit_stmt(stmt),
    }
}

pub fn walk_export<V: Visit + ?Sized>(v: &mut V, export: &ExportDecl, _span: Span) {
    match export {
        ExportDecl::Default(expr) => v.visit_expr(expr),
        ExportDecl::DefaultDecl(decl) | ExportDecl::Decl(decl) => v.visit_decl(&decl.value, decl.span),
        ExportDecl::Named { .. } | ExportDecl::All { .. } => {}
    }
}

pub fn walk_block<V: Visit + ?Sized>(v: &mut V, block: &BlockStmt) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_var_decl<V: Visit + ?Sized>(v: &mut V, var: &VarDecl) {
    for declarator in &var.declarations {
        v.visit_pattern(&declarator.pattern);
        if let Some(init) = &declarator.init {
            v.visit_expr(init);
        }
    }
}

pub fn walk_stmt<V: Visit + ?Sized>(v: &mut V, stmt: &Node<Stmt>) {
    match &stmt.value {
        Stmt::Expr(expr) | Stmt::Throw(expr) => v.visit_expr(expr),
        Stmt::Decl(decl) => v.visit_decl(decl, stmt.span),
        Stmt::Return(expr) => {
            if let Some(expr) = expr {
                v.visit_expr(expr);
            }
        }
        Stmt::If {
            condition,
            then_stmt,
            else_stmt,
        } => {
            v.visit_expr(condition);
            v.visit_stmt(then_stmt);
            if let Some(else_stmt) = else_stmt {
                v.visit_stmt(else_stmt);
            }
        }
        Stmt::For {
            init,
            condition,
            update,
            body,
        } => {
            match init {
                Some(ForInit::VarDecl(var)) => walk_var_decl(v, var),
                Some(ForInit::Expr(expr)) => v.visit_expr(expr),
                None => {}
            }
            if let Some(condition) = condition {
                v.visit_expr(condition);
            }
            if let Some(update) = update {
                v.visit_expr(update);
            }
            v.visit_stmt(body);
        }
        Stmt::ForIn { left, right, body } | Stmt::ForOf { left, right, body, .. } => {
            match left {
                ForInLeft::VarDecl(var) => walk_var_decl(v, var),
                ForInLeft::Expr(expr) => v.visit_expr(expr),
            }
            v.visit_expr(right);
            v.visit_stmt(body);
        }
        Stmt::While { condition, body } | Stmt::DoWhile { body, condition } => {
            v.visit_expr(condition);
            v.visit_stmt(body);
        }
        Stmt::Block(block) => walk_block(v, block),
        Stmt::Try {
            block,
            catch,
            finally,
        } => {
            walk_block(v, &block.value);
            if let Some(catch) = catch {
                if let Some(param) = &catch.param {
                    v.visit_pattern(param);
                }
                walk_block(v, &catch.body.value);
            }
            if let Some(finally) = finally {
                walk_block(v, &finally.value);
            }
        }
        Stmt::Switch {
            discriminant,
            cases,
        } => {
            v.visit_expr(discriminant);
            for case in cases {
                if let Some(test) = &case.test {
                    v.visit_expr(test);
                }
                for stmt in &case.consequent {
                    v.visit_stmt(stmt);
                }
            }
        }
        Stmt::Labeled { stmt, .. } => v.visit_stmt(stmt),
        Stmt::Import(import) => v.visit_import(import, stmt.span),
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty | Stmt::Debugger => {}
    }
}

pub fn walk_decl<V: Visit + ?Sized>(v: &mut V, decl: &Decl, _span: Span) {
    match decl {
        Decl::Function(func) => v.visit_function(func),
        Decl::Class(class) => v.visit_class(class),
        Decl::Var(var) => walk_var_decl(v, var),
        Decl::Enum(e) => {
            for member in &e.members {
                if let Some(init) = &member.init {
                    v.visit_expr(init);
                }
            }
        }
        Decl::Module(module) => walk_module_decl(v, module),
        Decl::Interface(_) | Decl::TypeAlias(_) => {}
    }
}

pub fn walk_module_decl<V: Visit + ?Sized>(v: &mut V, module: &ModuleDecl) {
    match &module.body {
        ModuleBody::Block(items) => {
            for item in items {
                v.visit_module_item(item);
            }
        }
        ModuleBody::Namespace(inner) => walk_module_decl(v, &inner.value),
        ModuleBody::None => {}
    }
}

pub fn walk_expr<V: Visit + ?Sized>(v: &mut V, expr: &Node<Expr>) {
    match &expr.value {
        Expr::Literal(_) | Expr::Ident(_) | Expr::This | Expr::Super => {}
        Expr::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        Expr::Assignment { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Expr::Unary { expr, .. }
        | Expr::TypeCast { expr, .. }
        | Expr::Satisfies { expr, .. }
        | Expr::NonNullAssertion(expr)
        | Expr::Await(expr)
        | Expr::Paren(expr)
        | Expr::Spread(expr) => v.visit_expr(expr),
        Expr::Call { callee, args, .. }
        | Expr::New { callee, args, .. }
        | Expr::OptionalCall { callee, args, .. } => {
            v.visit_expr(callee);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::Member { object, .. } | Expr::OptionalMember { object, .. } => v.visit_expr(object),
        Expr::Index { object, index } | Expr::OptionalIndex { object, index } => {
            v.visit_expr(object);
            v.visit_expr(index);
        }
        Expr::Array(elements) => {
            for element in elements.iter().flatten() {
                v.visit_expr(element);
            }
        }
        Expr::Object(props) => {
            for prop in props {
                match prop {
                    ObjectProperty::Property { key, value, .. } => {
                        v.visit_property_name(key);
                        v.visit_expr(value);
                    }
                    ObjectProperty::Method { key, function, .. } => {
                        v.visit_property_name(key);
                        v.visit_function(function);
                    }
                    ObjectProperty::Spread(expr) => v.visit_expr(expr),
                }
            }
        }
        Expr::Arrow(arrow) => v.visit_arrow(arrow),
        Expr::Function(func) => v.visit_function(func),
        Expr::Class(class) => v.visit_class(class),
        Expr::Ternary {
            condition,
            then_expr,
            else_expr,
        } => {
            v.visit_expr(condition);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        Expr::Template { exprs, .. } | Expr::Sequence(exprs) => {
            for e in exprs {
                v.visit_expr(e);
            }
        }
        Expr::Yield { argument, .. } => {
            if let Some(argument) = argument {
                v.visit_expr(argument);
            }
        }
    }
}

pub fn walk_pattern<V: Visit + ?Sized>(v: &mut V, pattern: &Node<Pattern>) {
    match &pattern.value {
        Pattern::Ident(_) => {}
        Pattern::Array { elements, rest } => {
            for element in elements.iter().flatten() {
                v.visit_pattern(element);
            }
            if let Some(rest) = rest {
                v.visit_pattern(rest);
            }
        }
        Pattern::Object { properties, rest } => {
            for prop in properties {
                v.visit_property_name(&prop.key);
                v.visit_pattern(&prop.value);
            }
            if let Some(rest) = rest {
                v.visit_pattern(rest);
            }
        }
        Pattern::Assignment { pattern, default } => {
            v.visit_pattern(pattern);
            v.visit_expr(default);
        }
    }
}

pub fn walk_params<V: Visit + ?Sized>(v: &mut V, params: &[Param]) {
    for param in params {
        v.visit_pattern(&param.pattern);
    }
}

pub fn walk_function<V: Visit + ?Sized>(v: &mut V, function: &Function) {
    walk_params(v, &function.params);
    if let Some(body) = &function.body {
        walk_block(v, &body.value);
    }
}

pub fn walk_arrow<V: Visit + ?Sized>(v: &mut V, arrow: &ArrowFunction) {
    walk_params(v, &arrow.params);
    match &arrow.body {
        ArrowBody::Expr(expr) => v.visit_expr(expr),
        ArrowBody::Block(block) => walk_block(v, &block.value),
    }
}

pub fn walk_class<V: Visit + ?Sized>(v: &mut V, class: &ClassDecl) {
    if let Some(extends) = &class.extends {
        v.visit_expr(&extends.base);
    }
    for member in &class.members {
        match &member.value {
            ClassMember::Constructor(func) => v.visit_function(func),
            ClassMember::Method { name, function, .. } => {
                v.visit_property_name(name);
                v.visit_function(function);
            }
            ClassMember::Property { name, init, .. } => {
                v.visit_property_name(name);
                if let Some(init) = init {
                    v.visit_expr(init);
                }
            }
            ClassMember::IndexSignature { .. } => {}
        }
    }
}

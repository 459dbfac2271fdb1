//! # dynscript Parser
//!
//! Recursive descent parser for TypeScript and JavaScript modules.
//! Uses Pratt parsing for expressions with proper operator precedence and
//! speculative parsing for arrow functions and generic call arguments.

use dynscript_ast::*;
use dynscript_lexer::{split_template, Lexer, Token, TokenKind};

// Module declarations
mod error;
mod parser;
mod expr;
mod stmt;
mod types;
mod decl;
mod pattern;
mod helpers;
mod stack;

// Re-export public types
pub use error::{ParseError, ParseResult};
pub use parser::{Parser, MAX_NESTING_DEPTH};
pub use stack::ensure_sufficient_stack;

/// Lexes and parses `source` as a module. Spans carry `file_id`.
pub fn parse_module(source: &str, file_id: usize) -> Result<Program, Vec<ParseError>> {
    let tokens = Lexer::with_file_id(source, file_id).tokenize();
    Parser::new(tokens).parse_program()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Result<Program, Vec<ParseError>> {
        parse_module(source, 0)
    }

    fn first_stmt(program: &Program) -> &Stmt {
        match &program.items[0].value {
            ModuleItem::Stmt(stmt) => &stmt.value,
            other => panic!("expected statement, got {:?}", other),
        }
    }

    fn first_init(program: &Program) -> &Expr {
        match first_stmt(program) {
            Stmt::Decl(Decl::Var(decl)) => &decl.declarations[0].init.as_ref().unwrap().value,
            other => panic!("expected variable declaration, got {:?}", other),
        }
    }

    fn expr_of(source: &str) -> Expr {
        let program = parse(source).unwrap();
        match first_stmt(&program) {
            Stmt::Expr(expr) => expr.value.clone(),
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_variable_declaration() {
        let program = parse("let x: number = 42;").unwrap();
        assert_eq!(program.items.len(), 1);
        match first_stmt(&program) {
            Stmt::Decl(Decl::Var(decl)) => {
                assert_eq!(decl.kind, VarDeclKind::Let);
                assert!(decl.declarations[0].type_annotation.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_declaration() {
        let program = parse("function add(a: number, b: number): number { return a + b; }").unwrap();
        match first_stmt(&program) {
            Stmt::Decl(Decl::Function(func)) => {
                assert_eq!(func.name.as_ref().unwrap().value.name, "add");
                assert_eq!(func.params.len(), 2);
                assert!(func.return_type.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_operator_precedence() {
        let expr = expr_of("1 + 2 * 3;");
        match expr {
            Expr::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(right.value, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }

        // ** is right-associative
        match expr_of("2 ** 3 ** 2;") {
            Expr::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Pow);
                assert!(matches!(right.value, Expr::Binary { op: BinaryOp::Pow, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_arrow_functions() {
        let program = parse("const f = (a: number, b = 2): number => a + b;").unwrap();
        match first_init(&program) {
            Expr::Arrow(arrow) => {
                assert_eq!(arrow.params.len(), 2);
                assert!(arrow.return_type.is_some());
                assert!(matches!(arrow.body, ArrowBody::Expr(_)));
            }
            other => panic!("unexpected {:?}", other),
        }

        let program = parse("const g = x => { return x; };").unwrap();
        assert!(matches!(first_init(&program), Expr::Arrow(_)));

        let program = parse("const h = async <T>(x: T) => x;").unwrap();
        match first_init(&program) {
            Expr::Arrow(arrow) => {
                assert!(arrow.is_async);
                assert!(arrow.type_params.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parenthesized_expression_is_not_arrow() {
        assert!(matches!(expr_of("(a + b) * c;"), Expr::Binary { op: BinaryOp::Mul, .. }));
        assert!(matches!(expr_of("cond ? (a) : b;"), Expr::Ternary { .. }));
        // `async` is an ordinary identifier when no arrow follows
        assert!(matches!(expr_of("async(1);"), Expr::Call { .. }));
    }

    #[test]
    fn test_generic_call_versus_comparison() {
        match expr_of("identity<string>(x);") {
            Expr::Call { type_args, .. } => assert_eq!(type_args.unwrap().len(), 1),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(expr_of("a < b;"), Expr::Binary { op: BinaryOp::Lt, .. }));
        assert!(matches!(expr_of("a < b > c;"), Expr::Binary { op: BinaryOp::Gt, .. }));
    }

    #[test]
    fn test_nested_type_arguments_split_shift() {
        let program = parse("let m: Map<string, Array<number>> = new Map<string, Array<number>>();").unwrap();
        match first_init(&program) {
            Expr::New { type_args, args, .. } => {
                assert_eq!(type_args.as_ref().unwrap().len(), 2);
                assert!(args.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
        // A real shift after a failed speculation is left intact
        assert!(matches!(expr_of("a >> b;"), Expr::Binary { op: BinaryOp::RightShift, .. }));
    }

    #[test]
    fn test_parse_class_declaration() {
        let source = r#"
            abstract class Animal<T> extends Base implements Named {
                private static count = 0;
                readonly name: string;
                constructor(public owner: string, private age?: number) {
                    super();
                }
                get label(): string { return this.name; }
                set label(v: string) {}
                abstract speak(): void;
                static create() { return null; }
                async *items() {}
            }
        "#;
        let program = parse(source).unwrap();
        match first_stmt(&program) {
            Stmt::Decl(Decl::Class(class)) => {
                assert!(class.is_abstract);
                assert!(class.extends.is_some());
                assert_eq!(class.implements.len(), 1);
                assert_eq!(class.members.len(), 8);
                let ctor = class.constructor().unwrap();
                assert!(ctor.params.iter().all(|p| p.is_property()));
                assert!(class.members.iter().any(|m| matches!(
                    &m.value,
                    ClassMember::Method { kind: MethodKind::Getter, .. }
                )));
                assert!(class.members.iter().any(|m| matches!(
                    &m.value,
                    ClassMember::Method { is_abstract: true, .. }
                )));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_modifier_words_as_member_names() {
        let program = parse("class A { static() {} get = 1; readonly; }").unwrap();
        match first_stmt(&program) {
            Stmt::Decl(Decl::Class(class)) => {
                assert_eq!(class.members.len(), 3);
                assert!(matches!(
                    &class.members[0].value,
                    ClassMember::Method { is_static: false, .. }
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_interface_and_type_alias() {
        let source = r#"
            interface Point extends Base<string> {
                readonly x: number;
                y?: number;
                [key: string]: unknown;
                move(dx: number, dy: number): Point;
                (arg: string): void;
            }
            type Handler<T = any> = (event: T, ...rest: unknown[]) => void;
            type Keys = keyof Point | "z";
            type Pick2<T, K extends keyof T> = { readonly [P in K]: T[P] };
            type Unwrap<T> = T extends Promise<infer U> ? U : T;
        "#;
        let program = parse(source).unwrap();
        assert_eq!(program.items.len(), 5);
        match first_stmt(&program) {
            Stmt::Decl(Decl::Interface(iface)) => assert_eq!(iface.members.len(), 5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_enum_and_namespace() {
        let source = r#"
            enum Color { Red, Green = 5, "Blue" = Green + 1 }
            const enum Flags { A = 1 << 0, B = 1 << 1 }
            namespace Outer.Inner { export const value = 1; }
            declare module "ambient" { export function f(): void; }
        "#;
        let program = parse(source).unwrap();
        assert_eq!(program.items.len(), 4);

        match first_stmt(&program) {
            Stmt::Decl(Decl::Enum(e)) => {
                assert_eq!(e.members.len(), 3);
                assert!(!e.is_const);
            }
            other => panic!("unexpected {:?}", other),
        }

        match &program.items[2].value {
            ModuleItem::Stmt(stmt) => match &stmt.value {
                Stmt::Decl(Decl::Module(m)) => {
                    assert!(matches!(m.body, ModuleBody::Namespace(_)));
                    assert!(m.has_runtime_content());
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_imports() {
        let source = r#"
            import "./side-effect";
            import def from "./a";
            import * as ns from "./b";
            import def2, { x, y as z, type T } from "./c";
            import type { Only } from "./d";
        "#;
        let program = parse(source).unwrap();
        let imports: Vec<&ImportDecl> = program
            .items
            .iter()
            .filter_map(|item| match &item.value {
                ModuleItem::Import(import) => Some(import),
                _ => None,
            })
            .collect();
        assert_eq!(imports.len(), 5);
        assert!(imports[0].specifiers.is_empty());
        assert_eq!(imports[3].source, "./c");
        assert_eq!(imports[3].specifiers.len(), 4);
        assert_eq!(imports[3].specifiers[2].local_name(), "z");
        assert!(matches!(
            imports[3].specifiers[3],
            ImportSpecifier::Named { type_only: true, .. }
        ));
        assert!(imports[4].type_only);
    }

    #[test]
    fn test_parse_exports() {
        let source = r#"
            export const a = 1, b = 2;
            export function f() {}
            export default class {}
            export { a as alias, b };
            export * from "./all";
            export * as ns from "./ns";
            export { x as default } from "./re";
            export type { T } from "./types";
            export interface I {}
        "#;
        let program = parse(source).unwrap();
        assert_eq!(program.items.len(), 9);
        assert!(program.is_module());

        let exports: Vec<&ExportDecl> = program
            .items
            .iter()
            .filter_map(|item| match &item.value {
                ModuleItem::Export(export) => Some(export),
                _ => None,
            })
            .collect();
        assert!(matches!(exports[0], ExportDecl::Decl(_)));
        assert!(matches!(exports[2], ExportDecl::DefaultDecl(_)));
        match exports[3] {
            ExportDecl::Named { specifiers, source, .. } => {
                assert_eq!(specifiers[0].exported_name(), "alias");
                assert!(source.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(exports[5], ExportDecl::All { as_name: Some(_), .. }));
        match exports[6] {
            ExportDecl::Named { specifiers, source, .. } => {
                assert_eq!(specifiers[0].exported_name(), "default");
                assert_eq!(source.as_deref(), Some("./re"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(exports[7], ExportDecl::Named { type_only: true, .. }));
    }

    #[test]
    fn test_parse_export_default_expression() {
        let program = parse("export default a + 1;").unwrap();
        match &program.items[0].value {
            ModuleItem::Export(ExportDecl::Default(expr)) => {
                assert!(matches!(expr.value, Expr::Binary { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_control_flow() {
        let source = r#"
            if (x > 0) { y = 1; } else if (x < 0) y = -1; else { y = 0; }
            for (let i = 0; i < 10; i++) { continue; }
            for (const key in obj) {}
            for (const [k, v] of entries) {}
            while (true) break;
            do { x--; } while (x > 0)
            outer: for (;;) { break outer; }
            switch (x) { case 1: case 2: y = 1; break; default: y = 2; }
            try { risky(); } catch (e: unknown) { log(e); } finally { done(); }
            try { a(); } catch { b(); }
            throw new Error("boom");
        "#;
        let program = parse(source).unwrap();
        assert_eq!(program.items.len(), 11);
    }

    #[test]
    fn test_for_in_with_expression_target() {
        let program = parse("for (k in obj) {}").unwrap();
        match first_stmt(&program) {
            Stmt::ForIn { left, .. } => assert!(matches!(left, ForInLeft::Expr(_))),
            other => panic!("unexpected {:?}", other),
        }

        // `in` inside parentheses in a for initializer is still an operator
        let program = parse("for (let i = ('a' in o) ? 1 : 0; i < 1; i++) {}").unwrap();
        assert!(matches!(first_stmt(&program), Stmt::For { .. }));
    }

    #[test]
    fn test_return_followed_by_newline() {
        let program = parse("function f() {\n  return\n  42;\n}").unwrap();
        match first_stmt(&program) {
            Stmt::Decl(Decl::Function(func)) => {
                let body = func.body.as_ref().unwrap();
                assert_eq!(body.value.stmts.len(), 2);
                assert!(matches!(body.value.stmts[0].value, Stmt::Return(None)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_automatic_semicolon_insertion() {
        let program = parse("let a = 1\nlet b = 2\na = b").unwrap();
        assert_eq!(program.items.len(), 3);
        assert!(parse("let a = 1 let b = 2").is_err());
    }

    #[test]
    fn test_parse_optional_chaining() {
        assert!(matches!(expr_of("a?.b;"), Expr::OptionalMember { .. }));
        assert!(matches!(expr_of("a?.[0];"), Expr::OptionalIndex { .. }));
        assert!(matches!(expr_of("a?.(1);"), Expr::OptionalCall { .. }));
        assert!(matches!(expr_of("a?.b.c;"), Expr::Member { .. }));
        assert!(matches!(expr_of("x ?? y;"), Expr::Binary { op: BinaryOp::NullishCoalesce, .. }));
    }

    #[test]
    fn test_parse_object_and_array_literals() {
        let program = parse(
            "const o = { a, b: 1, [k]: 2, 'q': 3, m() {}, get g() { return 1; }, ...rest, if: 4 };",
        )
        .unwrap();
        match first_init(&program) {
            Expr::Object(props) => {
                assert_eq!(props.len(), 8);
                assert!(matches!(props[0], ObjectProperty::Property { shorthand: true, .. }));
                assert!(matches!(
                    props[5],
                    ObjectProperty::Method { kind: MethodKind::Getter, .. }
                ));
                assert!(matches!(props[6], ObjectProperty::Spread(_)));
            }
            other => panic!("unexpected {:?}", other),
        }

        let program = parse("const arr = [1, , ...xs];").unwrap();
        match first_init(&program) {
            Expr::Array(elements) => {
                assert_eq!(elements.len(), 3);
                assert!(elements[1].is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_destructuring() {
        let program = parse("const { a, b: [c, d = 1], ...rest } = obj;").unwrap();
        match first_stmt(&program) {
            Stmt::Decl(decl) => assert_eq!(decl.bound_names(), vec!["a", "c", "d", "rest"]),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            expr_of("[a, b] = [b, a];"),
            Expr::Assignment { op: AssignmentOp::Assign, .. }
        ));
        assert!(parse("1 = 2;").is_err());
        assert!(parse("[a] += 1;").is_err());
    }

    #[test]
    fn test_parse_template_literal() {
        let source = "`sum: ${a + b} and ${`nested ${c}`}`;";
        match expr_of(source) {
            Expr::Template { parts, exprs } => {
                assert_eq!(parts, vec!["sum: ", " and ", ""]);
                assert_eq!(exprs.len(), 2);
                assert!(matches!(exprs[0].value, Expr::Binary { .. }));
                // Span of `a + b` points into the original source
                assert_eq!(&source[exprs[0].span.start..exprs[0].span.end], "a + b");
                assert!(matches!(exprs[1].value, Expr::Template { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_type_assertions() {
        assert!(matches!(expr_of("x as string;"), Expr::TypeCast { .. }));
        assert!(matches!(expr_of("x satisfies Shape;"), Expr::Satisfies { .. }));
        assert!(matches!(expr_of("value!.length;"), Expr::Member { .. }));
        let program = parse("const c = [1, 2] as const;").unwrap();
        assert!(matches!(first_init(&program), Expr::TypeCast { .. }));
    }

    #[test]
    fn test_parse_async_and_generators() {
        let program = parse("async function f() { await g(); }\nfunction* h() { yield 1; yield* other(); }").unwrap();
        assert_eq!(program.items.len(), 2);
        match first_stmt(&program) {
            Stmt::Decl(Decl::Function(func)) => assert!(func.is_async),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_declare_and_overloads_are_type_only() {
        let source = r#"
            declare const VERSION: string;
            declare function ext(a: number): void;
            function over(a: string): string;
            function over(a: any) { return a; }
        "#;
        let program = parse(source).unwrap();
        let type_only: Vec<bool> = program
            .items
            .iter()
            .map(|item| match &item.value {
                ModuleItem::Stmt(stmt) => match &stmt.value {
                    Stmt::Decl(decl) => decl.is_type_only(),
                    _ => false,
                },
                _ => false,
            })
            .collect();
        assert_eq!(type_only, vec![true, true, true, false]);
    }

    #[test]
    fn test_parse_errors_are_collected() {
        let errors = parse("let = ;\nlet ok = 1;\nfunction (").unwrap_err();
        assert!(errors.len() >= 2);
        assert!(errors[0].message.contains("Expected"));
    }

    #[test]
    fn test_unsupported_syntax_reports_error() {
        assert!(parse("const r = /ab+c/;").is_err());
        assert!(parse("import fs = require('fs');").is_err());
        assert!(parse("tag`hello`;").is_err());
    }

    #[test]
    fn test_lexer_errors_surface_as_parse_errors() {
        let errors = parse("let s = 'unterminated").unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_contextual_keywords_as_identifiers() {
        let program = parse("let type = 1, of = 2, from = 3, as = 4; type = of + from + as;").unwrap();
        assert_eq!(program.items.len(), 2);
    }

    #[test]
    fn test_import_declarations_in_blocks() {
        let program = parse(
            "if (ready) { import './inner'; }\nfunction load() { import { a } from './fn'; }",
        )
        .unwrap();
        match first_stmt(&program) {
            Stmt::If { then_stmt, .. } => match &then_stmt.value {
                Stmt::Block(block) => match &block.stmts[0].value {
                    Stmt::Import(import) => assert_eq!(import.source, "./inner"),
                    other => panic!("expected import, got {:?}", other),
                },
                other => panic!("expected block, got {:?}", other),
            },
            other => panic!("expected if, got {:?}", other),
        }
        // Still rejected below the top level
        assert!(parse("{ export const x = 1; }").is_err());
        // Dynamic import stays an expression
        assert!(matches!(first_stmt(&parse("{ import('./lazy'); }").unwrap()), Stmt::Block(_)));
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let depth = 3000;
        let source = format!("exports.v = {}1{};", "(".repeat(depth), ")".repeat(depth));
        let errors = parse(&source).unwrap_err();
        assert!(errors[0].message.contains("maximum depth"));

        let source = format!("let x = {}1;", "!".repeat(depth));
        assert!(parse(&source).is_err());

        let source = format!("{}{}", "{".repeat(depth), "}".repeat(depth));
        assert!(parse(&source).is_err());
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let source = format!("exports.v = {}1{};", "(".repeat(100), ")".repeat(100));
        assert!(parse(&source).is_ok());
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("Unexpected token", Span::new(3, 5, 0));
        assert_eq!(err.to_string(), "Parse error at 3..5: Unexpected token");
    }
}

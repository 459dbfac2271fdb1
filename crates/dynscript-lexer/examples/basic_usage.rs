use dynscript_lexer::{split_template, Lexer, TokenKind};

fn main() {
    println!("=== Example 1: Module with imports ===");
    let source = r#"
        import { add } from "./math";
        export const total: number = add(1, 2);
    "#;

    for token in Lexer::new(source).tokenize() {
        if token.kind != TokenKind::Eof {
            println!("{:?} at {:?} = '{}'", token.kind, token.span, token.value);
        }
    }

    println!("\n=== Example 2: Template literal ===");
    let source = "`Hello, ${user.name}! You have ${count + 1} messages`";
    let tokens = Lexer::new(source).tokenize();
    if let Ok(parts) = split_template(&tokens[0].value) {
        println!("text chunks: {:?}", parts.quasis);
        for sub in &parts.substitutions {
            println!("substitution at +{}: {}", sub.offset, sub.source);
        }
    }
}

//! Source-annotated error reports.

use std::ops::Range;

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use dynscript_lexer::{Token, TokenKind};
use dynscript_parser::ParseError;

use crate::error::LoaderError;

/// One labelled byte range in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: &'static str,
    pub title: &'static str,
    pub message: String,
    pub span: Range<usize>,
}

impl Diagnostic {
    fn clamped(mut self, len: usize) -> Self {
        self.span.start = self.span.start.min(len);
        self.span.end = self.span.end.clamp(self.span.start, len);
        self
    }
}

pub fn lexer_diagnostics(tokens: &[Token]) -> Vec<Diagnostic> {
    tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Error)
        .map(|token| Diagnostic {
            code: "E0001",
            title: "Lexical error",
            message: token.value.clone(),
            span: token.span.start..token.span.end,
        })
        .collect()
}

pub fn parse_diagnostics(errors: &[ParseError]) -> Vec<Diagnostic> {
    errors
        .iter()
        .map(|err| Diagnostic {
            code: "E1000",
            title: "Parse error",
            message: err.message.clone(),
            span: err.span.start..err.span.end,
        })
        .collect()
}

/// Renders every diagnostic against `source`. Spans are byte offsets.
pub fn render(diagnostics: &[Diagnostic], filename: &str, source: &str, color: bool) -> String {
    let mut out = Vec::new();
    for diagnostic in diagnostics {
        let diagnostic = diagnostic.clone().clamped(source.len());
        let span = (filename, diagnostic.span.clone());
        let written = Report::build(ReportKind::Error, span.clone())
            .with_config(
                Config::default()
                    .with_color(color)
                    .with_index_type(IndexType::Byte),
            )
            .with_code(diagnostic.code)
            .with_message(diagnostic.title)
            .with_label(
                Label::new(span)
                    .with_message(&diagnostic.message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut out);
        if written.is_err() {
            // fall back to the bare message
            out.extend_from_slice(format!("{}: {}\n", diagnostic.title, diagnostic.message).as_bytes());
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Renders the parse errors a loader error carries. The module source is
/// read again from disk; `None` when there is nothing to annotate.
pub fn render_loader_error(err: &LoaderError, color: bool) -> Option<String> {
    let (path, errors) = err.parse_errors()?;
    let source = std::fs::read_to_string(path.absolute_path()).ok()?;
    Some(render(
        &parse_diagnostics(errors),
        &path.to_string(),
        &source,
        color,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynscript_lexer::Lexer;

    #[test]
    fn test_lexer_diagnostics() {
        let tokens = Lexer::new("let s = 'open").tokenize();
        let diagnostics = lexer_diagnostics(&tokens);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "E0001");
        assert_eq!(diagnostics[0].span.start, 8);
    }

    #[test]
    fn test_render_mentions_code_and_message() {
        let errors = match dynscript_parser::parse_module("let = 1;", 0) {
            Err(errors) => errors,
            Ok(_) => panic!("expected a parse error"),
        };
        let rendered = render(&parse_diagnostics(&errors), "bad.ts", "let = 1;", false);
        assert!(rendered.contains("E1000"));
        assert!(rendered.contains("Parse error"));
        assert!(rendered.contains("bad.ts"));
        assert!(rendered.contains(&errors[0].message));
    }

    #[test]
    fn test_out_of_range_spans_are_clamped() {
        let diagnostic = Diagnostic {
            code: "E1000",
            title: "Parse error",
            message: "Unexpected end of input".to_string(),
            span: 40..45,
        };
        let rendered = render(&[diagnostic], "short.ts", "let x", false);
        assert!(rendered.contains("Unexpected end of input"));
    }
}

use dynscript_ast::Span;
use crate::token::{Token, TokenKind};

/// The lexer/tokenizer for TypeScript/JavaScript.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current_pos: usize,
    current_char: Option<char>,
    file_id: usize,
    /// Added to every span; used when re-lexing template substitutions.
    base_offset: usize,
    saw_newline: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer from source code.
    pub fn new(source: &'a str) -> Self {
        Self::with_file_id(source, 0)
    }

    /// Creates a new lexer with a specific file ID.
    pub fn with_file_id(source: &'a str, file_id: usize) -> Self {
        Self::with_offset(source, file_id, 0)
    }

    /// Creates a lexer for a fragment that starts at `base_offset` in its file.
    pub fn with_offset(source: &'a str, file_id: usize, base_offset: usize) -> Self {
        let mut chars = source.char_indices();
        let current_char = chars.next().map(|(_, c)| c);
        Self {
            source,
            chars,
            current_pos: 0,
            current_char,
            file_id,
            base_offset,
            saw_newline: false,
        }
    }

    /// Tokenizes the entire source code and returns all tokens.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Gets the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.saw_newline = false;
        if let Some(error_token) = self.skip_whitespace_and_comments() {
            return error_token;
        }
        let newline_before = self.saw_newline;

        let start = self.current_pos;

        let mut token = match self.current_char {
            None => self.emit(TokenKind::Eof, start, ""),
            Some(ch) => match ch {
                // String literals
                '"' | '\'' => self.read_string_literal(ch),
                '`' => self.read_template_literal(),

                // Numbers
                '0'..='9' => self.read_number(),

                // Identifiers and keywords
                'a'..='z' | 'A'..='Z' | '_' | '$' => self.read_identifier_or_keyword(),

                // Operators
                '+' => self.read_plus(),
                '-' => self.read_minus(),
                '*' => self.read_star(),
                '/' => self.read_slash(),
                '%' => self.read_with_eq(TokenKind::Percent, TokenKind::PercentEq),
                '^' => self.read_with_eq(TokenKind::Caret, TokenKind::CaretEq),
                '=' => self.read_eq(),
                '!' => self.read_bang(),
                '<' => self.read_lt(),
                '>' => self.read_gt(),
                '&' => self.read_amp(),
                '|' => self.read_pipe(),
                '?' => self.read_question(),
                '.' => self.read_dot(),

                // Single-character delimiters
                '~' => self.single(TokenKind::Tilde),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '{' => self.single(TokenKind::LBrace),
                '}' => self.single(TokenKind::RBrace),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                ';' => self.single(TokenKind::Semicolon),
                ',' => self.single(TokenKind::Comma),
                ':' => self.single(TokenKind::Colon),
                '@' => self.single(TokenKind::At),

                // Unicode identifiers
                _ if ch.is_alphabetic() => self.read_identifier_or_keyword(),

                _ => {
                    self.advance();
                    self.emit(
                        TokenKind::Error,
                        start,
                        format!("Unexpected character: {}", ch),
                    )
                }
            },
        };

        token.newline_before = newline_before;
        token
    }

    // Helper methods

    fn emit(&self, kind: TokenKind, start: usize, value: impl Into<String>) -> Token {
        Token::new(
            kind,
            Span::new(
                self.base_offset + start,
                self.base_offset + self.current_pos,
                self.file_id,
            ),
            value.into(),
        )
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let start = self.current_pos;
        let text = &self.source[start..start + self.current_char.map_or(0, char::len_utf8)];
        let text = text.to_string();
        self.advance();
        self.emit(kind, start, text)
    }

    /// Reads `op` or `op=` for single-character operators.
    fn read_with_eq(&mut self, plain: TokenKind, with_eq: TokenKind) -> Token {
        let start = self.current_pos;
        self.advance();
        if self.current_char == Some('=') {
            self.advance();
            self.emit(with_eq, start, &self.source[start..self.current_pos])
        } else {
            self.emit(plain, start, &self.source[start..self.current_pos])
        }
    }

    fn operator(&self, kind: TokenKind, start: usize) -> Token {
        self.emit(kind, start, &self.source[start..self.current_pos])
    }

    fn advance(&mut self) {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos;
            self.current_char = Some(ch);
        } else {
            self.current_pos = self.source.len();
            self.current_char = None;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next().map(|(_, c)| c)
    }

    fn skip_whitespace_and_comments(&mut self) -> Option<Token> {
        loop {
            match self.current_char {
                Some(ch) if ch.is_whitespace() => {
                    if ch == '\n' || ch == '\u{2028}' || ch == '\u{2029}' {
                        self.saw_newline = true;
                    }
                    self.advance();
                }
                Some('/') => {
                    if self.peek() == Some('/') {
                        self.skip_single_line_comment();
                    } else if self.peek() == Some('*') {
                        let start = self.current_pos;
                        if !self.skip_multi_line_comment() {
                            return Some(self.emit(
                                TokenKind::Error,
                                start,
                                "Unterminated multi-line comment",
                            ));
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        None
    }

    fn skip_single_line_comment(&mut self) {
        // Skip //
        self.advance();
        self.advance();

        while let Some(ch) = self.current_char {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_multi_line_comment(&mut self) -> bool {
        // Skip /*
        self.advance();
        self.advance();

        while let Some(ch) = self.current_char {
            if ch == '*' && self.peek() == Some('/') {
                self.advance(); // *
                self.advance(); // /
                return true;
            }
            if ch == '\n' {
                self.saw_newline = true;
            }
            self.advance();
        }
        false // Unterminated
    }

    fn read_string_literal(&mut self, quote: char) -> Token {
        let start = self.current_pos;
        self.advance(); // Skip opening quote

        let mut value = String::new();

        while let Some(ch) = self.current_char {
            if ch == quote {
                self.advance(); // Skip closing quote
                return self.emit(TokenKind::StringLiteral, start, value);
            } else if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    match escaped {
                        'u' => {
                            self.advance();
                            value.push(self.read_unicode_escape());
                        }
                        'x' => {
                            self.advance();
                            value.push(self.read_hex_escape());
                        }
                        // Line continuation
                        '\n' => self.advance(),
                        '\r' => {
                            self.advance();
                            if self.current_char == Some('\n') {
                                self.advance();
                            }
                        }
                        _ => {
                            value.push(crate::template::simple_escape(escaped));
                            self.advance();
                        }
                    }
                }
            } else if ch == '\n' {
                return self.emit(TokenKind::Error, start, "Unterminated string literal");
            } else {
                value.push(ch);
                self.advance();
            }
        }

        self.emit(TokenKind::Error, start, "Unterminated string literal")
    }

    fn read_unicode_escape(&mut self) -> char {
        // \u{1F600}
        if self.current_char == Some('{') {
            self.advance();
            let mut code = 0u32;
            while let Some(ch) = self.current_char {
                if ch == '}' {
                    self.advance();
                    break;
                }
                match ch.to_digit(16) {
                    Some(digit) => {
                        code = code.saturating_mul(16).saturating_add(digit);
                        self.advance();
                    }
                    None => break,
                }
            }
            return char::from_u32(code).unwrap_or('\u{FFFD}');
        }

        let mut code = 0u32;
        for _ in 0..4 {
            if let Some(digit) = self.current_char.and_then(|c| c.to_digit(16)) {
                code = code * 16 + digit;
                self.advance();
            } else {
                break;
            }
        }
        char::from_u32(code).unwrap_or('\u{FFFD}')
    }

    fn read_hex_escape(&mut self) -> char {
        let mut code = 0u32;
        for _ in 0..2 {
            if let Some(digit) = self.current_char.and_then(|c| c.to_digit(16)) {
                code = code * 16 + digit;
                self.advance();
            } else {
                break;
            }
        }
        char::from_u32(code).unwrap_or('\u{FFFD}')
    }

    /// Reads a template literal. The token value is the raw body; cooking
    /// and substitution splitting happen in [`crate::template`].
    fn read_template_literal(&mut self) -> Token {
        let start = self.current_pos;
        self.advance(); // Skip opening backtick

        let mut raw = String::new();
        if self.scan_template_body(&mut raw) {
            self.emit(TokenKind::TemplateLiteral, start, raw)
        } else {
            self.emit(TokenKind::Error, start, "Unterminated template literal")
        }
    }

    /// Consumes up to and including the closing backtick, appending the raw
    /// text (without the closing backtick) to `out`.
    fn scan_template_body(&mut self, out: &mut String) -> bool {
        while let Some(ch) = self.current_char {
            match ch {
                '`' => {
                    self.advance();
                    return true;
                }
                '\\' => {
                    out.push(ch);
                    self.advance();
                    if let Some(escaped) = self.current_char {
                        out.push(escaped);
                        self.advance();
                    }
                }
                '$' if self.peek() == Some('{') => {
                    out.push_str("${");
                    self.advance();
                    self.advance();
                    if !self.scan_substitution(out) {
                        return false;
                    }
                }
                _ => {
                    out.push(ch);
                    self.advance();
                }
            }
        }
        false
    }

    /// Consumes a `${ ... }` substitution body including the closing brace.
    fn scan_substitution(&mut self, out: &mut String) -> bool {
        let mut depth = 1usize;
        while let Some(ch) = self.current_char {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        out.push('}');
                        self.advance();
                        return true;
                    }
                }
                '\'' | '"' => {
                    out.push(ch);
                    self.advance();
                    while let Some(inner) = self.current_char {
                        out.push(inner);
                        self.advance();
                        if inner == '\\' {
                            if let Some(escaped) = self.current_char {
                                out.push(escaped);
                                self.advance();
                            }
                        } else if inner == ch {
                            break;
                        }
                    }
                    continue;
                }
                '`' => {
                    out.push('`');
                    self.advance();
                    if !self.scan_template_body(out) {
                        return false;
                    }
                    out.push('`');
                    continue;
                }
                _ => {}
            }
            out.push(ch);
            self.advance();
        }
        false
    }

    fn read_digits(&mut self, value: &mut String, accept: impl Fn(char) -> bool) {
        while let Some(ch) = self.current_char {
            if accept(ch) {
                value.push(ch);
                self.advance();
            } else if ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let start = self.current_pos;

        // Check for special number formats
        if self.current_char == Some('0') {
            let radix = match self.peek() {
                Some('x') | Some('X') => Some(("0x", 16)),
                Some('o') | Some('O') => Some(("0o", 8)),
                Some('b') | Some('B') => Some(("0b", 2)),
                _ => None,
            };
            if let Some((prefix, radix)) = radix {
                let mut value = String::from(prefix);
                self.advance(); // 0
                self.advance(); // x / o / b
                self.read_digits(&mut value, |c| c.is_digit(radix));
                return self.emit(TokenKind::NumberLiteral, start, value);
            }
        }

        let mut value = String::new();
        self.read_digits(&mut value, |c| c.is_ascii_digit());

        // Decimal point; `1.toString()` is not valid JS so a trailing dot is kept
        if self.current_char == Some('.') && self.peek().map_or(true, |c| c != '.') {
            let next_is_ident = self.peek().map_or(false, |c| c.is_alphabetic() && c != 'e' && c != 'E');
            if !next_is_ident {
                value.push('.');
                self.advance();
                self.read_digits(&mut value, |c| c.is_ascii_digit());
            }
        }

        self.read_exponent(&mut value);

        // BigInt suffix
        if self.current_char == Some('n') {
            self.advance();
            return self.emit(TokenKind::BigIntLiteral, start, value);
        }

        self.emit(TokenKind::NumberLiteral, start, value)
    }

    fn read_exponent(&mut self, value: &mut String) {
        if matches!(self.current_char, Some('e') | Some('E')) {
            value.push('e');
            self.advance();

            if let Some(sign @ ('+' | '-')) = self.current_char {
                value.push(sign);
                self.advance();
            }

            self.read_digits(value, |c| c.is_ascii_digit());
        }
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let start = self.current_pos;
        let mut value = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = TokenKind::keyword(&value).unwrap_or(TokenKind::Identifier);
        self.emit(kind, start, value)
    }

    fn read_plus(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        let kind = match self.current_char {
            Some('+') => {
                self.advance();
                TokenKind::PlusPlus
            }
            Some('=') => {
                self.advance();
                TokenKind::PlusEq
            }
            _ => TokenKind::Plus,
        };
        self.operator(kind, start)
    }

    fn read_minus(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        let kind = match self.current_char {
            Some('-') => {
                self.advance();
                TokenKind::MinusMinus
            }
            Some('=') => {
                self.advance();
                TokenKind::MinusEq
            }
            _ => TokenKind::Minus,
        };
        self.operator(kind, start)
    }

    fn read_star(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        let kind = match self.current_char {
            Some('*') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    TokenKind::StarStarEq
                } else {
                    TokenKind::StarStar
                }
            }
            Some('=') => {
                self.advance();
                TokenKind::StarEq
            }
            _ => TokenKind::Star,
        };
        self.operator(kind, start)
    }

    /// Regular-expression literals are not supported; `/` is always division.
    fn read_slash(&mut self) -> Token {
        self.read_with_eq(TokenKind::Slash, TokenKind::SlashEq)
    }

    fn read_eq(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        let kind = match self.current_char {
            Some('=') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    TokenKind::EqEqEq
                } else {
                    TokenKind::EqEq
                }
            }
            Some('>') => {
                self.advance();
                TokenKind::FatArrow
            }
            _ => TokenKind::Eq,
        };
        self.operator(kind, start)
    }

    fn read_bang(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        let kind = match self.current_char {
            Some('=') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    TokenKind::BangEqEq
                } else {
                    TokenKind::BangEq
                }
            }
            _ => TokenKind::Bang,
        };
        self.operator(kind, start)
    }

    fn read_lt(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        let kind = match self.current_char {
            Some('<') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    TokenKind::LtLtEq
                } else {
                    TokenKind::LtLt
                }
            }
            Some('=') => {
                self.advance();
                TokenKind::LtEq
            }
            _ => TokenKind::Lt,
        };
        self.operator(kind, start)
    }

    fn read_gt(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        let kind = match self.current_char {
            Some('>') => {
                self.advance();
                match self.current_char {
                    Some('>') => {
                        self.advance();
                        if self.current_char == Some('=') {
                            self.advance();
                            TokenKind::GtGtGtEq
                        } else {
                            TokenKind::GtGtGt
                        }
                    }
                    Some('=') => {
                        self.advance();
                        TokenKind::GtGtEq
                    }
                    _ => TokenKind::GtGt,
                }
            }
            Some('=') => {
                self.advance();
                TokenKind::GtEq
            }
            _ => TokenKind::Gt,
        };
        self.operator(kind, start)
    }

    fn read_amp(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        let kind = match self.current_char {
            Some('&') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    TokenKind::AmpAmpEq
                } else {
                    TokenKind::AmpAmp
                }
            }
            Some('=') => {
                self.advance();
                TokenKind::AmpEq
            }
            _ => TokenKind::Amp,
        };
        self.operator(kind, start)
    }

    fn read_pipe(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        let kind = match self.current_char {
            Some('|') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    TokenKind::PipePipeEq
                } else {
                    TokenKind::PipePipe
                }
            }
            Some('=') => {
                self.advance();
                TokenKind::PipeEq
            }
            _ => TokenKind::Pipe,
        };
        self.operator(kind, start)
    }

    fn read_question(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        let kind = match self.current_char {
            Some('?') => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    TokenKind::QuestionQuestionEq
                } else {
                    TokenKind::QuestionQuestion
                }
            }
            // `a?.5:b` is a conditional, not optional chaining
            Some('.') if !self.peek().map_or(false, |c| c.is_ascii_digit()) => {
                self.advance();
                TokenKind::QuestionDot
            }
            _ => TokenKind::Question,
        };
        self.operator(kind, start)
    }

    fn read_dot(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        if self.current_char == Some('.') && self.peek() == Some('.') {
            self.advance();
            self.advance();
            self.operator(TokenKind::DotDotDot, start)
        } else if self.current_char.map_or(false, |c| c.is_ascii_digit()) {
            // Number starting with dot (e.g., .5)
            let mut value = String::from("0.");
            self.read_digits(&mut value, |c| c.is_ascii_digit());
            self.read_exponent(&mut value);
            self.emit(TokenKind::NumberLiteral, start, value)
        } else {
            self.operator(TokenKind::Dot, start)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords() {
        let source = "let const var function return if else delete";
        let tokens = Lexer::new(source).tokenize();

        assert_eq!(tokens[0].kind, TokenKind::Let);
        assert_eq!(tokens[1].kind, TokenKind::Const);
        assert_eq!(tokens[2].kind, TokenKind::Var);
        assert_eq!(tokens[3].kind, TokenKind::Function);
        assert_eq!(tokens[4].kind, TokenKind::Return);
        assert_eq!(tokens[5].kind, TokenKind::If);
        assert_eq!(tokens[6].kind, TokenKind::Else);
        assert_eq!(tokens[7].kind, TokenKind::Delete);
    }

    #[test]
    fn test_contextual_keywords_are_identifiers() {
        let source = "type from as of async namespace declare satisfies undefined";
        let tokens = Lexer::new(source).tokenize();

        for token in &tokens[..tokens.len() - 1] {
            assert_eq!(token.kind, TokenKind::Identifier, "{}", token.value);
        }
    }

    #[test]
    fn test_numbers() {
        let source = "123 45.67 0x1A 0o77 0b1010 1_000_000 .5 2e3";
        let tokens = Lexer::new(source).tokenize();
        let values: Vec<f64> = tokens[..8]
            .iter()
            .map(|t| t.number_value().unwrap_or(f64::NAN))
            .collect();

        assert_eq!(values, vec![123.0, 45.67, 26.0, 63.0, 10.0, 1_000_000.0, 0.5, 2000.0]);
        assert_eq!(tokens[5].value, "1000000");
    }

    #[test]
    fn test_strings() {
        let source = r#""hello" 'wor\'ld' "tab\there" "A\x42\u{43}""#;
        let tokens = Lexer::new(source).tokenize();

        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].value, "hello");
        assert_eq!(tokens[1].value, "wor'ld");
        assert_eq!(tokens[2].value, "tab\there");
        assert_eq!(tokens[3].value, "ABC");
    }

    #[test]
    fn test_template_keeps_raw_body_with_nesting() {
        let source = "`a ${ {b: `x${y}`}.b } c`";
        let tokens = Lexer::new(source).tokenize();

        assert_eq!(tokens[0].kind, TokenKind::TemplateLiteral);
        assert_eq!(tokens[0].value, "a ${ {b: `x${y}`}.b } c");
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn test_unterminated_template() {
        let tokens = Lexer::new("`abc ${x").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].value, "Unterminated template literal");
    }

    #[test]
    fn test_operators() {
        let source = "+ - * / % ** += -= === !== <= >= && || ?? ?. ??= => ...";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::StarStar,
                TokenKind::PlusEq,
                TokenKind::MinusEq,
                TokenKind::EqEqEq,
                TokenKind::BangEqEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::QuestionQuestion,
                TokenKind::QuestionDot,
                TokenKind::QuestionQuestionEq,
                TokenKind::FatArrow,
                TokenKind::DotDotDot,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_conditional_with_decimal_is_not_optional_chain() {
        assert_eq!(
            kinds("a?.5:b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Question,
                TokenKind::NumberLiteral,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        let source = "let x = 5; // trailing\n/* block\n */ const y = 10;";
        let tokens = Lexer::new(source).tokenize();

        assert_eq!(tokens[0].kind, TokenKind::Let);
        assert!(!tokens[0].newline_before);
        assert_eq!(tokens[5].kind, TokenKind::Const);
        assert!(tokens[5].newline_before);
        assert!(!tokens[6].newline_before);
    }

    #[test]
    fn test_unterminated_comment() {
        let tokens = Lexer::new("/* never closed").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
    }

    #[test]
    fn test_offset_spans() {
        let tokens = Lexer::with_offset("ab + c", 3, 10).tokenize();
        assert_eq!(tokens[0].span, Span::new(10, 12, 3));
        assert_eq!(tokens[2].span, Span::new(15, 16, 3));
    }

    #[test]
    fn test_compound_assignment_operators() {
        let source = "<<= >>= >>>= &= |= ^= &&= ||=";
        let tokens = Lexer::new(source).tokenize();
        let values: Vec<&str> = tokens[..8].iter().map(|t| t.value.as_str()).collect();

        assert_eq!(values, vec!["<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=", "||="]);
        assert_eq!(tokens[2].kind, TokenKind::GtGtGtEq);
    }
}

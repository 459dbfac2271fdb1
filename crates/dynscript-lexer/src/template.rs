//! Template literal splitting.
//!
//! The lexer keeps a template's raw body as a single token. This module
//! splits that body into cooked text chunks and the source of each `${}`
//! substitution so the parser can lex and parse them separately.

/// A template body split into text and substitutions.
///
/// `quasis.len() == substitutions.len() + 1` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateParts {
    pub quasis: Vec<String>,
    pub substitutions: Vec<Substitution>,
}

/// Source text of one `${ ... }` substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub source: String,
    /// Byte offset of `source` within the raw template body.
    pub offset: usize,
}

/// Cooked value of a single-character escape sequence.
pub(crate) fn simple_escape(escaped: char) -> char {
    match escaped {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'v' => '\u{b}',
        '0' => '\0',
        other => other,
    }
}

/// Splits a raw template body (as stored in a `TemplateLiteral` token).
pub fn split_template(raw: &str) -> Result<TemplateParts, String> {
    let bytes: Vec<(usize, char)> = raw.char_indices().collect();
    let mut quasis = Vec::new();
    let mut substitutions = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < bytes.len() {
        let (_, ch) = bytes[i];
        match ch {
            '\\' => {
                i += 1;
                let Some(&(_, escaped)) = bytes.get(i) else {
                    return Err("Trailing backslash in template literal".to_string());
                };
                match escaped {
                    'u' => {
                        let (ch, next) = cook_unicode(&bytes, i + 1);
                        current.push(ch);
                        i = next;
                        continue;
                    }
                    'x' => {
                        let (ch, next) = cook_hex(&bytes, i + 1, 2);
                        current.push(ch);
                        i = next;
                        continue;
                    }
                    '\n' => {}
                    _ => current.push(simple_escape(escaped)),
                }
                i += 1;
            }
            '$' if matches!(bytes.get(i + 1), Some((_, '{'))) => {
                let start = i + 2;
                let end = find_substitution_end(&bytes, start)
                    .ok_or_else(|| "Unterminated template substitution".to_string())?;
                let start_byte = byte_at(&bytes, start, raw.len());
                let end_byte = byte_at(&bytes, end, raw.len());
                quasis.push(std::mem::take(&mut current));
                substitutions.push(Substitution {
                    source: raw[start_byte..end_byte].to_string(),
                    offset: start_byte,
                });
                i = end + 1;
            }
            // Line terminators inside templates are normalised to \n
            '\r' => {
                current.push('\n');
                if matches!(bytes.get(i + 1), Some((_, '\n'))) {
                    i += 1;
                }
                i += 1;
            }
            _ => {
                current.push(ch);
                i += 1;
            }
        }
    }

    quasis.push(current);
    Ok(TemplateParts {
        quasis,
        substitutions,
    })
}

fn byte_at(chars: &[(usize, char)], index: usize, len: usize) -> usize {
    chars.get(index).map_or(len, |(pos, _)| *pos)
}

fn cook_hex(chars: &[(usize, char)], mut i: usize, digits: usize) -> (char, usize) {
    let mut code = 0u32;
    for _ in 0..digits {
        match chars.get(i).and_then(|(_, c)| c.to_digit(16)) {
            Some(d) => {
                code = code * 16 + d;
                i += 1;
            }
            None => break,
        }
    }
    (char::from_u32(code).unwrap_or('\u{FFFD}'), i)
}

fn cook_unicode(chars: &[(usize, char)], i: usize) -> (char, usize) {
    if matches!(chars.get(i), Some((_, '{'))) {
        let mut j = i + 1;
        let mut code = 0u32;
        while let Some(d) = chars.get(j).and_then(|(_, c)| c.to_digit(16)) {
            code = code.saturating_mul(16).saturating_add(d);
            j += 1;
        }
        if matches!(chars.get(j), Some((_, '}'))) {
            j += 1;
        }
        return (char::from_u32(code).unwrap_or('\u{FFFD}'), j);
    }
    cook_hex(chars, i, 4)
}

/// Index of the `}` closing a substitution that starts at `start`.
fn find_substitution_end(chars: &[(usize, char)], start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = start;
    while i < chars.len() {
        match chars[i].1 {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            quote @ ('\'' | '"') => {
                i += 1;
                while i < chars.len() && chars[i].1 != quote {
                    if chars[i].1 == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            '`' => {
                i = skip_nested_template(chars, i + 1)?;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Returns the index of the backtick closing a nested template.
fn skip_nested_template(chars: &[(usize, char)], mut i: usize) -> Option<usize> {
    while i < chars.len() {
        match chars[i].1 {
            '`' => return Some(i),
            '\\' => i += 1,
            '$' if matches!(chars.get(i + 1), Some((_, '{'))) => {
                i = find_substitution_end(chars, i + 2)?;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

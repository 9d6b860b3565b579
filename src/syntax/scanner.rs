//! Lexer for Go source text.
//!
//! Produces just enough token structure to find the package clause, import
//! declarations, top-level function declarations and comments. Every token
//! carries its byte span in the original text so edits can be applied without
//! reprinting the file.

use std::ops::Range;

/// Kind of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Ident,
    /// Interpreted (`"..."`) or raw (`` `...` ``) string literal.
    String,
    /// Rune literal.
    Rune,
    /// Numeric literal.
    Number,
    /// Any other single character.
    Punct(char),
}

/// A token with its byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

/// A comment with its byte span. The text includes the `//` or `/* */` markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub span: Range<usize>,
}

/// Lexing failure with the byte offset at which it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub offset: usize,
    pub message: String,
}

/// Result of scanning a whole file.
#[derive(Debug, Default)]
pub struct Scanned {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
}

/// Scan `src` into tokens and comments.
pub fn scan(src: &str) -> Result<Scanned, ScanError> {
    let mut out = Scanned::default();
    let bytes = src.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => pos += 1,
            b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                let end = src[pos..].find('\n').map_or(src.len(), |i| pos + i);
                out.comments.push(Comment { span: pos..end });
                pos = end;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                let end = src[pos + 2..]
                    .find("*/")
                    .map(|i| pos + 2 + i + 2)
                    .ok_or_else(|| ScanError {
                        offset: pos,
                        message: "comment not terminated".to_string(),
                    })?;
                out.comments.push(Comment { span: pos..end });
                pos = end;
            }
            b'"' => {
                let end = scan_quoted(src, pos, b'"', "string literal not terminated")?;
                out.tokens.push(Token {
                    kind: TokenKind::String,
                    span: pos..end,
                });
                pos = end;
            }
            b'\'' => {
                let end = scan_quoted(src, pos, b'\'', "rune literal not terminated")?;
                out.tokens.push(Token {
                    kind: TokenKind::Rune,
                    span: pos..end,
                });
                pos = end;
            }
            b'`' => {
                let end = src[pos + 1..]
                    .find('`')
                    .map(|i| pos + 1 + i + 1)
                    .ok_or_else(|| ScanError {
                        offset: pos,
                        message: "raw string literal not terminated".to_string(),
                    })?;
                out.tokens.push(Token {
                    kind: TokenKind::String,
                    span: pos..end,
                });
                pos = end;
            }
            b'0'..=b'9' => {
                let end = scan_number(bytes, pos);
                out.tokens.push(Token {
                    kind: TokenKind::Number,
                    span: pos..end,
                });
                pos = end;
            }
            b'.' if bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                let end = scan_number(bytes, pos);
                out.tokens.push(Token {
                    kind: TokenKind::Number,
                    span: pos..end,
                });
                pos = end;
            }
            _ => {
                // Multi-byte characters are only valid inside identifiers.
                let ch = src[pos..].chars().next().unwrap_or('\0');
                if is_ident_start(ch) {
                    let end = src[pos..]
                        .char_indices()
                        .find(|&(_, c)| !is_ident_continue(c))
                        .map_or(src.len(), |(i, _)| pos + i);
                    out.tokens.push(Token {
                        kind: TokenKind::Ident,
                        span: pos..end,
                    });
                    pos = end;
                } else {
                    out.tokens.push(Token {
                        kind: TokenKind::Punct(ch),
                        span: pos..pos + ch.len_utf8(),
                    });
                    pos += ch.len_utf8();
                }
            }
        }
    }

    Ok(out)
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Scan an interpreted string or rune literal starting at `start`; returns the
/// offset just past the closing quote.
fn scan_quoted(src: &str, start: usize, quote: u8, message: &str) -> Result<usize, ScanError> {
    let bytes = src.as_bytes();
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'\n' => break,
            b if b == quote => return Ok(pos + 1),
            _ => pos += 1,
        }
    }
    Err(ScanError {
        offset: start,
        message: message.to_string(),
    })
}

fn scan_number(bytes: &[u8], start: usize) -> usize {
    let mut pos = start;
    while pos < bytes.len() {
        let b = bytes[pos];
        if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' {
            pos += 1;
        } else if (b == b'+' || b == b'-')
            && pos > start
            && matches!(bytes[pos - 1], b'e' | b'E' | b'p' | b'P')
            && !is_hex_literal(bytes, start, pos)
        {
            pos += 1;
        } else {
            break;
        }
    }
    pos
}

// In a hex literal without a `p` exponent, `e`/`E` is a digit.
fn is_hex_literal(bytes: &[u8], start: usize, pos: usize) -> bool {
    let literal = &bytes[start..pos];
    literal.len() > 2
        && literal[0] == b'0'
        && matches!(literal[1], b'x' | b'X')
        && matches!(bytes[pos - 1], b'e' | b'E')
}

/// Decode the value of a Go string literal token.
///
/// Handles raw strings and the escapes that can appear in import paths.
pub fn unquote(literal: &str) -> Option<String> {
    if let Some(raw) = literal.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
        return Some(raw.replace('\r', ""));
    }
    let inner = literal.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            'x' => out.push(hex_char(&mut chars, 2)?),
            'u' => out.push(hex_char(&mut chars, 4)?),
            'U' => out.push(hex_char(&mut chars, 8)?),
            _ => return None,
        }
    }
    Some(out)
}

fn hex_char(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<char> {
    let mut value = 0u32;
    for _ in 0..digits {
        value = value * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(value)
}

/// Encode `value` as an interpreted Go string literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

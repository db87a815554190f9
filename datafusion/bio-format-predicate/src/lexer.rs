//! Lexical tokens of the host dataframe library's expression rendering.
//!
//! The classifier matches productions against the tokens at nesting depth zero,
//! so an `&` or `==` buried inside a parenthesised operand never influences how
//! the enclosing fragment is classified.

use crate::node::CompareOp;

/// A lexical token borrowed from the rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    /// `(` or `[`
    Open(char),
    /// `)` or `]`
    Close(char),
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `:`
    Colon,
    /// `~`, prefix negation
    Tilde,
    /// `&`, conjunction
    Amp,
    /// `|`, disjunction
    Pipe,
    /// One of the six comparison operators
    Compare(CompareOp),
    /// Identifier such as `col`, `is_in` or `dyn`
    Ident(&'a str),
    /// Numeric literal, optionally signed
    Number(&'a str),
    /// Quoted literal, quotes included
    Str(&'a str),
    /// Anything else
    Other(char),
}

/// A token with its byte span and nesting depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spanned<'a> {
    /// The token
    pub token: Token<'a>,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// Nesting depth outside the token; an opening and its closing delimiter share a depth
    pub depth: usize,
}

/// Splits a rendering into tokens. Never fails: unknown characters become [`Token::Other`]
/// and an unterminated quote runs to the end of the input.
pub fn tokenize(input: &str) -> Vec<Spanned<'_>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;
        let byte = bytes[pos];
        let token_depth = depth;

        let token = match byte {
            b if b.is_ascii_whitespace() => {
                pos += 1;
                continue;
            }
            b'(' | b'[' => {
                pos += 1;
                depth += 1;
                Token::Open(byte as char)
            }
            b')' | b']' => {
                pos += 1;
                depth = depth.saturating_sub(1);
                tokens.push(Spanned {
                    token: Token::Close(byte as char),
                    start,
                    end: pos,
                    depth,
                });
                continue;
            }
            b',' => {
                pos += 1;
                Token::Comma
            }
            b'.' => {
                pos += 1;
                Token::Dot
            }
            b':' => {
                pos += 1;
                Token::Colon
            }
            b'~' => {
                pos += 1;
                Token::Tilde
            }
            b'&' => {
                pos += 1;
                Token::Amp
            }
            b'|' => {
                pos += 1;
                Token::Pipe
            }
            b'"' | b'\'' => {
                pos = quoted_end(bytes, pos);
                Token::Str(&input[start..pos])
            }
            b'=' | b'!' | b'<' | b'>' => {
                // two-character operators win over their one-character prefixes
                let paired = bytes.get(pos + 1) == Some(&b'=');
                let op = match (byte, paired) {
                    (b'=', true) => Some(CompareOp::Eq),
                    (b'!', true) => Some(CompareOp::NotEq),
                    (b'<', true) => Some(CompareOp::LtEq),
                    (b'>', true) => Some(CompareOp::GtEq),
                    (b'<', false) => Some(CompareOp::Lt),
                    (b'>', false) => Some(CompareOp::Gt),
                    _ => None,
                };
                match op {
                    Some(op) => {
                        pos += if paired { 2 } else { 1 };
                        Token::Compare(op)
                    }
                    None => {
                        pos += 1;
                        Token::Other(byte as char)
                    }
                }
            }
            b'-' if bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                pos = number_end(bytes, pos + 1);
                Token::Number(&input[start..pos])
            }
            b if b.is_ascii_digit() => {
                pos = number_end(bytes, pos);
                Token::Number(&input[start..pos])
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                Token::Ident(&input[start..pos])
            }
            _ => {
                let ch = input[start..].chars().next().unwrap_or('\u{fffd}');
                pos += ch.len_utf8();
                Token::Other(ch)
            }
        };

        tokens.push(Spanned {
            token,
            start,
            end: pos,
            depth: token_depth,
        });
    }

    tokens
}

/// Tokens at nesting depth zero, in order.
pub fn top_level<'a>(tokens: &[Spanned<'a>]) -> Vec<Spanned<'a>> {
    tokens.iter().copied().filter(|t| t.depth == 0).collect()
}

/// Whether every `)` or `]` closes an earlier `(` or `[` and nothing is left open.
///
/// Depths in [`Spanned`] saturate at zero, so an unbalanced rendering would
/// otherwise expose tokens at depth zero that belong to a nested group.
pub fn is_balanced(tokens: &[Spanned<'_>]) -> bool {
    let mut open = 0usize;
    for token in tokens {
        match token.token {
            Token::Open(_) => open += 1,
            Token::Close(_) => match open.checked_sub(1) {
                Some(depth) => open = depth,
                None => return false,
            },
            _ => {}
        }
    }
    open == 0
}

fn quoted_end(bytes: &[u8], open: usize) -> usize {
    let quote = bytes[open];
    let mut pos = open + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b if b == quote => return pos + 1,
            _ => pos += 1,
        }
    }
    bytes.len()
}

fn number_end(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && (bytes[pos].is_ascii_digit() || matches!(bytes[pos], b'.' | b'_')) {
        pos += 1;
    }
    if pos < bytes.len() && matches!(bytes[pos], b'e' | b'E') {
        let exponent = match bytes.get(pos + 1) {
            Some(b'+' | b'-') => pos + 2,
            _ => pos + 1,
        };
        if bytes.get(exponent).is_some_and(u8::is_ascii_digit) {
            pos = exponent;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }
    pos
}

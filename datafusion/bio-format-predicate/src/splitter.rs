//! Nesting-aware splitting of rendered expressions.
//!
//! Depth is tracked over `(`/`)` and `[`/`]`; quoted literals are skipped so an
//! operator inside a string value never splits. Returned parts are slices of the
//! input with their parentheses preserved, so each one can be classified again.

/// Iterates the bytes of a rendering that lie outside quoted literals, together
/// with the nesting depth in effect before each byte.
struct StructuralBytes<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: i32,
    quote: Option<u8>,
}

impl<'a> StructuralBytes<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
            depth: 0,
            quote: None,
        }
    }
}

impl Iterator for StructuralBytes<'_> {
    type Item = (usize, u8, i32);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.bytes.len() {
            let idx = self.pos;
            let byte = self.bytes[idx];
            self.pos += 1;

            if let Some(quote) = self.quote {
                if byte == b'\\' {
                    self.pos += 1;
                } else if byte == quote {
                    self.quote = None;
                }
                continue;
            }

            let depth = self.depth;
            match byte {
                b'"' | b'\'' => {
                    self.quote = Some(byte);
                    continue;
                }
                b'(' | b'[' => self.depth += 1,
                b')' | b']' => self.depth -= 1,
                _ => {}
            }
            return Some((idx, byte, depth));
        }
        None
    }
}

/// Splits `input` on every occurrence of `operator` at nesting depth zero.
///
/// Parts are returned untrimmed and in order; an input without a top-level
/// occurrence comes back as a single part.
pub fn split_top_level<'a>(input: &'a str, operator: &str) -> Vec<&'a str> {
    if operator.is_empty() {
        return vec![input];
    }

    let bytes = input.as_bytes();
    let needle = operator.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;

    for (idx, _, depth) in StructuralBytes::new(input) {
        // skip the tail of an operator that was just consumed
        if idx < start || depth != 0 {
            continue;
        }
        if bytes[idx..].starts_with(needle) {
            parts.push(&input[start..idx]);
            start = idx + needle.len();
        }
    }

    parts.push(&input[start..]);
    parts
}

/// Index of the delimiter closing the one opened at `open`, if any.
pub(crate) fn matching_close(input: &str, open: usize) -> Option<usize> {
    let mut scan = StructuralBytes::new(input);
    let (idx, byte, base) = scan.find(|(idx, _, _)| *idx >= open)?;
    if idx != open || !matches!(byte, b'(' | b'[') {
        return None;
    }
    scan.find(|(_, byte, depth)| matches!(*byte, b')' | b']') && *depth == base + 1)
        .map(|(idx, _, _)| idx)
}

/// Removes every layer of `(...)` or `[...]` that encloses the whole input.
///
/// `[(col("a")) == ("x")]` loses its brackets, while `(col("a")) == ("x")` is left
/// alone because its first parenthesis closes before the end.
pub fn strip_enclosing(input: &str) -> &str {
    let mut text = input.trim();
    while let Some(inner) = enclosed_body(text) {
        text = inner.trim();
    }
    text
}

fn enclosed_body(text: &str) -> Option<&str> {
    let last = text.len().checked_sub(1)?;
    if last == 0 {
        return None;
    }
    (matching_close(text, 0)? == last).then(|| &text[1..last])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_preserves_parentheses() {
        let parts = split_top_level("(x > 1) & (y.is_in([(a & b)]))", " & ");
        assert_eq!(parts, vec!["(x > 1)", "(y.is_in([(a & b)]))"]);
    }

    #[test]
    fn test_split_without_operator_returns_input() {
        assert_eq!(split_top_level("col(\"a\") > 1", "&"), vec!["col(\"a\") > 1"]);
    }

    #[test]
    fn test_split_ignores_operator_inside_quotes() {
        let parts = split_top_level(r#"a == "x & y" & b"#, "&");
        assert_eq!(parts, vec![r#"a == "x & y" "#, " b"]);
    }

    #[test]
    fn test_split_on_multi_character_operator() {
        let parts = split_top_level("a AND (b AND c) AND d", " AND ");
        assert_eq!(parts, vec!["a", "(b AND c)", "d"]);
    }

    #[test]
    fn test_split_trailing_operator_yields_empty_part() {
        assert_eq!(split_top_level("a & ", "&"), vec!["a ", " "]);
    }

    #[test]
    fn test_split_brackets_count_as_nesting() {
        let parts = split_top_level("[a & b] & c", "&");
        assert_eq!(parts, vec!["[a & b] ", " c"]);
    }

    #[test]
    fn test_strip_enclosing_layers() {
        assert_eq!(
            strip_enclosing(r#" [(col("chrom")) == ("chr1")] "#),
            r#"(col("chrom")) == ("chr1")"#
        );
        assert_eq!(strip_enclosing("([(a) & (b)])"), "(a) & (b)");
        assert_eq!(strip_enclosing("(a) & (b)"), "(a) & (b)");
        assert_eq!(strip_enclosing("~(a)"), "~(a)");
    }

    #[test]
    fn test_strip_enclosing_ignores_quoted_delimiters() {
        assert_eq!(strip_enclosing(r#"(")(")"#), r#"")(""#);
    }

    #[test]
    fn test_matching_close() {
        let text = "f(a, [b, (c)]) + g()";
        assert_eq!(matching_close(text, 1), Some(13));
        assert_eq!(matching_close(text, 5), Some(12));
        assert_eq!(matching_close(text, 0), None);
        assert_eq!(matching_close("(unbalanced", 0), None);
    }
}

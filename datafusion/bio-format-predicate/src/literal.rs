//! Literal and column-reference extraction from rendered fragments.
//!
//! Literal extraction is lenient and never fails: anything that is not a quoted
//! string, number or boolean is kept verbatim as a string. Column extraction is
//! strict, since a malformed `col(...)` means the fragment was misrouted.

use crate::errors::{Result, TranslationError};
use crate::splitter::{split_top_level, strip_enclosing};
use datafusion::logical_expr::{Expr, lit};
use std::fmt;

/// Type-tag prefixes the host library puts in front of dynamically typed literals.
const TYPE_TAGS: [&str; 2] = ["dyn int:", "dyn float:"];

/// A typed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// String value, quotes removed
    Str(String),
    /// Integer value
    Int(i64),
    /// Floating-point value
    Float(f64),
    /// Boolean value
    Bool(bool),
}

impl Literal {
    /// DataFusion literal expression for the value.
    pub fn to_expr(&self) -> Expr {
        match self {
            Literal::Str(value) => lit(value.clone()),
            Literal::Int(value) => lit(*value),
            Literal::Float(value) => lit(*value),
            Literal::Bool(value) => lit(*value),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(value) => write!(f, "\"{value}\""),
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Float(value) => write!(f, "{value}"),
            Literal::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// Parses a rendered literal such as `("chr1")`, `(dyn int: 1000)` or `1.5`.
pub fn extract_literal(fragment: &str) -> Literal {
    let mut text = fragment.trim();
    if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        text = inner.trim();
    }
    for tag in TYPE_TAGS {
        if let Some(rest) = text.strip_prefix(tag) {
            text = rest.trim_start();
            break;
        }
    }

    if let Some(inner) = unquote(text) {
        return Literal::Str(inner.to_string());
    }
    if let Ok(value) = text.parse::<i64>() {
        return Literal::Int(value);
    }
    // floats only when a decimal point is present, so integers stay integers
    if text.contains('.') {
        if let Ok(value) = text.parse::<f64>() {
            return Literal::Float(value);
        }
    }
    if text.eq_ignore_ascii_case("true") {
        return Literal::Bool(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Literal::Bool(false);
    }
    Literal::Str(text.to_string())
}

/// Parses the argument of a membership call, e.g. `[["chr1", "chr2"]]`.
///
/// Enclosing brackets are removed layer by layer and the remainder is split on
/// top-level commas, so a quoted comma stays part of its value.
pub fn extract_literal_list(fragment: &str) -> Vec<Literal> {
    let body = strip_enclosing(fragment);
    if body.is_empty() {
        return Vec::new();
    }
    split_top_level(body, ",")
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(extract_literal)
        .collect()
}

/// Recovers the column name from `col("name")`, `col('name')` or either form
/// wrapped in one extra pair of parentheses.
pub fn extract_column_name(fragment: &str) -> Result<String> {
    let text = fragment.trim();
    parse_column_ref(text)
        .or_else(|| {
            text.strip_prefix('(')
                .and_then(|t| t.strip_suffix(')'))
                .and_then(|t| parse_column_ref(t.trim()))
        })
        .map(str::to_string)
        .ok_or_else(|| TranslationError::UnrecognizedColumnRef(text.to_string()))
}

fn parse_column_ref(text: &str) -> Option<&str> {
    let inner = text.strip_prefix("col(")?.strip_suffix(')')?;
    let name = unquote(inner.trim())?;
    let quote = inner.trim().chars().next()?;
    (!name.is_empty() && !name.contains(quote)).then_some(name)
}

fn unquote(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let quote = bytes[0];
    if (quote == b'"' || quote == b'\'') && bytes[bytes.len() - 1] == quote {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_typed_literals() {
        assert_eq!(extract_literal("(dyn int: 1000)"), Literal::Int(1000));
        assert_eq!(extract_literal("(dyn float: 1.5)"), Literal::Float(1.5));
        assert_eq!(extract_literal("(\"chr1\")"), Literal::Str("chr1".into()));
        assert_eq!(extract_literal("'chr2'"), Literal::Str("chr2".into()));
        assert_eq!(extract_literal("-42"), Literal::Int(-42));
    }

    #[test]
    fn test_integer_fidelity() {
        assert_eq!(extract_literal("1000"), Literal::Int(1000));
        assert_eq!(extract_literal("1000.0"), Literal::Float(1000.0));
    }

    #[test]
    fn test_boolean_literals_are_case_insensitive() {
        assert_eq!(extract_literal("(True)"), Literal::Bool(true));
        assert_eq!(extract_literal("FALSE"), Literal::Bool(false));
    }

    #[test]
    fn test_unparseable_literal_falls_back_to_text() {
        assert_eq!(extract_literal("(1e5)"), Literal::Str("1e5".into()));
        assert_eq!(extract_literal("a.b"), Literal::Str("a.b".into()));
        assert_eq!(extract_literal(""), Literal::Str(String::new()));
    }

    #[test]
    fn test_only_one_parenthesis_layer_is_stripped() {
        assert_eq!(extract_literal("((5))"), Literal::Str("(5)".into()));
    }

    #[test]
    fn test_extract_literal_list() {
        assert_eq!(
            extract_literal_list(r#"[["chr1", "chr2"]]"#),
            vec![Literal::Str("chr1".into()), Literal::Str("chr2".into())]
        );
        assert_eq!(
            extract_literal_list("[1, 2, 3]"),
            vec![Literal::Int(1), Literal::Int(2), Literal::Int(3)]
        );
        assert_eq!(
            extract_literal_list(r#"["a,b", "c"]"#),
            vec![Literal::Str("a,b".into()), Literal::Str("c".into())]
        );
        assert!(extract_literal_list("[]").is_empty());
    }

    #[test]
    fn test_extract_column_name() {
        assert_eq!(extract_column_name(r#"col("chrom")"#).unwrap(), "chrom");
        assert_eq!(extract_column_name("col('start')").unwrap(), "start");
        assert_eq!(extract_column_name(r#" (col("end")) "#).unwrap(), "end");
    }

    #[test]
    fn test_extract_column_name_rejects_other_fragments() {
        for fragment in [r#"("chr1")"#, "col()", r#"col("")"#, r#"((col("a")))"#, "x"] {
            assert!(
                matches!(
                    extract_column_name(fragment),
                    Err(TranslationError::UnrecognizedColumnRef(_))
                ),
                "{fragment} should be rejected"
            );
        }
    }
}

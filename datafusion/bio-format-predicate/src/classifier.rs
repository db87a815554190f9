//! Classification of a rendered filter fragment into one predicate shape.
//!
//! Productions are tried in a fixed order over the depth-zero tokens of the
//! fragment: conjunction, negated membership, membership, not-null, null and
//! finally comparison. A fragment that matches none of them is unsupported.

use crate::errors::{Result, TranslationError};
use crate::lexer::{Spanned, Token, is_balanced, tokenize, top_level};
use crate::node::CompareOp;
use crate::splitter::strip_enclosing;

/// The production a fragment matched, with the sub-fragments it was split into.
///
/// Sub-fragments borrow from the classified input and keep their own parentheses,
/// so they can be classified again or handed to the literal extractors.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape<'a> {
    /// Two or more operands joined by `&` at depth zero
    Conjunction(Vec<&'a str>),
    /// `~(<membership>)` or `<membership>.not()`; holds the inner membership fragment
    NegatedMembership(&'a str),
    /// `<column>.is_in(<values>)`
    Membership {
        /// Column reference fragment
        column: &'a str,
        /// Raw argument of `is_in`
        values: &'a str,
    },
    /// `<column>.is_not_null()`
    NotNull(&'a str),
    /// `<column>.is_null()`
    Null(&'a str),
    /// `<column> <op> <literal>`
    Comparison {
        /// Column reference fragment
        column: &'a str,
        /// Comparison operator
        op: CompareOp,
        /// Literal fragment
        literal: &'a str,
    },
}

/// Decides which production `fragment` matches.
///
/// Enclosing `[...]` and `(...)` layers are removed first. Unbalanced delimiters,
/// disjunctions, negations
/// of anything other than membership, column-to-column comparisons and method
/// calls other than `is_in`, `is_null`, `is_not_null` and `not` are rejected with
/// [`TranslationError::UnsupportedExpression`].
pub fn classify(fragment: &str) -> Result<Shape<'_>> {
    let text = strip_enclosing(fragment);
    let unsupported = || TranslationError::UnsupportedExpression(fragment.trim().to_string());
    if text.is_empty() {
        return Err(unsupported());
    }

    let tokens = tokenize(text);
    if !is_balanced(&tokens) {
        return Err(unsupported());
    }
    let top = top_level(&tokens);

    if top.iter().any(|t| t.token == Token::Pipe) {
        return Err(unsupported());
    }

    if top.iter().any(|t| t.token == Token::Amp) {
        let operands = conjunction_operands(text, &top);
        if operands.len() < 2 || operands.iter().any(|operand| operand.is_empty()) {
            return Err(unsupported());
        }
        return Ok(Shape::Conjunction(operands));
    }

    if top.first().map(|t| t.token) == Some(Token::Tilde) {
        let inner = strip_enclosing(&text[top[0].end..]);
        return match membership_call(inner) {
            Some(_) => Ok(Shape::NegatedMembership(inner)),
            None => Err(unsupported()),
        };
    }

    if let Some((receiver, args)) = trailing_call(text, &top, "not") {
        let receiver = strip_enclosing(receiver);
        return match membership_call(receiver) {
            Some(_) if args.is_empty() => Ok(Shape::NegatedMembership(receiver)),
            _ => Err(unsupported()),
        };
    }

    if let Some((column, values)) = trailing_call(text, &top, "is_in") {
        return Ok(Shape::Membership { column, values });
    }

    if let Some((column, args)) = trailing_call(text, &top, "is_not_null") {
        return if args.is_empty() {
            Ok(Shape::NotNull(column))
        } else {
            Err(unsupported())
        };
    }

    if let Some((column, args)) = trailing_call(text, &top, "is_null") {
        return if args.is_empty() {
            Ok(Shape::Null(column))
        } else {
            Err(unsupported())
        };
    }

    comparison(text, &tokens, &top).ok_or_else(unsupported)
}

/// Operands between the depth-zero `&` tokens, trimmed.
fn conjunction_operands<'a>(text: &'a str, top: &[Spanned<'_>]) -> Vec<&'a str> {
    let mut operands = Vec::new();
    let mut start = 0;
    for amp in top.iter().filter(|t| t.token == Token::Amp) {
        operands.push(text[start..amp.start].trim());
        start = amp.end;
    }
    operands.push(text[start..].trim());
    operands
}

/// Splits `<receiver>.<name>(<args>)` when the call is the last thing at depth zero.
fn trailing_call<'a>(text: &'a str, top: &[Spanned<'_>], name: &str) -> Option<(&'a str, &'a str)> {
    let [.., dot, method, open, close] = top else {
        return None;
    };
    let shape_matches = dot.token == Token::Dot
        && method.token == Token::Ident(name)
        && open.token == Token::Open('(')
        && close.token == Token::Close(')');
    if !shape_matches {
        return None;
    }
    let receiver = text[..dot.start].trim();
    if receiver.is_empty() {
        return None;
    }
    Some((receiver, text[open.end..close.start].trim()))
}

fn membership_call(text: &str) -> Option<(&str, &str)> {
    let tokens = tokenize(text);
    trailing_call(text, &top_level(&tokens), "is_in")
}

fn comparison<'a>(text: &'a str, tokens: &[Spanned<'_>], top: &[Spanned<'_>]) -> Option<Shape<'a>> {
    let mut operators = top.iter().filter_map(|t| match t.token {
        Token::Compare(op) => Some((t, op)),
        _ => None,
    });
    let (token, op) = operators.next()?;
    if operators.next().is_some() {
        return None;
    }

    let column = text[..token.start].trim();
    let literal = text[token.end..].trim();
    if column.is_empty() || literal.is_empty() {
        return None;
    }

    // a column reference on the right-hand side is a column-to-column comparison
    let references_column = tokens
        .windows(2)
        .filter(|pair| pair[0].start >= token.end)
        .any(|pair| pair[0].token == Token::Ident("col") && pair[1].token == Token::Open('('));
    if references_column {
        return None;
    }

    Some(Shape::Comparison {
        column,
        op,
        literal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_unsupported(fragment: &str) {
        assert!(
            matches!(
                classify(fragment),
                Err(TranslationError::UnsupportedExpression(_))
            ),
            "{fragment} should be unsupported"
        );
    }

    #[test]
    fn test_classify_comparison() {
        assert_eq!(
            classify(r#"[(col("start")) >= (dyn int: 1000)]"#).unwrap(),
            Shape::Comparison {
                column: r#"(col("start"))"#,
                op: CompareOp::GtEq,
                literal: "(dyn int: 1000)",
            }
        );
        assert_eq!(
            classify(r#"col("chrom") != "chr1""#).unwrap(),
            Shape::Comparison {
                column: r#"col("chrom")"#,
                op: CompareOp::NotEq,
                literal: r#""chr1""#,
            }
        );
    }

    #[test]
    fn test_conjunction_takes_precedence_over_comparison() {
        let shape =
            classify(r#"[([(col("chrom")) == ("chr1")]) & ([(col("start")) > (dyn int: 5)])]"#)
                .unwrap();
        assert_eq!(
            shape,
            Shape::Conjunction(vec![
                r#"([(col("chrom")) == ("chr1")])"#,
                r#"([(col("start")) > (dyn int: 5)])"#,
            ])
        );
    }

    #[test]
    fn test_nested_ampersand_is_not_a_conjunction() {
        let shape = classify(r#"col("name").is_in([["a & b", "c"]])"#).unwrap();
        assert_eq!(
            shape,
            Shape::Membership {
                column: r#"col("name")"#,
                values: r#"[["a & b", "c"]]"#,
            }
        );
    }

    #[test]
    fn test_negated_membership_forms() {
        assert_eq!(
            classify(r#"~(col("chrom").is_in([["chr1", "chr2"]]))"#).unwrap(),
            Shape::NegatedMembership(r#"col("chrom").is_in([["chr1", "chr2"]])"#)
        );
        assert_eq!(
            classify(r#"col("strand").is_in([["+"]]).not()"#).unwrap(),
            Shape::NegatedMembership(r#"col("strand").is_in([["+"]])"#)
        );
    }

    #[test]
    fn test_null_checks() {
        assert_eq!(
            classify(r#"col("name").is_not_null()"#).unwrap(),
            Shape::NotNull(r#"col("name")"#)
        );
        assert_eq!(
            classify(r#"[col("name").is_null()]"#).unwrap(),
            Shape::Null(r#"col("name")"#)
        );
    }

    #[test]
    fn test_operator_inside_literal_is_ignored() {
        assert_eq!(
            classify(r#"(col("type")) == ("a>=b")"#).unwrap(),
            Shape::Comparison {
                column: r#"(col("type"))"#,
                op: CompareOp::Eq,
                literal: r#"("a>=b")"#,
            }
        );
    }

    #[test]
    fn test_unsupported_shapes() {
        assert_unsupported("");
        assert_unsupported("[]");
        assert_unsupported(r#"[([(col("a")) == (1)]) | ([(col("b")) == (2)])]"#);
        assert_unsupported(r#"~(col("a").is_null())"#);
        assert_unsupported(r#"col("a").is_null().not()"#);
        assert_unsupported(r#"(col("a")) > (col("b"))"#);
        assert_unsupported(r#"col("a").str.contains(["x"])"#);
        assert_unsupported(r#"col("a")"#);
        assert_unsupported(r#"([(col("a")) == (1)]) & "#);
    }

    #[test]
    fn test_unbalanced_delimiters_are_unsupported() {
        assert_unsupported(r#"col("a")) & (col("b")"#);
        assert_unsupported(r#"[(col("a")) == (1)"#);
        assert_unsupported(r#"(col("a")) == (1)])"#);
    }

    #[test]
    fn test_conjunction_operands_follow_token_depth() {
        assert_eq!(
            classify(r#"(col("a") == "x & y") & ([col("b").is_null()])"#).unwrap(),
            Shape::Conjunction(vec![
                r#"(col("a") == "x & y")"#,
                r#"([col("b").is_null()])"#,
            ])
        );
    }
}

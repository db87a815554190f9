//! SQL WHERE-clause serialization of translated expressions.
//!
//! [`expr_to_sql`] walks the expression tree, so string values are quoted from
//! their stored form whatever characters they contain.
//!
//! [`sql_from_rendering`] works on text instead. DataFusion renders literals
//! through their type wrappers (`Utf8("chr1")`, `Int64(1000)`) and membership
//! lists as `IN ([...])`. The serializer rewrites that rendering into plain SQL
//! that `DataFrame::parse_sql_expr` accepts: wrappers become bare literals,
//! identifiers are double-quoted and the operand of a prefix `NOT` is
//! parenthesised.

use crate::errors::{Result, TranslationError};
use crate::splitter::matching_close;
use datafusion::common::ScalarValue;
use datafusion::logical_expr::{Between, BinaryExpr, Expr, Operator, expr::InList};

const KEYWORDS: [&str; 11] = [
    "AND", "OR", "NOT", "IN", "IS", "NULL", "BETWEEN", "LIKE", "ILIKE", "TRUE", "FALSE",
];

const STRING_WRAPPERS: [&str; 3] = ["Utf8", "Utf8View", "LargeUtf8"];

const NUMERIC_WRAPPERS: [&str; 11] = [
    "Int8", "Int16", "Int32", "Int64", "UInt8", "UInt16", "UInt32", "UInt64", "Float16",
    "Float32", "Float64",
];

#[derive(Debug, Clone, PartialEq)]
enum SqlToken<'a> {
    Keyword(&'a str),
    Ident(&'a str),
    Literal(String),
    Op(&'a str),
    Function(&'a str),
    Open,
    Close,
    Comma,
    Raw(&'a str),
}

/// Serializes a DataFusion expression into a SQL WHERE-clause fragment.
///
/// Covers the expressions the translator builds: columns, literals, comparisons,
/// `AND`/`OR`, `NOT`, `IN` lists, `BETWEEN` and null checks. Anything else is
/// reported as [`TranslationError::UnsupportedExpression`].
pub fn expr_to_sql(expr: &Expr) -> Result<String> {
    let mut sql = String::new();
    write_expr(&mut sql, expr)?;
    if sql.trim().is_empty() {
        return Err(TranslationError::EmptyOutput);
    }
    Ok(sql)
}

fn write_expr(sql: &mut String, expr: &Expr) -> Result<()> {
    match expr {
        Expr::Column(column) => push_ident(sql, &column.name),
        Expr::Literal(value, ..) => {
            let literal = scalar_to_sql(value).ok_or_else(|| unsupported(expr))?;
            sql.push_str(&literal);
        }
        Expr::BinaryExpr(BinaryExpr { left, op, right }) => {
            let symbol = binary_symbol(*op).ok_or_else(|| unsupported(expr))?;
            write_child(sql, left, needs_group(left, *op, false))?;
            sql.push(' ');
            sql.push_str(symbol);
            sql.push(' ');
            write_child(sql, right, needs_group(right, *op, true))?;
        }
        Expr::Not(inner) => {
            sql.push_str("NOT ");
            write_child(sql, inner, true)?;
        }
        Expr::IsNull(inner) => {
            write_child(sql, inner, !is_leaf(inner))?;
            sql.push_str(" IS NULL");
        }
        Expr::IsNotNull(inner) => {
            write_child(sql, inner, !is_leaf(inner))?;
            sql.push_str(" IS NOT NULL");
        }
        Expr::InList(InList {
            expr: operand,
            list,
            negated,
        }) => {
            write_child(sql, operand, !is_leaf(operand))?;
            sql.push_str(if *negated { " NOT IN (" } else { " IN (" });
            for (idx, item) in list.iter().enumerate() {
                if idx > 0 {
                    sql.push_str(", ");
                }
                write_child(sql, item, !is_leaf(item))?;
            }
            sql.push(')');
        }
        Expr::Between(Between {
            expr: operand,
            negated,
            low,
            high,
        }) => {
            write_child(sql, operand, !is_leaf(operand))?;
            sql.push_str(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
            write_child(sql, low, !is_leaf(low))?;
            sql.push_str(" AND ");
            write_child(sql, high, !is_leaf(high))?;
        }
        other => return Err(unsupported(other)),
    }
    Ok(())
}

fn write_child(sql: &mut String, expr: &Expr, grouped: bool) -> Result<()> {
    if grouped {
        sql.push('(');
        write_expr(sql, expr)?;
        sql.push(')');
        Ok(())
    } else {
        write_expr(sql, expr)
    }
}

fn is_leaf(expr: &Expr) -> bool {
    matches!(expr, Expr::Column(_) | Expr::Literal(..))
}

/// Whether `child` needs parentheses as an operand of `parent`.
///
/// Left-nested `AND` chains print flat, as DataFusion itself renders them.
fn needs_group(child: &Expr, parent: Operator, right_side: bool) -> bool {
    match child {
        Expr::Column(_) | Expr::Literal(..) => false,
        Expr::BinaryExpr(BinaryExpr {
            op: op @ (Operator::And | Operator::Or),
            ..
        }) => *op != parent || right_side,
        _ => !matches!(parent, Operator::And | Operator::Or),
    }
}

fn binary_symbol(op: Operator) -> Option<&'static str> {
    let symbol = match op {
        Operator::Eq => "=",
        Operator::NotEq => "!=",
        Operator::Lt => "<",
        Operator::LtEq => "<=",
        Operator::Gt => ">",
        Operator::GtEq => ">=",
        Operator::And => "AND",
        Operator::Or => "OR",
        _ => return None,
    };
    Some(symbol)
}

fn scalar_to_sql(value: &ScalarValue) -> Option<String> {
    if value.is_null() {
        return Some("NULL".to_string());
    }
    let literal = match value {
        ScalarValue::Utf8(Some(text))
        | ScalarValue::Utf8View(Some(text))
        | ScalarValue::LargeUtf8(Some(text)) => format!("'{}'", text.replace('\'', "''")),
        ScalarValue::Boolean(Some(true)) => "TRUE".to_string(),
        ScalarValue::Boolean(Some(false)) => "FALSE".to_string(),
        ScalarValue::Int8(Some(v)) => v.to_string(),
        ScalarValue::Int16(Some(v)) => v.to_string(),
        ScalarValue::Int32(Some(v)) => v.to_string(),
        ScalarValue::Int64(Some(v)) => v.to_string(),
        ScalarValue::UInt8(Some(v)) => v.to_string(),
        ScalarValue::UInt16(Some(v)) => v.to_string(),
        ScalarValue::UInt32(Some(v)) => v.to_string(),
        ScalarValue::UInt64(Some(v)) => v.to_string(),
        ScalarValue::Float32(Some(v)) if v.is_finite() => format!("{v:?}"),
        ScalarValue::Float64(Some(v)) if v.is_finite() => format!("{v:?}"),
        _ => return None,
    };
    Some(literal)
}

fn push_ident(sql: &mut String, name: &str) {
    sql.push('"');
    sql.push_str(&name.replace('"', "\"\""));
    sql.push('"');
}

fn unsupported(expr: &Expr) -> TranslationError {
    TranslationError::UnsupportedExpression(expr.to_string())
}

/// Converts DataFusion's textual rendering of an expression into SQL.
///
/// Accepts the bare `Display` output as well as the `Expr(...)` form printed by
/// the Python bindings.
///
/// ```
/// use datafusion_bio_format_predicate::sql_from_rendering;
///
/// let sql = sql_from_rendering(r#"Expr(chrom = Utf8View("1") AND start > Int64(10000))"#).unwrap();
/// assert_eq!(sql, r#""chrom" = '1' AND "start" > 10000"#);
/// ```
pub fn sql_from_rendering(rendering: &str) -> Result<String> {
    let body = strip_expr_wrapper(rendering.trim());
    let tokens = parenthesize_not(lex(body));
    let sql = render(&tokens);
    if sql.trim().is_empty() {
        return Err(TranslationError::EmptyOutput);
    }
    Ok(sql)
}

fn strip_expr_wrapper(text: &str) -> &str {
    const PREFIX: &str = "Expr(";
    if text.starts_with(PREFIX) && matching_close(text, PREFIX.len() - 1) == Some(text.len() - 1) {
        text[PREFIX.len()..text.len() - 1].trim()
    } else {
        text
    }
}

fn lex(text: &str) -> Vec<SqlToken<'_>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let byte = bytes[pos];
        match byte {
            b if b.is_ascii_whitespace() => pos += 1,
            b'[' | b']' => pos += 1,
            b'(' => {
                tokens.push(SqlToken::Open);
                pos += 1;
            }
            b')' => {
                tokens.push(SqlToken::Close);
                pos += 1;
            }
            b',' => {
                tokens.push(SqlToken::Comma);
                pos += 1;
            }
            b'=' | b'!' | b'<' | b'>' => {
                let start = pos;
                while pos < bytes.len() && matches!(bytes[pos], b'=' | b'!' | b'<' | b'>') {
                    pos += 1;
                }
                tokens.push(SqlToken::Op(&text[start..pos]));
            }
            b'-' if bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                let start = pos;
                pos = number_end(bytes, pos + 1);
                tokens.push(SqlToken::Literal(text[start..pos].to_string()));
            }
            b'+' | b'-' | b'*' | b'/' | b'%' => {
                tokens.push(SqlToken::Op(&text[pos..pos + 1]));
                pos += 1;
            }
            b if b.is_ascii_digit() => {
                let start = pos;
                pos = number_end(bytes, pos);
                tokens.push(SqlToken::Literal(text[start..pos].to_string()));
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let start = pos;
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || matches!(bytes[pos], b'_' | b'.'))
                {
                    pos += 1;
                }
                let word = &text[start..pos];
                let (token, next) = word_token(text, word, pos);
                tokens.push(token);
                pos = next;
            }
            _ => {
                let len = text[pos..].chars().next().map_or(1, char::len_utf8);
                tokens.push(SqlToken::Raw(&text[pos..pos + len]));
                pos += len;
            }
        }
    }

    tokens
}

/// Classifies a word ending at `pos`, consuming a literal wrapper's argument when present.
fn word_token<'a>(text: &'a str, word: &'a str, pos: usize) -> (SqlToken<'a>, usize) {
    let called = text.as_bytes().get(pos) == Some(&b'(');
    if !called {
        if KEYWORDS.contains(&word) {
            return (SqlToken::Keyword(word), pos);
        }
        return (SqlToken::Ident(word), pos);
    }

    let args = pos + 1;
    if STRING_WRAPPERS.contains(&word) {
        if let Some(rest) = text[args..].strip_prefix("NULL)") {
            return (SqlToken::Literal("NULL".to_string()), text.len() - rest.len());
        }
        if text[args..].starts_with('"') {
            if let Some(close) = string_end(text, args + 1) {
                let value = &text[args + 1..close];
                let quoted = format!("'{}'", value.replace('\'', "''"));
                return (SqlToken::Literal(quoted), close + 2);
            }
        }
    } else if NUMERIC_WRAPPERS.contains(&word) || word == "Boolean" {
        if let Some(len) = text[args..].find(')') {
            let value = text[args..args + len].trim();
            let literal = match value {
                "NULL" => "NULL".to_string(),
                "true" => "TRUE".to_string(),
                "false" => "FALSE".to_string(),
                other => other.to_string(),
            };
            return (SqlToken::Literal(literal), args + len + 1);
        }
    }
    (SqlToken::Function(word), pos)
}

/// Index of the quote closing a wrapped string value starting at `from`.
///
/// Values are printed without escaping, so the closing `")` is the first one
/// followed by a delimiter or the end of the rendering.
fn string_end(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    text[from..]
        .match_indices("\")")
        .map(|(offset, _)| from + offset)
        .find(|&idx| {
            matches!(
                bytes.get(idx + 2),
                None | Some(b' ' | b'\t' | b'\n' | b',' | b')' | b']')
            )
        })
}

fn number_end(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'.') {
        pos += 1;
    }
    pos
}

/// Wraps the operand of every prefix `NOT` in parentheses unless it already is
/// a single parenthesised group.
fn parenthesize_not(tokens: Vec<SqlToken<'_>>) -> Vec<SqlToken<'_>> {
    let mut opens_after = vec![false; tokens.len()];
    let mut closes_before = vec![0usize; tokens.len() + 1];

    for (idx, token) in tokens.iter().enumerate() {
        if *token != SqlToken::Keyword("NOT") {
            continue;
        }
        let prefix = match idx.checked_sub(1).map(|prev| &tokens[prev]) {
            None | Some(SqlToken::Open | SqlToken::Comma) => true,
            Some(SqlToken::Keyword(word)) => matches!(*word, "AND" | "OR" | "NOT"),
            _ => false,
        };
        if !prefix {
            continue;
        }
        let end = operand_end(&tokens, idx + 1);
        if end == idx + 1 || group_end(&tokens, idx + 1) == Some(end - 1) {
            continue;
        }
        opens_after[idx] = true;
        closes_before[end] += 1;
    }

    let mut out = Vec::with_capacity(tokens.len());
    for (idx, token) in tokens.into_iter().enumerate() {
        out.extend(std::iter::repeat_n(SqlToken::Close, closes_before[idx]));
        out.push(token);
        if opens_after[idx] {
            out.push(SqlToken::Open);
        }
    }
    out.extend(std::iter::repeat_n(
        SqlToken::Close,
        closes_before[closes_before.len() - 1],
    ));
    out
}

/// End of the operand starting at `from`: the next depth-zero `AND`/`OR` that
/// does not belong to a `BETWEEN`, or the next unmatched `)` or `,`.
fn operand_end(tokens: &[SqlToken<'_>], from: usize) -> usize {
    let mut depth = 0usize;
    let mut pending_between = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(from) {
        match token {
            SqlToken::Open => depth += 1,
            SqlToken::Close => {
                if depth == 0 {
                    return idx;
                }
                depth -= 1;
            }
            _ if depth > 0 => {}
            SqlToken::Comma => return idx,
            SqlToken::Keyword("BETWEEN") => pending_between += 1,
            SqlToken::Keyword("AND") if pending_between > 0 => pending_between -= 1,
            SqlToken::Keyword("AND" | "OR") => return idx,
            _ => {}
        }
    }
    tokens.len()
}

fn group_end(tokens: &[SqlToken<'_>], open: usize) -> Option<usize> {
    if tokens.get(open) != Some(&SqlToken::Open) {
        return None;
    }
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(open) {
        match token {
            SqlToken::Open => depth += 1,
            SqlToken::Close => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn render(tokens: &[SqlToken<'_>]) -> String {
    let mut sql = String::new();
    let mut prev: Option<&SqlToken<'_>> = None;
    for token in tokens {
        let glued = matches!(prev, None | Some(SqlToken::Open | SqlToken::Function(_)))
            || matches!(token, SqlToken::Close | SqlToken::Comma);
        if !glued {
            sql.push(' ');
        }
        match token {
            SqlToken::Keyword(text)
            | SqlToken::Op(text)
            | SqlToken::Function(text)
            | SqlToken::Raw(text) => sql.push_str(text),
            SqlToken::Ident(name) => push_ident(&mut sql, name),
            SqlToken::Literal(text) => sql.push_str(text),
            SqlToken::Open => sql.push('('),
            SqlToken::Close => sql.push(')'),
            SqlToken::Comma => sql.push(','),
        }
        prev = Some(token);
    }
    sql
}

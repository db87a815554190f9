//! Intermediate representation of a classified predicate and its lowering to DataFusion.
//!
//! Nodes are built bottom-up during a single translation call and never outlive it.
//! [`Node::to_expr`] produces the DataFusion [`Expr`] handed to `DataFrame::filter`.

use crate::literal::Literal;
use datafusion::logical_expr::{Expr, ident, lit};
use std::fmt;

/// Binary comparison operators accepted between a column and a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

impl CompareOp {
    /// Token used for the operator in the host library's rendering.
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }

    fn apply(self, left: Expr, right: Expr) -> Expr {
        match self {
            CompareOp::Eq => left.eq(right),
            CompareOp::NotEq => left.not_eq(right),
            CompareOp::Lt => left.lt(right),
            CompareOp::LtEq => left.lt_eq(right),
            CompareOp::Gt => left.gt(right),
            CompareOp::GtEq => left.gt_eq(right),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A translated predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `column <op> literal`
    Comparison {
        /// Column name
        column: String,
        /// Comparison operator
        op: CompareOp,
        /// Right-hand literal
        literal: Literal,
    },
    /// Logical AND of two or more operands, lowered as a left fold.
    Conjunction {
        /// Operands in source order
        operands: Vec<Node>,
    },
    /// `column IN (values)`, or its negation
    Membership {
        /// Column name
        column: String,
        /// Candidate values
        values: Vec<Literal>,
        /// True for NOT IN
        negated: bool,
    },
    /// `column IS NULL` / `column IS NOT NULL`
    NullCheck {
        /// Column name
        column: String,
        /// True for IS NOT NULL
        is_not_null: bool,
    },
    /// Inclusive `column BETWEEN low AND high`
    Range {
        /// Column name
        column: String,
        /// Lower bound
        low: Literal,
        /// Upper bound
        high: Literal,
    },
}

impl Node {
    /// Wraps operands in a conjunction.
    ///
    /// Returns `None` for an empty list and the operand itself for a single one,
    /// so a conjunction always carries at least two operands.
    pub fn conjunction(mut operands: Vec<Node>) -> Option<Node> {
        match operands.len() {
            0 => None,
            1 => operands.pop(),
            _ => Some(Node::Conjunction { operands }),
        }
    }

    /// Lowers the node to a DataFusion expression.
    ///
    /// Conjunctions fold left to right, so `[a, b, c]` becomes `(a AND b) AND c`.
    /// Negated membership is rendered as `NOT (column IN (...))`.
    pub fn to_expr(&self) -> Expr {
        match self {
            Node::Comparison {
                column,
                op,
                literal,
            } => op.apply(ident(column), literal.to_expr()),
            Node::Conjunction { operands } => operands
                .iter()
                .map(Node::to_expr)
                .reduce(Expr::and)
                .unwrap_or_else(|| lit(true)),
            Node::Membership {
                column,
                values,
                negated,
            } => {
                let list = values.iter().map(Literal::to_expr).collect();
                let membership = ident(column).in_list(list, false);
                if *negated {
                    Expr::Not(Box::new(membership))
                } else {
                    membership
                }
            }
            Node::NullCheck {
                column,
                is_not_null,
            } => {
                if *is_not_null {
                    ident(column).is_not_null()
                } else {
                    ident(column).is_null()
                }
            }
            Node::Range { column, low, high } => {
                ident(column).between(low.to_expr(), high.to_expr())
            }
        }
    }
}

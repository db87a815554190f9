//! Translation of rendered filters into DataFusion expressions.
//!
//! A fragment is classified, its sub-fragments are translated recursively and
//! every column/operator pair is checked against the translator's column table
//! before the resulting [`Node`] is lowered.

use crate::classifier::{Shape, classify};
use crate::column_types::{ColumnTypeTable, PredicateOp, RecordFormat};
use crate::errors::{Result, TranslationError};
use crate::literal::{extract_column_name, extract_literal, extract_literal_list};
use crate::node::{CompareOp, Node};
use crate::sql::expr_to_sql;
use datafusion::logical_expr::Expr;
use log::debug;
use std::borrow::Cow;

/// Options controlling how classified shapes are lowered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Fold `c >= low & c <= high` conjunct pairs into a single BETWEEN.
    ///
    /// Off by default: range pairs stay a conjunction of two comparisons.
    pub fold_ranges: bool,
}

/// Translates host-library filter renderings into DataFusion expressions.
///
/// The active column type table is carried by the translator value itself, so
/// translators for different formats can be used concurrently.
#[derive(Debug, Clone)]
pub struct PredicateTranslator<'a> {
    columns: Option<Cow<'a, ColumnTypeTable>>,
    options: TranslateOptions,
}

impl PredicateTranslator<'static> {
    /// Translator without a column table; every column accepts every operator.
    pub fn permissive() -> Self {
        Self {
            columns: None,
            options: TranslateOptions::default(),
        }
    }

    /// Translator validating against the built-in table of `format`.
    pub fn for_format(format: RecordFormat) -> Self {
        Self {
            columns: Some(Cow::Owned(format.column_types())),
            options: TranslateOptions::default(),
        }
    }
}

impl<'a> PredicateTranslator<'a> {
    /// Translator validating against `columns`.
    pub fn new(columns: &'a ColumnTypeTable) -> Self {
        Self {
            columns: Some(Cow::Borrowed(columns)),
            options: TranslateOptions::default(),
        }
    }

    /// Replaces the translation options.
    pub fn with_options(mut self, options: TranslateOptions) -> Self {
        self.options = options;
        self
    }

    /// Active column table, `None` in permissive mode.
    pub fn columns(&self) -> Option<&ColumnTypeTable> {
        self.columns.as_deref()
    }

    /// Classifies, validates and builds the intermediate node for `fragment`.
    pub fn to_node(&self, fragment: &str) -> Result<Node> {
        let node = self.build(fragment)?;
        if !self.options.fold_ranges {
            return Ok(node);
        }
        self.fold_ranges(node)
            .ok_or_else(|| TranslationError::UnsupportedExpression(fragment.trim().to_string()))
    }

    /// Translates `fragment` into a DataFusion expression.
    pub fn translate(&self, fragment: &str) -> Result<Expr> {
        let expr = self.to_node(fragment)?.to_expr();
        debug!("Translated predicate {} into {}", fragment.trim(), expr);
        Ok(expr)
    }

    /// Translates `fragment` into a SQL WHERE-clause fragment.
    pub fn translate_to_sql(&self, fragment: &str) -> Result<String> {
        expr_to_sql(&self.translate(fragment)?)
    }

    /// Whether `fragment` can be pushed down.
    pub fn is_supported(&self, fragment: &str) -> bool {
        match self.to_node(fragment) {
            Ok(_) => true,
            Err(err) => {
                debug!("Predicate {} cannot be pushed down: {}", fragment.trim(), err);
                false
            }
        }
    }

    fn validate(&self, column: &str, operator: PredicateOp) -> Result<()> {
        match self.columns() {
            Some(table) => table.validate(column, operator),
            None => Ok(()),
        }
    }

    fn build(&self, fragment: &str) -> Result<Node> {
        match classify(fragment)? {
            Shape::Conjunction(parts) => {
                let operands = parts
                    .into_iter()
                    .map(|part| self.build(part))
                    .collect::<Result<Vec<_>>>()?;
                Node::conjunction(operands).ok_or_else(|| {
                    TranslationError::UnsupportedExpression(fragment.trim().to_string())
                })
            }
            Shape::NegatedMembership(inner) => match self.build(inner)? {
                Node::Membership { column, values, .. } => Ok(Node::Membership {
                    column,
                    values,
                    negated: true,
                }),
                _ => Err(TranslationError::UnsupportedExpression(
                    fragment.trim().to_string(),
                )),
            },
            Shape::Membership { column, values } => {
                let column = extract_column_name(column)?;
                self.validate(&column, PredicateOp::In)?;
                Ok(Node::Membership {
                    column,
                    values: extract_literal_list(values),
                    negated: false,
                })
            }
            Shape::NotNull(column) => Ok(Node::NullCheck {
                column: extract_column_name(column)?,
                is_not_null: true,
            }),
            Shape::Null(column) => Ok(Node::NullCheck {
                column: extract_column_name(column)?,
                is_not_null: false,
            }),
            Shape::Comparison {
                column,
                op,
                literal,
            } => {
                let column = extract_column_name(column)?;
                self.validate(&column, PredicateOp::Compare(op))?;
                Ok(Node::Comparison {
                    column,
                    op,
                    literal: extract_literal(literal),
                })
            }
        }
    }

    /// Replaces `>=`/`<=` pairs on the same column with a range.
    ///
    /// Nested conjunctions are flattened first so pairs split across levels of
    /// the host library's left-nested rendering are still found.
    fn fold_ranges(&self, node: Node) -> Option<Node> {
        let Node::Conjunction { operands } = node else {
            return Some(node);
        };
        let mut slots: Vec<Option<Node>> = flatten(operands).into_iter().map(Some).collect();
        let mut folded = Vec::with_capacity(slots.len());

        for i in 0..slots.len() {
            let Some(node) = slots[i].take() else {
                continue;
            };
            let partner = range_bound(&node).and_then(|(column, op)| {
                if self.validate(column, PredicateOp::Between).is_err() {
                    return None;
                }
                (i + 1..slots.len()).find(|&j| {
                    slots[j]
                        .as_ref()
                        .and_then(range_bound)
                        .is_some_and(|(other, other_op)| other == column && other_op != op)
                })
            });
            match partner.and_then(|j| slots[j].take()) {
                Some(other) => folded.push(into_range(node, other)),
                None => folded.push(node),
            }
        }

        Node::conjunction(folded)
    }
}

fn flatten(operands: Vec<Node>) -> Vec<Node> {
    let mut flat = Vec::with_capacity(operands.len());
    for operand in operands {
        match operand {
            Node::Conjunction { operands } => flat.extend(flatten(operands)),
            other => flat.push(other),
        }
    }
    flat
}

fn range_bound(node: &Node) -> Option<(&str, CompareOp)> {
    match node {
        Node::Comparison {
            column,
            op: op @ (CompareOp::GtEq | CompareOp::LtEq),
            ..
        } => Some((column.as_str(), *op)),
        _ => None,
    }
}

fn into_range(first: Node, second: Node) -> Node {
    match (first, second) {
        (
            Node::Comparison {
                column,
                op: CompareOp::GtEq,
                literal: low,
            },
            Node::Comparison {
                op: CompareOp::LtEq,
                literal: high,
                ..
            },
        )
        | (
            Node::Comparison {
                column,
                op: CompareOp::LtEq,
                literal: high,
            },
            Node::Comparison {
                op: CompareOp::GtEq,
                literal: low,
                ..
            },
        ) => Node::Range { column, low, high },
        (first, second) => Node::Conjunction {
            operands: vec![first, second],
        },
    }
}

/// Translates `fragment`, validating against `columns` when given.
pub fn translate_predicate(fragment: &str, columns: Option<&ColumnTypeTable>) -> Result<Expr> {
    match columns {
        Some(table) => PredicateTranslator::new(table).translate(fragment),
        None => PredicateTranslator::permissive().translate(fragment),
    }
}

/// Translates `fragment` against the GFF column table.
pub fn translate_gff_predicate(fragment: &str) -> Result<Expr> {
    PredicateTranslator::for_format(RecordFormat::Gff).translate(fragment)
}

/// Whether `fragment` can be pushed down, validating against `columns` when given.
pub fn is_predicate_pushdown_supported(fragment: &str, columns: Option<&ColumnTypeTable>) -> bool {
    match columns {
        Some(table) => PredicateTranslator::new(table).is_supported(fragment),
        None => PredicateTranslator::permissive().is_supported(fragment),
    }
}

/// Human-readable summary of the predicates that can be pushed down.
pub fn supported_predicates_info() -> &'static str {
    r#"Supported predicate pushdown operations:

| Format    | Columns                                        | Class   | Operators                    |
|-----------|------------------------------------------------|---------|------------------------------|
| GFF       | chrom, source, type, strand                    | String  | =, !=, IN, NOT IN            |
| GFF       | start, end, phase, score                       | Numeric | =, !=, <, <=, >, >=, BETWEEN |
| BAM/CRAM  | name, chrom, cigar, mate_chrom, ...            | String  | =, !=, IN, NOT IN            |
| BAM/CRAM  | start, end, flags, mapping_quality, ...        | Numeric | =, !=, <, <=, >, >=, BETWEEN |
| VCF       | chrom, ref, alt                                | String  | =, !=, IN, NOT IN            |
| VCF       | start                                          | Numeric | =, !=, <, <=, >, >=, BETWEEN |
| Pairs     | readID, chr1, chr2, strand1, strand2           | String  | =, !=, IN, NOT IN            |
| Pairs     | pos1, pos2                                     | Numeric | =, !=, <, <=, >, >=, BETWEEN |
| All       | Unknown or dynamic columns                     | Any     | All (DataFusion type-checks) |
| All       | Null checks                                    | Any     | IS NULL, IS NOT NULL         |
| All       | Combinations                                   | -       | AND                          |

Examples:
- pl.col("chrom") == "chr1"
- pl.col("start") > 1000
- pl.col("chrom").is_in(["chr1", "chr2"])
- ~pl.col("chrom").is_in(["chrM"])
- (pl.col("chrom") == "chr1") & (pl.col("start") > 1000)
- (pl.col("start") >= 1000) & (pl.col("start") <= 2000)  # BETWEEN when ranges are folded
"#
}

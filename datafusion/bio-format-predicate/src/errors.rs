use crate::column_types::PredicateOp;
use datafusion::common::DataFusionError;
use thiserror::Error;

/// Reasons a filter rendering could not be lowered to a DataFusion expression.
///
/// Every variant is recoverable: callers are expected to fall back to
/// client-side filtering of the unfiltered data rather than abort the scan.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// The fragment matched none of the supported predicate shapes.
    #[error("Unsupported expression type: {0}")]
    UnsupportedExpression(String),

    /// A fragment routed to a column position is not a `col("name")` reference.
    #[error("Cannot extract column name from: {0}")]
    UnrecognizedColumnRef(String),

    /// The operator is not legal for the column's declared type class.
    #[error("Column '{column}' does not support operator '{operator}'")]
    IllegalOperator {
        /// Column the operator was applied to
        column: String,
        /// Rejected operator
        operator: PredicateOp,
    },

    /// SQL serialization produced an empty WHERE fragment.
    #[error("Empty expression after SQL conversion")]
    EmptyOutput,
}

impl From<TranslationError> for DataFusionError {
    fn from(err: TranslationError) -> Self {
        DataFusionError::External(Box::new(err))
    }
}

/// Result type used throughout the translator.
pub type Result<T> = std::result::Result<T, TranslationError>;

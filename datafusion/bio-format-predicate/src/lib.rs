//! Predicate pushdown translation for DataFusion bioinformatics table providers
//!
//! Dataframe front-ends such as Polars only expose filter expressions to the scan
//! callback as their human-readable rendering, e.g.
//! `[([(col("chrom")) == ("chr1")]) & ([(col("start")) > (dyn int: 1000)])]`.
//! This crate parses that rendering back into a small predicate tree and lowers it
//! to a DataFusion [`Expr`](datafusion::logical_expr::Expr), so the filter can be
//! evaluated inside the format readers instead of after materialization.
//!
//! - **Translation**: comparisons, `&` conjunctions (folded left), `is_in`
//!   membership and its negation, `is_null`/`is_not_null` checks
//! - **Column type validation**: per-format tables reject operators a column
//!   cannot support (`chrom > 5` on VCF); unknown columns are accepted
//! - **SQL serialization**: WHERE-clause fragments for SQL-based pushdown
//! - **Fallback**: untranslatable predicates leave the frame unfiltered and are logged
//!
//! ## Example
//!
//! ```rust
//! use datafusion_bio_format_predicate::{PredicateTranslator, RecordFormat};
//!
//! let translator = PredicateTranslator::for_format(RecordFormat::Variant);
//!
//! let expr = translator.translate(r#"[(col("chrom")) == ("chr1")]"#).unwrap();
//! assert_eq!(expr.to_string(), r#"chrom = Utf8("chr1")"#);
//!
//! let sql = translator
//!     .translate_to_sql(r#"[(col("start")) > (dyn int: 1000)]"#)
//!     .unwrap();
//! assert_eq!(sql, r#""start" > 1000"#);
//!
//! // string columns only support equality and membership
//! assert!(!translator.is_supported(r#"[(col("chrom")) > (dyn int: 5)]"#));
//! ```
//!
//! ## Modules
//!
//! - [`translator`]: classification, validation and lowering entry points
//! - [`column_types`]: per-format column type tables
//! - [`sql`]: SQL WHERE-clause serialization
//! - [`pushdown`]: applying predicates to a `DataFrame` with fallback

#![warn(missing_docs)]

/// Predicate shape classification
pub mod classifier;
/// Column type classes and per-format tables
pub mod column_types;
/// Translation errors
pub mod errors;
/// Tokenizer for the host library's expression rendering
pub mod lexer;
/// Literal and column reference extraction
pub mod literal;
/// Predicate tree and its lowering to DataFusion expressions
pub mod node;
/// Applying translated predicates to data frames
pub mod pushdown;
/// Nesting-aware splitting of rendered expressions
pub mod splitter;
/// SQL serialization of translated expressions
pub mod sql;
/// Translation entry points
pub mod translator;

pub use classifier::{Shape, classify};
pub use column_types::{ColumnClass, ColumnTypeTable, PredicateOp, RecordFormat};
pub use errors::{Result, TranslationError};
pub use lexer::{Spanned, Token, is_balanced, tokenize};
pub use literal::{Literal, extract_column_name, extract_literal, extract_literal_list};
pub use node::{CompareOp, Node};
pub use pushdown::{PushdownMode, PushdownOptions, PushdownOutcome, apply_predicate};
pub use splitter::{split_top_level, strip_enclosing};
pub use sql::{expr_to_sql, sql_from_rendering};
pub use translator::{
    PredicateTranslator, TranslateOptions, is_predicate_pushdown_supported,
    supported_predicates_info, translate_gff_predicate, translate_predicate,
};

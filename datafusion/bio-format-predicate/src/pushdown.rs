//! Applying translated predicates to DataFusion data frames.
//!
//! A failed translation or a predicate DataFusion refuses to plan never aborts
//! the scan: the unfiltered frame is handed back and the caller filters the
//! materialized batches itself.

use crate::translator::PredicateTranslator;
use datafusion::common::DataFusionError;
use datafusion::dataframe::DataFrame;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// How a translated predicate reaches DataFusion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushdownMode {
    /// Filter with the translated expression tree.
    #[default]
    Expr,
    /// Serialize to SQL and re-parse it against the frame's schema.
    Sql,
}

impl Display for PushdownMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushdownMode::Expr => write!(f, "expr"),
            PushdownMode::Sql => write!(f, "sql"),
        }
    }
}

/// Options for [`apply_predicate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushdownOptions {
    /// Route taken by the translated predicate
    pub mode: PushdownMode,
}

/// Result of a pushdown attempt.
#[derive(Debug)]
pub enum PushdownOutcome {
    /// The predicate was pushed into the frame.
    Pushed(DataFrame),
    /// The predicate could not be pushed; `frame` is unfiltered.
    Fallback {
        /// The frame as it was passed in
        frame: DataFrame,
        /// Why the pushdown failed
        reason: DataFusionError,
    },
}

impl PushdownOutcome {
    /// True when the returned frame already applies the predicate.
    pub fn is_pushed(&self) -> bool {
        matches!(self, PushdownOutcome::Pushed(_))
    }

    /// The frame to scan, filtered or not.
    pub fn into_frame(self) -> DataFrame {
        match self {
            PushdownOutcome::Pushed(frame) => frame,
            PushdownOutcome::Fallback { frame, .. } => frame,
        }
    }
}

/// Pushes the host-library predicate rendering `predicate` into `frame`.
///
/// On any translation or planning failure the unfiltered frame is returned as
/// [`PushdownOutcome::Fallback`] and the reason is logged at warn level.
pub fn apply_predicate(
    frame: DataFrame,
    predicate: &str,
    translator: &PredicateTranslator<'_>,
    options: &PushdownOptions,
) -> PushdownOutcome {
    match filtered(&frame, predicate, translator, options) {
        Ok(pushed) => {
            debug!("Pushed down predicate {} ({} mode)", predicate.trim(), options.mode);
            PushdownOutcome::Pushed(pushed)
        }
        Err(reason) => {
            warn!(
                "Predicate pushdown failed for {}, falling back to client-side filtering: {}",
                predicate.trim(),
                reason
            );
            PushdownOutcome::Fallback { frame, reason }
        }
    }
}

fn filtered(
    frame: &DataFrame,
    predicate: &str,
    translator: &PredicateTranslator<'_>,
    options: &PushdownOptions,
) -> Result<DataFrame, DataFusionError> {
    let expr = match options.mode {
        PushdownMode::Expr => translator.translate(predicate)?,
        PushdownMode::Sql => {
            let sql = translator.translate_to_sql(predicate)?;
            debug!("SQL predicate: {}", sql);
            frame.parse_sql_expr(&sql)?
        }
    };
    frame.clone().filter(expr)
}

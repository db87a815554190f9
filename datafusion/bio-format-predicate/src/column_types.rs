//! Per-format column type classes and operator legality.
//!
//! String columns accept `==`, `!=`, `IN` and `NOT IN`; numeric columns accept the six
//! comparisons and `BETWEEN`. Columns missing from a table (BAM tags, VCF INFO/FORMAT
//! fields, GFF attributes) are unknown and accept every operator, leaving type
//! errors to DataFusion at execution time.

use crate::errors::{Result, TranslationError};
use crate::node::CompareOp;
use datafusion::arrow::datatypes::{DataType, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Operator whose legality depends on the column's type class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateOp {
    /// Binary comparison with a literal
    Compare(CompareOp),
    /// Membership test, negated or not
    In,
    /// Inclusive range test
    Between,
}

impl fmt::Display for PredicateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateOp::Compare(op) => write!(f, "{op}"),
            PredicateOp::In => f.write_str("IN"),
            PredicateOp::Between => f.write_str("BETWEEN"),
        }
    }
}

/// Type class of a known column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnClass {
    /// Utf8 columns: equality and membership only
    String,
    /// Integer and floating-point columns: comparisons and ranges
    Numeric,
}

impl ColumnClass {
    /// Whether `operator` may be applied to a column of this class.
    pub fn allows(self, operator: PredicateOp) -> bool {
        match self {
            ColumnClass::String => matches!(
                operator,
                PredicateOp::Compare(CompareOp::Eq | CompareOp::NotEq) | PredicateOp::In
            ),
            ColumnClass::Numeric => {
                matches!(operator, PredicateOp::Compare(_) | PredicateOp::Between)
            }
        }
    }
}

/// Record formats with a built-in column type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormat {
    /// GFF/GFF3 feature annotations
    Gff,
    /// BAM/SAM/CRAM alignment records
    Alignment,
    /// VCF variant calls
    Variant,
    /// Hi-C pairs
    Pairs,
    /// Pileup coverage output
    Pileup,
    /// Ensembl VEP cache variation records
    EnsemblCache,
}

impl RecordFormat {
    /// Built-in column type table for the format.
    pub fn column_types(self) -> ColumnTypeTable {
        let (string_columns, numeric_columns): (&[&str], &[&str]) = match self {
            RecordFormat::Gff => (
                &["chrom", "source", "type", "strand"],
                &["start", "end", "phase", "score"],
            ),
            RecordFormat::Alignment => (
                &[
                    "name",
                    "chrom",
                    "cigar",
                    "mate_chrom",
                    "sequence",
                    "quality_scores",
                ],
                &[
                    "start",
                    "end",
                    "flags",
                    "mapping_quality",
                    "mate_start",
                    "template_length",
                ],
            ),
            RecordFormat::Variant => (&["chrom", "ref", "alt"], &["start"]),
            RecordFormat::Pairs => (
                &["readID", "chr1", "chr2", "strand1", "strand2"],
                &["pos1", "pos2"],
            ),
            RecordFormat::Pileup => (&["contig"], &["pos", "pos_start", "pos_end", "coverage"]),
            RecordFormat::EnsemblCache => (
                &[
                    "chrom",
                    "ref",
                    "alt",
                    "id",
                    "filter",
                    "variation_name",
                    "allele_string",
                    "clin_sig",
                ],
                &["start", "end", "pos", "qual"],
            ),
        };
        ColumnTypeTable::new()
            .with_string_columns(string_columns.iter().copied())
            .with_numeric_columns(numeric_columns.iter().copied())
    }
}

impl fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordFormat::Gff => "gff",
            RecordFormat::Alignment => "alignment",
            RecordFormat::Variant => "variant",
            RecordFormat::Pairs => "pairs",
            RecordFormat::Pileup => "pileup",
            RecordFormat::EnsemblCache => "ensembl_cache",
        };
        f.write_str(name)
    }
}

impl FromStr for RecordFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gff" | "gff3" => Ok(RecordFormat::Gff),
            "alignment" | "bam" | "sam" | "cram" => Ok(RecordFormat::Alignment),
            "variant" | "vcf" => Ok(RecordFormat::Variant),
            "pairs" => Ok(RecordFormat::Pairs),
            "pileup" => Ok(RecordFormat::Pileup),
            "ensembl_cache" | "vep" => Ok(RecordFormat::EnsemblCache),
            other => Err(format!("Unknown record format: {other}")),
        }
    }
}

/// Mapping from column name to type class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnTypeTable {
    columns: BTreeMap<String, ColumnClass>,
}

impl ColumnTypeTable {
    /// Empty table; every column is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in table for a record format.
    pub fn for_format(format: RecordFormat) -> Self {
        format.column_types()
    }

    /// Derives a table from an Arrow schema.
    ///
    /// Utf8 fields become string columns, integer and float fields numeric columns;
    /// fields of any other type stay unknown.
    pub fn from_schema(schema: &Schema) -> Self {
        let mut table = Self::new();
        for field in schema.fields() {
            let class = match field.data_type() {
                DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => ColumnClass::String,
                DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Float16
                | DataType::Float32
                | DataType::Float64 => ColumnClass::Numeric,
                _ => continue,
            };
            table.insert(field.name().clone(), class);
        }
        table
    }

    /// Adds string columns.
    pub fn with_string_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            self.insert(column, ColumnClass::String);
        }
        self
    }

    /// Adds numeric columns.
    pub fn with_numeric_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            self.insert(column, ColumnClass::Numeric);
        }
        self
    }

    /// Sets the class of a column, replacing any previous one.
    pub fn insert(&mut self, column: impl Into<String>, class: ColumnClass) {
        self.columns.insert(column.into(), class);
    }

    /// Class of `column`, or `None` when the column is unknown.
    pub fn class_of(&self, column: &str) -> Option<ColumnClass> {
        self.columns.get(column).copied()
    }

    /// Number of known columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when no column is known.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Rejects `operator` when the column is known and its class forbids it.
    pub fn validate(&self, column: &str, operator: PredicateOp) -> Result<()> {
        match self.class_of(column) {
            Some(class) if !class.allows(operator) => Err(TranslationError::IllegalOperator {
                column: column.to_string(),
                operator,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::datatypes::Field;

    #[test]
    fn test_string_column_operators() {
        let table = RecordFormat::Variant.column_types();
        assert!(table.validate("chrom", PredicateOp::Compare(CompareOp::Eq)).is_ok());
        assert!(table.validate("chrom", PredicateOp::Compare(CompareOp::NotEq)).is_ok());
        assert!(table.validate("chrom", PredicateOp::In).is_ok());
        assert_eq!(
            table.validate("chrom", PredicateOp::Compare(CompareOp::Gt)),
            Err(TranslationError::IllegalOperator {
                column: "chrom".to_string(),
                operator: PredicateOp::Compare(CompareOp::Gt),
            })
        );
        assert!(table.validate("ref", PredicateOp::Between).is_err());
    }

    #[test]
    fn test_numeric_column_operators() {
        let table = RecordFormat::Gff.column_types();
        for op in [
            CompareOp::Eq,
            CompareOp::NotEq,
            CompareOp::Lt,
            CompareOp::LtEq,
            CompareOp::Gt,
            CompareOp::GtEq,
        ] {
            assert!(table.validate("start", PredicateOp::Compare(op)).is_ok());
        }
        assert!(table.validate("score", PredicateOp::Between).is_ok());
        assert!(table.validate("phase", PredicateOp::In).is_err());
    }

    #[test]
    fn test_unknown_columns_are_permissive() {
        let table = RecordFormat::Alignment.column_types();
        assert_eq!(table.class_of("NM"), None);
        assert!(table.validate("NM", PredicateOp::Compare(CompareOp::Gt)).is_ok());
        assert!(table.validate("NM", PredicateOp::In).is_ok());
    }

    #[test]
    fn test_format_tables() {
        let pairs = ColumnTypeTable::for_format(RecordFormat::Pairs);
        assert_eq!(pairs.class_of("readID"), Some(ColumnClass::String));
        assert_eq!(pairs.class_of("pos2"), Some(ColumnClass::Numeric));
        assert_eq!(pairs.len(), 7);

        let alignment = RecordFormat::Alignment.column_types();
        assert_eq!(
            alignment.class_of("template_length"),
            Some(ColumnClass::Numeric)
        );
        assert_eq!(alignment.class_of("cigar"), Some(ColumnClass::String));
    }

    #[test]
    fn test_record_format_from_str() {
        assert_eq!("BAM".parse::<RecordFormat>(), Ok(RecordFormat::Alignment));
        assert_eq!("cram".parse::<RecordFormat>(), Ok(RecordFormat::Alignment));
        assert_eq!("vcf".parse::<RecordFormat>(), Ok(RecordFormat::Variant));
        assert_eq!(" gff3 ".parse::<RecordFormat>(), Ok(RecordFormat::Gff));
        assert_eq!("vep".parse::<RecordFormat>(), Ok(RecordFormat::EnsemblCache));
        assert!("fastq".parse::<RecordFormat>().is_err());
    }

    #[test]
    fn test_from_schema() {
        let schema = Schema::new(vec![
            Field::new("chrom", DataType::Utf8, false),
            Field::new("start", DataType::UInt32, false),
            Field::new("score", DataType::Float32, true),
            Field::new("is_reverse", DataType::Boolean, false),
        ]);
        let table = ColumnTypeTable::from_schema(&schema);
        assert_eq!(table.class_of("chrom"), Some(ColumnClass::String));
        assert_eq!(table.class_of("start"), Some(ColumnClass::Numeric));
        assert_eq!(table.class_of("score"), Some(ColumnClass::Numeric));
        assert_eq!(table.class_of("is_reverse"), None);
    }

    #[test]
    fn test_builder_overrides_class() {
        let table = ColumnTypeTable::new()
            .with_string_columns(["qual"])
            .with_numeric_columns(["qual"]);
        assert_eq!(table.class_of("qual"), Some(ColumnClass::Numeric));
        assert!(!table.is_empty());
    }
}

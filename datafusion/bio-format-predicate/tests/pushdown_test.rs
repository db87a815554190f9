use datafusion::arrow::array::{Int64Array, RecordBatch, StringArray, UInt32Array};
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use datafusion::logical_expr::ident;
use datafusion::prelude::*;
use datafusion_bio_format_predicate::{
    PredicateTranslator, PushdownMode, PushdownOptions, PushdownOutcome, RecordFormat,
    apply_predicate,
};
use std::sync::Arc;

/// A few pairs records with the column names of the Hi-C pairs reader.
async fn create_pairs_frame() -> Result<(SessionContext, DataFrame), Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let schema = Arc::new(Schema::new(vec![
        Field::new("readID", DataType::Utf8, false),
        Field::new("chr1", DataType::Utf8, false),
        Field::new("pos1", DataType::UInt32, false),
        Field::new("chr2", DataType::Utf8, false),
        Field::new("pos2", DataType::UInt32, false),
        Field::new("distance", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["r1", "r2", "r3", "r4"])),
            Arc::new(StringArray::from(vec!["chr1", "chr1", "chr2", "chr1"])),
            Arc::new(UInt32Array::from(vec![10, 500, 20, 9000])),
            Arc::new(StringArray::from(vec!["chr1", "chr2", "chr2", "chr1"])),
            Arc::new(UInt32Array::from(vec![80, 40, 700, 9100])),
            Arc::new(Int64Array::from(vec![70, -10, 680, 100])),
        ],
    )?;
    let ctx = SessionContext::new();
    ctx.register_batch("pairs", batch)?;
    let frame = ctx.table("pairs").await?;
    Ok((ctx, frame))
}

async fn read_ids(frame: DataFrame) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let batches = frame
        .select_columns(&["readID"])?
        .sort(vec![ident("readID").sort(true, false)])?
        .collect()
        .await?;
    let mut ids = Vec::new();
    for batch in batches {
        let column = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or("readID is not a string column")?;
        ids.extend(column.iter().flatten().map(str::to_string));
    }
    Ok(ids)
}

#[tokio::test]
async fn test_expr_mode_pushes_predicate() -> Result<(), Box<dyn std::error::Error>> {
    let (_ctx, frame) = create_pairs_frame().await?;
    let translator = PredicateTranslator::for_format(RecordFormat::Pairs);

    let outcome = apply_predicate(
        frame,
        r#"[([(col("chr1")) == ("chr1")]) & ([(col("pos1")) < (dyn int: 1000)])]"#,
        &translator,
        &PushdownOptions::default(),
    );
    assert!(outcome.is_pushed());
    assert_eq!(read_ids(outcome.into_frame()).await?, vec!["r1", "r2"]);
    Ok(())
}

#[tokio::test]
async fn test_sql_mode_quotes_mixed_case_columns() -> Result<(), Box<dyn std::error::Error>> {
    let (_ctx, frame) = create_pairs_frame().await?;
    let translator = PredicateTranslator::for_format(RecordFormat::Pairs);
    let options = PushdownOptions {
        mode: PushdownMode::Sql,
    };

    let outcome = apply_predicate(
        frame,
        r#"~(col("readID").is_in([["r1", "r3"]]))"#,
        &translator,
        &options,
    );
    assert!(outcome.is_pushed());
    assert_eq!(read_ids(outcome.into_frame()).await?, vec!["r2", "r4"]);
    Ok(())
}

#[tokio::test]
async fn test_sql_mode_negative_literal() -> Result<(), Box<dyn std::error::Error>> {
    let (_ctx, frame) = create_pairs_frame().await?;
    let translator = PredicateTranslator::permissive();
    let options = PushdownOptions {
        mode: PushdownMode::Sql,
    };

    let outcome = apply_predicate(
        frame,
        r#"[(col("distance")) > (dyn int: -5)]"#,
        &translator,
        &options,
    );
    assert!(outcome.is_pushed());
    assert_eq!(read_ids(outcome.into_frame()).await?, vec!["r1", "r3", "r4"]);
    Ok(())
}

#[tokio::test]
async fn test_untranslatable_predicate_falls_back() -> Result<(), Box<dyn std::error::Error>> {
    let (_ctx, frame) = create_pairs_frame().await?;
    let translator = PredicateTranslator::for_format(RecordFormat::Pairs);

    let outcome = apply_predicate(
        frame,
        r#"[(col("pos1")) < (col("pos2"))]"#,
        &translator,
        &PushdownOptions::default(),
    );
    let PushdownOutcome::Fallback { frame, reason } = outcome else {
        panic!("expected a fallback");
    };
    assert!(reason.to_string().contains("Unsupported expression type"));
    assert_eq!(read_ids(frame).await?.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_illegal_operator_falls_back() -> Result<(), Box<dyn std::error::Error>> {
    let (_ctx, frame) = create_pairs_frame().await?;
    let translator = PredicateTranslator::for_format(RecordFormat::Pairs);

    let outcome = apply_predicate(
        frame,
        r#"[(col("chr2")) >= ("chr1")]"#,
        &translator,
        &PushdownOptions::default(),
    );
    assert!(!outcome.is_pushed());
    assert_eq!(read_ids(outcome.into_frame()).await?.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_unknown_column_falls_back_at_planning() -> Result<(), Box<dyn std::error::Error>> {
    for mode in [PushdownMode::Expr, PushdownMode::Sql] {
        let (_ctx, frame) = create_pairs_frame().await?;
        let translator = PredicateTranslator::permissive();

        let outcome = apply_predicate(
            frame,
            r#"[(col("mapq")) > (dyn int: 30)]"#,
            &translator,
            &PushdownOptions { mode },
        );
        assert!(!outcome.is_pushed(), "{mode} mode should not push");
        assert_eq!(read_ids(outcome.into_frame()).await?.len(), 4);
    }
    Ok(())
}

#[tokio::test]
async fn test_unbalanced_predicate_falls_back() -> Result<(), Box<dyn std::error::Error>> {
    for mode in [PushdownMode::Expr, PushdownMode::Sql] {
        let (_ctx, frame) = create_pairs_frame().await?;
        let translator = PredicateTranslator::permissive();

        let outcome = apply_predicate(
            frame,
            r#"col("chr1")) & (col("chr2")"#,
            &translator,
            &PushdownOptions { mode },
        );
        assert!(!outcome.is_pushed(), "{mode} mode should not push");
        assert_eq!(read_ids(outcome.into_frame()).await?.len(), 4);
    }
    Ok(())
}

use datafusion::arrow::array::{RecordBatch, StringArray, UInt32Array};
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use datafusion::prelude::SessionContext;
use datafusion_bio_format_predicate::{
    PredicateTranslator, PushdownMode, PushdownOptions, RecordFormat, apply_predicate,
    supported_predicates_info,
};
use std::sync::Arc;

const PREDICATES: [&str; 5] = [
    r#"[(col("chrom")) == ("chr1")]"#,
    r#"[([(col("chrom")) == ("chr1")]) & ([(col("start")) > (dyn int: 1000)])]"#,
    r#"~(col("chrom").is_in([["chr2", "chrX"]]))"#,
    r#"[(col("chrom")) > (dyn int: 5)]"#,
    r#"[([(col("start")) > (dyn int: 1)]) | ([(col("start")) < (dyn int: 5)])]"#,
];

#[tokio::main(flavor = "multi_thread")]
async fn main() -> datafusion::error::Result<()> {
    env_logger::init();
    println!("{}", supported_predicates_info());

    let translator = PredicateTranslator::for_format(RecordFormat::Variant);
    for predicate in PREDICATES {
        match translator.translate_to_sql(predicate) {
            Ok(sql) => println!("{predicate}\n  -> {sql}"),
            Err(err) => println!("{predicate}\n  -> not pushed down: {err}"),
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("chrom", DataType::Utf8, false),
        Field::new("start", DataType::UInt32, false),
        Field::new("ref", DataType::Utf8, false),
        Field::new("alt", DataType::Utf8, false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["chr1", "chr1", "chr2", "chrX"])),
            Arc::new(UInt32Array::from(vec![500, 1500, 2500, 3500])),
            Arc::new(StringArray::from(vec!["A", "C", "G", "T"])),
            Arc::new(StringArray::from(vec!["G", "T", "A", "C"])),
        ],
    )?;
    let ctx = SessionContext::new();
    ctx.register_batch("variants", batch)?;

    let options = PushdownOptions {
        mode: PushdownMode::Sql,
    };
    for predicate in PREDICATES {
        let frame = ctx.table("variants").await?;
        let outcome = apply_predicate(frame, predicate, &translator, &options);
        println!("{predicate} (pushed down: {})", outcome.is_pushed());
        outcome.into_frame().show().await?;
    }

    Ok(())
}

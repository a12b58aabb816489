//! The Parquet walkthrough: generated transactions.

use crate::{Flow, WalkthroughOptions, WalkthroughOutcome};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use term_expect::prelude::*;
use tracing::info;

pub const DATASOURCE: &str = "my_parquet_datasource";
pub const ASSET: &str = "transactions_asset";
pub const BATCH_DEFINITION: &str = "my_batch_def";
pub const SUITE: &str = "transactions_suite";

/// Location of the generated file, relative to the project directory.
pub const PARQUET_PATH: &str = "data/transactions.parquet";

pub const TRANSACTION_COUNT: usize = 100;

const MICROS_PER_HOUR: i64 = 3_600_000_000;

pub fn expectations() -> Vec<Expectation> {
    vec![
        Expectation::between("amount", 0.0, 10_000.0),
        Expectation::in_set("currency", ["USD", "EUR"]),
        Expectation::not_null("timestamp"),
    ]
}

/// Builds [`TRANSACTION_COUNT`] USD transactions with ids from 1, amounts
/// drawn uniformly from `[10, 1000)` and hourly timestamps from 2023-01-01.
pub fn generate_transactions<R: Rng + ?Sized>(rng: &mut R) -> Result<RecordBatch> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| TermError::Internal("invalid start date".to_string()))?
        .and_utc()
        .timestamp_micros();

    let ids: Vec<i64> = (1..=TRANSACTION_COUNT as i64).collect();
    let amounts: Vec<f64> = (0..TRANSACTION_COUNT)
        .map(|_| rng.random_range(10.0..1000.0))
        .collect();
    let currencies = vec!["USD"; TRANSACTION_COUNT];
    let timestamps: Vec<i64> = (0..TRANSACTION_COUNT as i64)
        .map(|hour| start + hour * MICROS_PER_HOUR)
        .collect();

    let schema = Arc::new(Schema::new(vec![
        Field::new("transaction_id", DataType::Int64, false),
        Field::new("amount", DataType::Float64, false),
        Field::new("currency", DataType::Utf8, false),
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        ),
    ]));

    Ok(RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)) as ArrayRef,
            Arc::new(Float64Array::from(amounts)),
            Arc::new(StringArray::from(currencies)),
            Arc::new(TimestampMicrosecondArray::from(timestamps)),
        ],
    )?)
}

/// Writes `batch` to `path` as Parquet, replacing any existing file.
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let to_error = |e: parquet::errors::ParquetError| {
        TermError::data_source_with_source(
            "Parquet",
            format!("failed to write {}", path.display()),
            Box::new(e),
        )
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).map_err(to_error)?;
    writer.write(batch).map_err(to_error)?;
    writer.close().map_err(to_error)?;
    Ok(())
}

/// Runs [`write_parquet`] on the blocking pool.
pub async fn save_transactions(path: PathBuf, batch: RecordBatch) -> Result<()> {
    tokio::task::spawn_blocking(move || write_parquet(&path, &batch))
        .await
        .map_err(|e| TermError::Internal(format!("Parquet writer task failed: {e}")))?
}

/// Regenerates the transactions file, then validates it against the
/// transactions suite.
pub async fn run(options: &WalkthroughOptions) -> Result<WalkthroughOutcome> {
    let path = options.project_dir.join(PARQUET_PATH);
    info!(path = %path.display(), "Generating Parquet data");
    let transactions = generate_transactions(&mut rand::rng())?;
    save_transactions(path, transactions).await?;

    Flow {
        datasource: DATASOURCE,
        asset: ASSET,
        kind: AssetKind::parquet(PARQUET_PATH),
        batch_definition: BATCH_DEFINITION,
        partitioner: BatchPartitioner::Path {
            path: PARQUET_PATH.into(),
        },
        suite: SUITE,
        rules: expectations(),
        batch_identifier: None,
    }
    .run(options, BatchParameters::new())
    .await
}

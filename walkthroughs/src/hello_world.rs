//! The hello-world walkthrough: a three-row in-memory table.

use crate::{Flow, WalkthroughOptions, WalkthroughOutcome};
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use term_expect::prelude::*;

pub const DATASOURCE: &str = "my_pandas_datasource";
pub const ASSET: &str = "my_df_asset";
pub const BATCH_DEFINITION: &str = "my_batch_def";
pub const SUITE: &str = "my_hello_world_suite";
pub const BATCH_IDENTIFIER: &str = "my_batch";

/// `name: [Alice, Bob, Charlie]`, `age: [25, 30, 35]`.
pub fn sample_people() -> Result<RecordBatch> {
    Ok(RecordBatch::try_from_iter(vec![
        (
            "name",
            Arc::new(StringArray::from(vec!["Alice", "Bob", "Charlie"])) as ArrayRef,
        ),
        ("age", Arc::new(Int64Array::from(vec![25, 30, 35])) as ArrayRef),
    ])?)
}

/// The suite's rules: names present, ages in `[20, 40]`.
pub fn expectations() -> Vec<Expectation> {
    vec![
        Expectation::not_null("name"),
        Expectation::between("age", 20.0, 40.0),
    ]
}

/// Validates `table` against the hello-world suite.
pub async fn run(options: &WalkthroughOptions, table: RecordBatch) -> Result<WalkthroughOutcome> {
    Flow {
        datasource: DATASOURCE,
        asset: ASSET,
        kind: AssetKind::Dataframe,
        batch_definition: BATCH_DEFINITION,
        partitioner: BatchPartitioner::WholeTable,
        suite: SUITE,
        rules: expectations(),
        batch_identifier: Some(BATCH_IDENTIFIER),
    }
    .run(options, BatchParameters::dataframe(table))
    .await
}

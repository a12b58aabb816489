//! The CSV walkthrough: `data/employees.csv`.

use crate::{Flow, WalkthroughOptions, WalkthroughOutcome};
use std::path::Path;
use term_expect::prelude::*;
use tracing::info;

pub const DATASOURCE: &str = "my_csv_datasource";
pub const ASSET: &str = "employees_asset";
pub const BATCH_DEFINITION: &str = "my_batch_def";
pub const SUITE: &str = "employees_suite";

/// Location of the employees file, relative to the project directory.
pub const CSV_PATH: &str = "data/employees.csv";

/// Departments an employee may belong to.
pub const DEPARTMENTS: [&str; 4] = ["Engineering", "Marketing", "HR", "Sales"];

/// The employees file shipped with the walkthroughs.
pub const SAMPLE_EMPLOYEES: &str = include_str!("../data/employees.csv");

pub fn expectations() -> Vec<Expectation> {
    vec![
        Expectation::unique("id"),
        Expectation::in_set("department", DEPARTMENTS),
        Expectation::between("salary", 0.0, 200_000.0),
        Expectation::not_null("name"),
    ]
}

/// Writes [`SAMPLE_EMPLOYEES`] into a project that does not have it yet.
pub async fn ensure_sample_data(project_dir: &Path) -> Result<()> {
    let path = project_dir.join(CSV_PATH);
    if tokio::fs::try_exists(&path).await? {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, SAMPLE_EMPLOYEES).await?;
    info!(path = %path.display(), "Wrote sample employees file");
    Ok(())
}

/// Validates the employees file against the employees suite.
pub async fn run(options: &WalkthroughOptions) -> Result<WalkthroughOutcome> {
    info!(path = CSV_PATH, "Reading CSV");
    Flow {
        datasource: DATASOURCE,
        asset: ASSET,
        kind: AssetKind::csv(CSV_PATH),
        batch_definition: BATCH_DEFINITION,
        partitioner: BatchPartitioner::Path {
            path: CSV_PATH.into(),
        },
        suite: SUITE,
        rules: expectations(),
        batch_identifier: None,
    }
    .run(options, BatchParameters::new())
    .await
}

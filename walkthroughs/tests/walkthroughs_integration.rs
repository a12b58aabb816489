//! Repeated-run behaviour of the three walkthroughs.

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use tempfile::TempDir;
use term_expect::prelude::*;
use term_expect_walkthroughs::{
    csv_validation, hello_world, parquet_validation, WalkthroughOptions,
};

fn options(project: &TempDir) -> WalkthroughOptions {
    WalkthroughOptions::new(project.path())
}

async fn stored_results(project: &TempDir) -> usize {
    let context = DataContext::open_or_create(project.path()).await.unwrap();
    context.validation_results_store().len().await.unwrap()
}

#[tokio::test]
async fn test_hello_world_twice() {
    let project = TempDir::new().unwrap();
    let options = options(&project);

    let first = hello_world::run(&options, hello_world::sample_people().unwrap())
        .await
        .unwrap();
    assert!(first.registrations.datasource_created);
    assert!(first.registrations.suite_created);
    assert_eq!(first.population, Population::Populated(2));
    assert!(first.result.success);
    assert_eq!(first.result_key.batch_identifier(), "my_batch");
    assert_eq!(first.result_key.run_id().run_name(), Some("my_run"));

    let second = hello_world::run(&options, hello_world::sample_people().unwrap())
        .await
        .unwrap();
    assert!(second.registrations.all_existing());
    assert_eq!(second.population, Population::AlreadyPopulated(2));
    assert!(second.result.success);
    assert_ne!(first.result_key, second.result_key);

    assert_eq!(stored_results(&project).await, 2);
    assert_eq!(second.docs.validation_pages, 2);
    assert!(second.docs.index_path.exists());

    let summary = second.summary().unwrap();
    assert!(summary.contains("Using existing datasource"));
    assert!(summary.contains("Suite already has 2 expectations"));
}

#[tokio::test]
async fn test_hello_world_violations_still_complete() {
    let project = TempDir::new().unwrap();
    let options = options(&project);

    let table = RecordBatch::try_from_iter(vec![
        (
            "name",
            Arc::new(StringArray::from(vec![Some("Alice"), None, Some("Charlie")])) as ArrayRef,
        ),
        (
            "age",
            Arc::new(Int64Array::from(vec![25, 30, 41])) as ArrayRef,
        ),
    ])
    .unwrap();

    let outcome = hello_world::run(&options, table).await.unwrap();
    assert!(!outcome.result.success);
    assert_eq!(outcome.result.failed().count(), 2);
    assert_eq!(outcome.result.statistics.unsuccessful_expectations, 2);
    assert_eq!(stored_results(&project).await, 1);
}

#[tokio::test]
async fn test_csv_walkthrough() {
    let project = TempDir::new().unwrap();
    let options = options(&project);
    csv_validation::ensure_sample_data(project.path()).await.unwrap();

    let first = csv_validation::run(&options).await.unwrap();
    assert!(first.result.success, "{}", first.summary().unwrap());
    assert_eq!(first.population, Population::Populated(4));
    assert_eq!(
        first.result_key.batch_identifier(),
        "my_csv_datasource-employees_asset"
    );

    let second = csv_validation::run(&options).await.unwrap();
    assert!(second.registrations.all_existing());
    assert_eq!(second.population, Population::AlreadyPopulated(4));
    assert_eq!(stored_results(&project).await, 2);
}

#[tokio::test]
async fn test_csv_walkthrough_reports_bad_rows() {
    let project = TempDir::new().unwrap();
    let options = options(&project);
    std::fs::create_dir_all(project.path().join("data")).unwrap();
    std::fs::write(
        project.path().join(csv_validation::CSV_PATH),
        "id,name,department,salary\n1,Alice,Engineering,90000\n1,Bob,Legal,250000\n3,,HR,50000\n",
    )
    .unwrap();

    let outcome = csv_validation::run(&options).await.unwrap();
    assert!(!outcome.result.success);

    let failed: Vec<&str> = outcome
        .result
        .failed()
        .map(|r| r.expectation_config.column())
        .collect();
    assert_eq!(failed, vec!["id", "department", "salary", "name"]);
}

#[tokio::test]
async fn test_missing_csv_is_an_error() {
    let project = TempDir::new().unwrap();
    let err = csv_validation::run(&options(&project)).await.unwrap_err();
    assert!(matches!(err, TermError::DataSource { .. }));
}

#[tokio::test]
async fn test_parquet_walkthrough() {
    let project = TempDir::new().unwrap();
    let options = options(&project);

    let first = parquet_validation::run(&options).await.unwrap();
    assert!(project.path().join(parquet_validation::PARQUET_PATH).exists());
    assert!(first.result.success, "{}", first.summary().unwrap());
    assert_eq!(first.result.meta.row_count, parquet_validation::TRANSACTION_COUNT);
    assert_eq!(first.population, Population::Populated(3));

    let second = parquet_validation::run(&options).await.unwrap();
    assert!(second.registrations.all_existing());
    assert_eq!(stored_results(&project).await, 2);
}

#[tokio::test]
async fn test_walkthroughs_share_one_context() {
    let project = TempDir::new().unwrap();
    let options = options(&project);
    csv_validation::ensure_sample_data(project.path()).await.unwrap();

    hello_world::run(&options, hello_world::sample_people().unwrap())
        .await
        .unwrap();
    csv_validation::run(&options).await.unwrap();
    let last = parquet_validation::run(&options).await.unwrap();

    assert_eq!(last.docs.validation_pages, 3);
    assert_eq!(last.docs.suite_pages, 3);

    let context = DataContext::open_or_create(project.path()).await.unwrap();
    assert_eq!(context.datasources().len(), 3);
    assert_eq!(
        context.suites().list_names().await.unwrap(),
        vec!["employees_suite", "my_hello_world_suite", "transactions_suite"]
    );
}

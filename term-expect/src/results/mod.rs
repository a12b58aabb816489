//! Validation results, their identifiers and the stores they persist in.

use crate::batch::{Batch, BatchSpec};
use crate::expectations::{ColumnMapResult, Expectation, ExpectationOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod identifier;
mod store;

pub use identifier::{RunIdentifier, ValidationResultIdentifier, RUN_TIME_FORMAT, UNNAMED_RUN};
pub use store::{FilesystemResultStore, InMemoryResultStore, ValidationResultStore};

/// Outcome of one expectation within a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationValidationResult {
    pub success: bool,
    pub expectation_config: Expectation,
    pub result: ColumnMapResult,
}

impl ExpectationValidationResult {
    pub fn new(expectation: Expectation, outcome: ExpectationOutcome) -> Self {
        Self {
            success: outcome.success,
            expectation_config: expectation,
            result: outcome.result,
        }
    }
}

/// Counts over the expectations of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationStatistics {
    pub evaluated_expectations: usize,
    pub successful_expectations: usize,
    pub unsuccessful_expectations: usize,
    /// `None` when the suite was empty.
    pub success_percent: Option<f64>,
}

impl ValidationStatistics {
    pub fn from_results(results: &[ExpectationValidationResult]) -> Self {
        let evaluated = results.len();
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            evaluated_expectations: evaluated,
            successful_expectations: successful,
            unsuccessful_expectations: evaluated - successful,
            success_percent: if evaluated == 0 {
                None
            } else {
                Some(successful as f64 / evaluated as f64 * 100.0)
            },
        }
    }
}

/// Where a result came from and when it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMeta {
    pub batch_id: String,
    pub datasource_name: String,
    pub asset_name: String,
    pub batch_definition: String,
    pub batch_spec: BatchSpec,
    pub row_count: usize,
    pub validation_time: DateTime<Utc>,
    /// Set when the result is stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunIdentifier>,
}

impl ValidationMeta {
    pub fn for_batch(batch: &Batch) -> Self {
        Self {
            batch_id: batch.id().to_string(),
            datasource_name: batch.datasource_name().to_string(),
            asset_name: batch.asset_name().to_string(),
            batch_definition: batch.batch_definition_name().to_string(),
            batch_spec: batch.spec().clone(),
            row_count: batch.row_count(),
            validation_time: Utc::now(),
            run_id: None,
        }
    }
}

/// Aggregate result of validating one batch against one suite.
///
/// `success` is true only when every expectation succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    pub suite_name: String,
    pub results: Vec<ExpectationValidationResult>,
    pub statistics: ValidationStatistics,
    pub meta: ValidationMeta,
}

impl ValidationResult {
    pub fn new(
        suite_name: impl Into<String>,
        results: Vec<ExpectationValidationResult>,
        meta: ValidationMeta,
    ) -> Self {
        Self {
            success: results.iter().all(|r| r.success),
            suite_name: suite_name.into(),
            statistics: ValidationStatistics::from_results(&results),
            results,
            meta,
        }
    }

    /// Records the run this result was stored under.
    pub fn with_run_id(mut self, run_id: RunIdentifier) -> Self {
        self.meta.run_id = Some(run_id);
        self
    }

    /// Expectations that did not succeed, in suite order.
    pub fn failed(&self) -> impl Iterator<Item = &ExpectationValidationResult> {
        self.results.iter().filter(|r| !r.success)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::sample_result;
    use super::*;

    #[test]
    fn test_success_requires_every_expectation() {
        let passing = sample_result("s", true);
        assert!(passing.success);
        assert_eq!(passing.statistics.successful_expectations, 2);
        assert_eq!(passing.statistics.success_percent, Some(100.0));
        assert_eq!(passing.failed().count(), 0);

        let failing = sample_result("s", false);
        assert!(!failing.success);
        assert_eq!(failing.statistics.unsuccessful_expectations, 1);
        assert_eq!(failing.statistics.success_percent, Some(50.0));
        assert_eq!(
            failing.failed().next().unwrap().expectation_config.column(),
            "age"
        );
    }

    #[test]
    fn test_empty_statistics() {
        let stats = ValidationStatistics::from_results(&[]);
        assert_eq!(stats.evaluated_expectations, 0);
        assert_eq!(stats.success_percent, None);
    }

    #[test]
    fn test_serialized_shape() {
        let result = sample_result("my_hello_world_suite", true)
            .with_run_id(RunIdentifier::named("my_run").unwrap());
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["suite_name"], "my_hello_world_suite");
        assert_eq!(
            json["results"][1]["expectation_config"]["expectation_type"],
            "expect_column_values_to_be_between"
        );
        assert_eq!(json["meta"]["run_id"]["run_name"], "my_run");
        assert_eq!(json["meta"]["batch_spec"]["type"], "dataframe");

        let back: ValidationResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}

//! Binding of a batch to a suite.

use crate::batch::Batch;
use crate::expectations::Expectation;
use crate::prelude::*;
use crate::results::{ExpectationValidationResult, ValidationMeta, ValidationResult};
use crate::suite::ExpectationSuite;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Runs the expectations of a suite against one batch.
#[derive(Debug, Clone)]
pub struct Validator {
    batch: Batch,
    suite: ExpectationSuite,
}

impl Validator {
    pub fn new(batch: Batch, suite: ExpectationSuite) -> Self {
        Self { batch, suite }
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn suite(&self) -> &ExpectationSuite {
        &self.suite
    }

    /// Evaluates a single expectation without adding it to the suite.
    pub async fn validate_expectation(
        &self,
        expectation: &Expectation,
    ) -> Result<ExpectationValidationResult> {
        let outcome = expectation.evaluate(&self.batch).await?;
        Ok(ExpectationValidationResult::new(expectation.clone(), outcome))
    }

    /// Evaluates every expectation in suite order.
    ///
    /// Failing expectations are reported in the result; only faults such as a
    /// missing column abort the run.
    #[instrument(skip(self), fields(
        suite = %self.suite.name,
        batch.id = %self.batch.id(),
        expectations = self.suite.len()
    ))]
    pub async fn validate(&self) -> Result<ValidationResult> {
        let start = Instant::now();
        let meta = ValidationMeta::for_batch(&self.batch);

        let mut results = Vec::with_capacity(self.suite.len());
        for expectation in &self.suite.expectations {
            let result = self.validate_expectation(expectation).await?;
            if !result.success {
                warn!(
                    expectation_type = expectation.expectation_type(),
                    column = %expectation.column(),
                    unexpected_count = result.result.unexpected_count,
                    "Expectation failed"
                );
            }
            results.push(result);
        }

        let result = ValidationResult::new(&self.suite.name, results, meta);
        info!(
            success = result.success,
            successful = result.statistics.successful_expectations,
            evaluated = result.statistics.evaluated_expectations,
            duration_ms = start.elapsed().as_millis() as u64,
            "Validation completed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectations::test_support::batch_of;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    fn people(names: Vec<Option<&str>>, ages: Vec<i64>) -> RecordBatch {
        RecordBatch::try_from_iter(vec![
            ("name", Arc::new(StringArray::from(names)) as ArrayRef),
            ("age", Arc::new(Int64Array::from(ages)) as ArrayRef),
        ])
        .unwrap()
    }

    fn hello_world_suite() -> ExpectationSuite {
        let mut suite = ExpectationSuite::new("my_hello_world_suite").unwrap();
        suite.add_expectation(Expectation::not_null("name")).unwrap();
        suite
            .add_expectation(Expectation::between("age", 20.0, 40.0))
            .unwrap();
        suite
    }

    #[tokio::test]
    async fn test_all_expectations_pass() {
        let batch = batch_of(people(
            vec![Some("Alice"), Some("Bob"), Some("Charlie")],
            vec![25, 30, 35],
        ))
        .await;
        let result = Validator::new(batch, hello_world_suite())
            .validate()
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.results.len(), 2);
        assert_eq!(result.suite_name, "my_hello_world_suite");
        assert_eq!(result.meta.row_count, 3);
        assert!(result.meta.run_id.is_none());
    }

    #[tokio::test]
    async fn test_violations_are_results_not_errors() {
        let batch = batch_of(people(
            vec![Some("Alice"), None, Some("Charlie")],
            vec![25, 30, 45],
        ))
        .await;
        let result = Validator::new(batch, hello_world_suite())
            .validate()
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.results.iter().all(|r| !r.success));
        assert_eq!(result.results[0].expectation_config.column(), "name");
    }

    #[tokio::test]
    async fn test_missing_column_aborts() {
        let batch = batch_of(people(vec![Some("Alice")], vec![25])).await;
        let mut suite = hello_world_suite();
        suite.add_expectation(Expectation::unique("id")).unwrap();

        let err = Validator::new(batch, suite).validate().await.unwrap_err();
        assert!(matches!(err, TermError::ColumnNotFound { .. }));
    }
}

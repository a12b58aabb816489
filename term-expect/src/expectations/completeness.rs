//! Not-null expectation.

use super::ColumnMapExpectation;
use crate::prelude::*;
use serde::{Deserialize, Serialize};

/// Values in a column must not be null.
///
/// Unlike the other column-map expectations, nulls are the unexpected rows
/// here, so percentages are taken over all rows.
///
/// # Examples
///
/// ```rust
/// use term_expect::expectations::{ColumnMapExpectation, NotNullExpectation};
///
/// let e = NotNullExpectation::new("name").with_mostly(0.95);
/// assert_eq!(e.expectation_type(), "expect_column_values_to_not_be_null");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotNullExpectation {
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mostly: Option<f64>,
}

impl NotNullExpectation {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            mostly: None,
        }
    }

    /// Tolerates up to `1 - mostly` of the rows being null.
    pub fn with_mostly(mut self, mostly: f64) -> Self {
        self.mostly = Some(mostly);
        self
    }
}

impl ColumnMapExpectation for NotNullExpectation {
    fn expectation_type(&self) -> &'static str {
        "expect_column_values_to_not_be_null"
    }

    fn column(&self) -> &str {
        &self.column
    }

    fn mostly(&self) -> Option<f64> {
        self.mostly
    }

    fn unexpected_condition(&self, column: &str, _table: &str) -> Result<String> {
        Ok(format!("{column} IS NULL"))
    }

    fn counts_missing_as_unexpected(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("values in '{}' must never be null", self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectations::test_support::batch_of;
    use arrow::array::{ArrayRef, Float64Array, StringArray};
    use arrow::record_batch::RecordBatch;
    use serde_json::Value;
    use std::sync::Arc;

    async fn names(values: Vec<Option<&str>>) -> crate::batch::Batch {
        batch_of(
            RecordBatch::try_from_iter(vec![(
                "name",
                Arc::new(StringArray::from(values)) as ArrayRef,
            )])
            .unwrap(),
        )
        .await
    }

    #[tokio::test]
    async fn test_all_present() {
        let batch = names(vec![Some("Alice"), Some("Bob"), Some("Charlie")]).await;
        let outcome = NotNullExpectation::new("name").evaluate(&batch).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.result.element_count, 3);
        assert_eq!(outcome.result.unexpected_count, 0);
        assert_eq!(outcome.result.unexpected_percent, Some(0.0));
        assert_eq!(outcome.result.missing_count, None);
    }

    #[tokio::test]
    async fn test_null_is_unexpected() {
        let batch = names(vec![Some("Alice"), None, Some("Charlie"), Some("Dana")]).await;
        let outcome = NotNullExpectation::new("name").evaluate(&batch).await.unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.result.unexpected_count, 1);
        assert_eq!(outcome.result.unexpected_percent, Some(25.0));
        assert_eq!(outcome.result.partial_unexpected_list, vec![Value::Null]);
    }

    #[tokio::test]
    async fn test_mostly_tolerates_nulls() {
        let batch = names(vec![Some("Alice"), None, Some("Charlie"), Some("Dana")]).await;
        let outcome = NotNullExpectation::new("name")
            .with_mostly(0.75)
            .evaluate(&batch)
            .await
            .unwrap();
        assert!(outcome.success);
    }

    #[test]
    fn test_invalid_mostly() {
        assert!(NotNullExpectation::new("name").with_mostly(2.0).validate().is_err());
        assert!(NotNullExpectation::new("").validate().is_err());
    }

    #[tokio::test]
    async fn test_column_name_with_space() {
        let batch = batch_of(
            RecordBatch::try_from_iter(vec![(
                "full name",
                Arc::new(StringArray::from(vec![Some("Ada Lovelace"), None])) as ArrayRef,
            )])
            .unwrap(),
        )
        .await;

        let outcome = NotNullExpectation::new("full name")
            .evaluate(&batch)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.result.unexpected_count, 1);
    }

    #[tokio::test]
    async fn test_nan_is_missing() {
        let batch = batch_of(
            RecordBatch::try_from_iter(vec![(
                "amount",
                Arc::new(Float64Array::from(vec![10.0, f64::NAN, 20.0])) as ArrayRef,
            )])
            .unwrap(),
        )
        .await;

        let outcome = NotNullExpectation::new("amount")
            .evaluate(&batch)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.result.unexpected_count, 1);
        assert_eq!(outcome.result.partial_unexpected_list, vec![Value::Null]);
    }
}

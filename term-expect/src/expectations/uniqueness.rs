//! Uniqueness expectation.

use super::ColumnMapExpectation;
use crate::prelude::*;
use serde::{Deserialize, Serialize};

/// Non-null values in a column must be unique.
///
/// Every row whose value occurs more than once is unexpected, so two rows
/// sharing an id count as two unexpected rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueExpectation {
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mostly: Option<f64>,
}

impl UniqueExpectation {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            mostly: None,
        }
    }
}

impl ColumnMapExpectation for UniqueExpectation {
    fn expectation_type(&self) -> &'static str {
        "expect_column_values_to_be_unique"
    }

    fn column(&self) -> &str {
        &self.column
    }

    fn mostly(&self) -> Option<f64> {
        self.mostly
    }

    fn unexpected_condition(&self, column: &str, table: &str) -> Result<String> {
        Ok(format!(
            "{column} IN (SELECT {column} FROM {table} WHERE {column} IS NOT NULL GROUP BY {column} HAVING COUNT(*) > 1)"
        ))
    }

    fn describe(&self) -> String {
        format!("values in '{}' must be unique", self.column)
    }
}

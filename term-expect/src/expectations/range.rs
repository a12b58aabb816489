//! Range expectation.

use super::{sql_number, ColumnMapExpectation};
use crate::prelude::*;
use serde::{Deserialize, Serialize};

/// Non-null values in a column must fall within bounds.
///
/// Either bound may be omitted. Bounds are inclusive unless `strict_min` or
/// `strict_max` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetweenExpectation {
    pub column: String,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub strict_min: bool,
    #[serde(default)]
    pub strict_max: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mostly: Option<f64>,
}

impl BetweenExpectation {
    pub fn new(column: impl Into<String>, min_value: Option<f64>, max_value: Option<f64>) -> Self {
        Self {
            column: column.into(),
            min_value,
            max_value,
            strict_min: false,
            strict_max: false,
            mostly: None,
        }
    }

    /// Makes both bounds exclusive.
    pub fn strict(mut self) -> Self {
        self.strict_min = true;
        self.strict_max = true;
        self
    }

    pub fn with_mostly(mut self, mostly: f64) -> Self {
        self.mostly = Some(mostly);
        self
    }
}

impl ColumnMapExpectation for BetweenExpectation {
    fn expectation_type(&self) -> &'static str {
        "expect_column_values_to_be_between"
    }

    fn column(&self) -> &str {
        &self.column
    }

    fn mostly(&self) -> Option<f64> {
        self.mostly
    }

    fn validate_kwargs(&self) -> Result<()> {
        for bound in [self.min_value, self.max_value].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(TermError::Configuration(format!(
                    "bounds for '{}' must be finite, got {bound}",
                    self.column
                )));
            }
        }
        match (self.min_value, self.max_value) {
            (None, None) => Err(TermError::Configuration(format!(
                "between expectation on '{}' needs min_value or max_value",
                self.column
            ))),
            (Some(min), Some(max)) if min > max => Err(TermError::Configuration(format!(
                "min_value {min} is greater than max_value {max} for '{}'",
                self.column
            ))),
            _ => Ok(()),
        }
    }

    fn unexpected_condition(&self, column: &str, _table: &str) -> Result<String> {
        self.validate_kwargs()?;

        let mut clauses = Vec::with_capacity(2);
        if let Some(min) = self.min_value {
            let op = if self.strict_min { "<=" } else { "<" };
            clauses.push(format!("{column} {op} {}", sql_number(min)));
        }
        if let Some(max) = self.max_value {
            let op = if self.strict_max { ">=" } else { ">" };
            clauses.push(format!("{column} {op} {}", sql_number(max)));
        }
        Ok(format!("({})", clauses.join(" OR ")))
    }

    fn describe(&self) -> String {
        let lower = if self.strict_min { "greater than" } else { "at least" };
        let upper = if self.strict_max { "less than" } else { "at most" };
        match (self.min_value, self.max_value) {
            (Some(min), Some(max)) => format!(
                "values in '{}' must be {lower} {min} and {upper} {max}",
                self.column
            ),
            (Some(min), None) => format!("values in '{}' must be {lower} {min}", self.column),
            (None, Some(max)) => format!("values in '{}' must be {upper} {max}", self.column),
            (None, None) => format!("values in '{}' must be between unset bounds", self.column),
        }
    }
}

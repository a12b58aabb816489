//! Set membership expectation.

use super::{sql_number, ColumnMapExpectation};
use crate::prelude::*;
use crate::security::SqlSecurity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Non-null values in a column must be members of a fixed set.
///
/// Set members may be strings, numbers or booleans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InSetExpectation {
    pub column: String,
    pub value_set: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mostly: Option<f64>,
}

impl InSetExpectation {
    pub fn new<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            column: column.into(),
            value_set: values.into_iter().map(Into::into).collect(),
            mostly: None,
        }
    }

    fn literal(value: &Value) -> Result<String> {
        match value {
            Value::String(s) => SqlSecurity::quote_literal(s),
            Value::Bool(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(i.to_string()),
                (None, Some(f)) => Ok(sql_number(f)),
                _ => Err(TermError::Configuration(format!("unsupported number {n}"))),
            },
            other => Err(TermError::Configuration(format!(
                "value_set members must be strings, numbers or booleans, got {other}"
            ))),
        }
    }
}

impl ColumnMapExpectation for InSetExpectation {
    fn expectation_type(&self) -> &'static str {
        "expect_column_values_to_be_in_set"
    }

    fn column(&self) -> &str {
        &self.column
    }

    fn mostly(&self) -> Option<f64> {
        self.mostly
    }

    fn validate_kwargs(&self) -> Result<()> {
        self.value_set.iter().try_for_each(|v| Self::literal(v).map(|_| ()))
    }

    fn unexpected_condition(&self, column: &str, _table: &str) -> Result<String> {
        if self.value_set.is_empty() {
            return Ok(format!("{column} IS NOT NULL"));
        }
        let values = self
            .value_set
            .iter()
            .map(Self::literal)
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        Ok(format!("{column} NOT IN ({values})"))
    }

    fn describe(&self) -> String {
        let members = self
            .value_set
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("values in '{}' must belong to {{{members}}}", self.column)
    }
}

//! Declarative expectations and their evaluation against a batch.
//!
//! Every expectation here is a column-map expectation: it defines a SQL
//! predicate that selects the *unexpected* rows of one column, and the shared
//! [`evaluate_column_map`] turns that predicate into counts, percentages and a
//! sample of unexpected values.
//!
//! Rule violations never produce errors; they produce an outcome with
//! `success = false`. Errors are reserved for faults such as a missing column
//! or invalid configuration.

use crate::batch::{Batch, BATCH_TABLE};
use crate::prelude::*;
use crate::security::{validate_fraction, SqlSecurity};
use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use tracing::{debug, instrument};

mod completeness;
mod range;
mod set;
mod uniqueness;

pub use completeness::NotNullExpectation;
pub use range::BetweenExpectation;
pub use set::InSetExpectation;
pub use uniqueness::UniqueExpectation;

/// Maximum number of sample values kept in `partial_unexpected_list`.
pub const PARTIAL_UNEXPECTED_COUNT: usize = 20;

/// Per-expectation result detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapResult {
    pub element_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_percent: Option<f64>,
    pub unexpected_count: u64,
    /// Percent of the evaluated rows that were unexpected; `None` when no rows
    /// were evaluated.
    pub unexpected_percent: Option<f64>,
    #[serde(default)]
    pub partial_unexpected_list: Vec<Value>,
}

/// Success flag plus detail for one evaluated expectation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectationOutcome {
    pub success: bool,
    pub result: ColumnMapResult,
}

/// An expectation evaluated row by row over a single column.
#[async_trait]
pub trait ColumnMapExpectation: Debug + Send + Sync {
    /// The serialized expectation type, e.g. `expect_column_values_to_be_unique`.
    fn expectation_type(&self) -> &'static str;

    /// The column this expectation applies to.
    fn column(&self) -> &str;

    /// Minimum fraction of evaluated rows that must be expected (default 1.0).
    fn mostly(&self) -> Option<f64>;

    /// SQL predicate selecting unexpected rows, given the escaped column
    /// identifier and the table name.
    fn unexpected_condition(&self, column: &str, table: &str) -> Result<String>;

    /// Whether null values count as unexpected. When false, nulls are
    /// excluded from the denominator.
    fn counts_missing_as_unexpected(&self) -> bool {
        false
    }

    /// One-line human-readable statement of the rule.
    fn describe(&self) -> String;

    /// Kind-specific argument checks.
    fn validate_kwargs(&self) -> Result<()> {
        Ok(())
    }

    /// Checks the column identifier, `mostly` and kind-specific arguments.
    fn validate(&self) -> Result<()> {
        SqlSecurity::validate_identifier(self.column())?;
        if let Some(mostly) = self.mostly() {
            validate_fraction(mostly, "mostly")?;
        }
        self.validate_kwargs()
    }

    /// Evaluates the expectation against `batch`.
    async fn evaluate(&self, batch: &Batch) -> Result<ExpectationOutcome> {
        evaluate_column_map(self, batch).await
    }
}

/// A declarative rule, serialized as `{ "expectation_type", "kwargs" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "expectation_type", content = "kwargs", rename_all = "snake_case")]
pub enum Expectation {
    ExpectColumnValuesToNotBeNull(NotNullExpectation),
    ExpectColumnValuesToBeBetween(BetweenExpectation),
    ExpectColumnValuesToBeUnique(UniqueExpectation),
    ExpectColumnValuesToBeInSet(InSetExpectation),
}

impl Expectation {
    /// Values in `column` must not be null.
    pub fn not_null(column: impl Into<String>) -> Self {
        NotNullExpectation::new(column).into()
    }

    /// Values in `column` must lie in `[min, max]`.
    pub fn between(column: impl Into<String>, min: f64, max: f64) -> Self {
        BetweenExpectation::new(column, Some(min), Some(max)).into()
    }

    /// Values in `column` must be unique.
    pub fn unique(column: impl Into<String>) -> Self {
        UniqueExpectation::new(column).into()
    }

    /// Values in `column` must be members of `values`.
    pub fn in_set<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        InSetExpectation::new(column, values).into()
    }

    /// The column-map view used for evaluation.
    pub fn as_column_map(&self) -> &dyn ColumnMapExpectation {
        match self {
            Expectation::ExpectColumnValuesToNotBeNull(e) => e,
            Expectation::ExpectColumnValuesToBeBetween(e) => e,
            Expectation::ExpectColumnValuesToBeUnique(e) => e,
            Expectation::ExpectColumnValuesToBeInSet(e) => e,
        }
    }

    pub fn expectation_type(&self) -> &'static str {
        self.as_column_map().expectation_type()
    }

    pub fn column(&self) -> &str {
        self.as_column_map().column()
    }

    pub fn describe(&self) -> String {
        self.as_column_map().describe()
    }

    pub fn validate(&self) -> Result<()> {
        self.as_column_map().validate()
    }

    /// True when both expectations have the same type and column, in which
    /// case one replaces the other inside a suite.
    pub fn same_domain(&self, other: &Expectation) -> bool {
        self.expectation_type() == other.expectation_type() && self.column() == other.column()
    }

    /// Evaluates against `batch`.
    pub async fn evaluate(&self, batch: &Batch) -> Result<ExpectationOutcome> {
        self.as_column_map().evaluate(batch).await
    }
}

impl From<NotNullExpectation> for Expectation {
    fn from(e: NotNullExpectation) -> Self {
        Expectation::ExpectColumnValuesToNotBeNull(e)
    }
}

impl From<BetweenExpectation> for Expectation {
    fn from(e: BetweenExpectation) -> Self {
        Expectation::ExpectColumnValuesToBeBetween(e)
    }
}

impl From<UniqueExpectation> for Expectation {
    fn from(e: UniqueExpectation) -> Self {
        Expectation::ExpectColumnValuesToBeUnique(e)
    }
}

impl From<InSetExpectation> for Expectation {
    fn from(e: InSetExpectation) -> Self {
        Expectation::ExpectColumnValuesToBeInSet(e)
    }
}

/// Shared evaluation of column-map expectations.
#[instrument(skip_all, fields(
    expectation_type = expectation.expectation_type(),
    expectation.column = %expectation.column()
))]
pub async fn evaluate_column_map<E>(expectation: &E, batch: &Batch) -> Result<ExpectationOutcome>
where
    E: ColumnMapExpectation + ?Sized,
{
    expectation.validate()?;
    let column = expectation.column();
    batch.require_column(column)?;

    let column_identifier = SqlSecurity::escape_identifier(column)?;
    let data_type = batch.schema().field_with_name(column)?.data_type().clone();
    let missing = missing_condition(&column_identifier, &data_type);
    let rule = expectation.unexpected_condition(&column_identifier, BATCH_TABLE)?;
    let condition = if expectation.counts_missing_as_unexpected() {
        format!("({rule}) OR ({missing})")
    } else {
        format!("({rule}) AND NOT ({missing})")
    };
    let mostly = expectation.mostly().unwrap_or(1.0);
    let ctx = batch.session();

    let counts = collect(
        ctx,
        &format!(
            "SELECT COUNT(*) AS element_count, COUNT(CASE WHEN {missing} THEN 1 END) AS missing_count FROM {BATCH_TABLE}"
        ),
    )
    .await?;
    let element_count = extract_count(&counts, 0, expectation.expectation_type())?;
    let missing_count = extract_count(&counts, 1, expectation.expectation_type())?;
    let non_missing_count = element_count.saturating_sub(missing_count);

    let unexpected = collect(
        ctx,
        &format!("SELECT COUNT(*) AS unexpected_count FROM {BATCH_TABLE} WHERE {condition}"),
    )
    .await?;
    let unexpected_count = extract_count(&unexpected, 0, expectation.expectation_type())?;

    let partial_unexpected_list = if unexpected_count == 0 {
        Vec::new()
    } else {
        let sample = collect(
            ctx,
            &format!(
                "SELECT {column_identifier} FROM {BATCH_TABLE} WHERE {condition} LIMIT {PARTIAL_UNEXPECTED_COUNT}"
            ),
        )
        .await?;
        extract_values(&sample)?
    };

    let (denominator, missing_count, missing_percent) =
        if expectation.counts_missing_as_unexpected() {
            (element_count, None, None)
        } else {
            (
                non_missing_count,
                Some(missing_count),
                percent(missing_count, element_count),
            )
        };

    let unexpected_percent = percent(unexpected_count, denominator);
    let success = if denominator == 0 {
        true
    } else {
        let expected_fraction = 1.0 - (unexpected_count as f64 / denominator as f64);
        expected_fraction >= mostly
    };

    debug!(
        result.success = success,
        result.element_count = element_count,
        result.unexpected_count = unexpected_count,
        "Evaluated expectation"
    );

    Ok(ExpectationOutcome {
        success,
        result: ColumnMapResult {
            element_count,
            missing_count,
            missing_percent,
            unexpected_count,
            unexpected_percent,
            partial_unexpected_list,
        },
    })
}

/// Predicate selecting missing rows: nulls, plus NaN in float columns.
fn missing_condition(column: &str, data_type: &DataType) -> String {
    match data_type {
        DataType::Float32 | DataType::Float64 => {
            format!("{column} IS NULL OR isnan({column})")
        }
        DataType::Float16 => format!("{column} IS NULL OR isnan(CAST({column} AS DOUBLE))"),
        _ => format!("{column} IS NULL"),
    }
}

fn percent(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 / whole as f64 * 100.0)
    }
}

/// Formats a bound for SQL. Bounds are checked finite before this is called.
pub(crate) fn sql_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

async fn collect(ctx: &SessionContext, sql: &str) -> Result<Vec<RecordBatch>> {
    debug!(sql = %sql, "Executing expectation query");
    let df = ctx.sql(sql).await?;
    Ok(df.collect().await?)
}

fn extract_count(batches: &[RecordBatch], column: usize, expectation: &str) -> Result<u64> {
    let batch = batches
        .iter()
        .find(|b| b.num_rows() > 0)
        .ok_or_else(|| TermError::expectation_evaluation(expectation, "count query returned no rows"))?;
    let value = batch
        .column(column)
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| TermError::Internal("Failed to extract count".to_string()))?
        .value(0);
    u64::try_from(value).map_err(|_| TermError::Internal(format!("negative count {value}")))
}

fn extract_values(batches: &[RecordBatch]) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    for batch in batches {
        values.extend(array_to_json(batch.column(0))?);
    }
    values.truncate(PARTIAL_UNEXPECTED_COUNT);
    Ok(values)
}

/// Converts an Arrow column into JSON values, keeping numbers and booleans
/// typed and rendering everything else as text.
pub(crate) fn array_to_json(array: &ArrayRef) -> Result<Vec<Value>> {
    use arrow::compute::cast;

    let values = match array.data_type() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => {
            let cast = cast(array, &DataType::Int64)?;
            let ints = downcast::<Int64Array>(&cast)?;
            (0..ints.len())
                .map(|i| {
                    if ints.is_null(i) {
                        Value::Null
                    } else {
                        Value::from(ints.value(i))
                    }
                })
                .collect()
        }
        DataType::UInt64 | DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let cast = cast(array, &DataType::Float64)?;
            let floats = downcast::<Float64Array>(&cast)?;
            (0..floats.len())
                .map(|i| {
                    if floats.is_null(i) {
                        Value::Null
                    } else {
                        serde_json::Number::from_f64(floats.value(i))
                            .map(Value::Number)
                            .unwrap_or(Value::Null)
                    }
                })
                .collect()
        }
        DataType::Boolean => {
            let bools = downcast::<BooleanArray>(array)?;
            (0..bools.len())
                .map(|i| {
                    if bools.is_null(i) {
                        Value::Null
                    } else {
                        Value::Bool(bools.value(i))
                    }
                })
                .collect()
        }
        _ => {
            let cast = cast(array, &DataType::Utf8)?;
            let strings = downcast::<StringArray>(&cast)?;
            (0..strings.len())
                .map(|i| {
                    if strings.is_null(i) {
                        Value::Null
                    } else {
                        Value::String(strings.value(i).to_string())
                    }
                })
                .collect()
        }
    };
    Ok(values)
}

fn downcast<T: 'static>(array: &ArrayRef) -> Result<&T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| TermError::Internal("Failed to downcast result column".to_string()))
}

//! Prelude for commonly used types and traits in term-expect.

pub use crate::batch::{Batch, BatchParameters};
pub use crate::context::DataContext;
pub use crate::datasource::{AssetKind, BatchPartitioner};
pub use crate::error::{ErrorContext, Result, TermError};
pub use crate::expectations::{ColumnMapExpectation, Expectation};
pub use crate::formatters::{FormatterConfig, HumanFormatter, ResultFormatter};
pub use crate::registry::Registration;
pub use crate::results::{RunIdentifier, ValidationResult, ValidationResultStore};
pub use crate::suite::{ExpectationSuite, Population};

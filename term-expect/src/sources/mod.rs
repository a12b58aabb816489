//! Loaders that register batch data with a DataFusion session.
//!
//! Each asset kind has a [`TableSource`] implementation: in-memory record
//! batches, CSV files and Parquet files.

use crate::prelude::*;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use std::fmt::Debug;
use std::path::Path;

mod csv;
mod memory;
mod parquet;

pub use csv::{CsvOptions, CsvSource};
pub use memory::MemorySource;
pub use parquet::ParquetSource;

/// A source of rows that can be registered as a table.
///
/// # Examples
///
/// ```rust,ignore
/// use term_expect::sources::{CsvSource, TableSource};
///
/// let source = CsvSource::new("data/employees.csv");
/// let ctx = SessionContext::new();
/// source.register(&ctx, "data").await?;
/// ```
#[async_trait]
pub trait TableSource: Debug + Send + Sync {
    /// Registers the rows under `table_name` in `ctx`.
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()>;

    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}

/// Converts a path into the UTF-8 string DataFusion expects.
pub(crate) fn path_str<'a>(source_type: &str, path: &'a Path) -> Result<&'a str> {
    path.to_str().ok_or_else(|| {
        TermError::data_source(
            source_type,
            format!("path '{}' is not valid UTF-8", path.display()),
        )
    })
}

/// Fails with a data source error when `path` is not an existing file.
pub(crate) async fn ensure_file(source_type: &str, path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(TermError::data_source(
            source_type,
            format!("'{}' is not a file", path.display()),
        )),
        Err(e) => Err(TermError::data_source_with_source(
            source_type,
            format!("cannot read '{}'", path.display()),
            Box::new(e),
        )),
    }
}

/// Returns the file extension with its leading dot, or `default`.
pub(crate) fn file_extension(path: &Path, default: &str) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| default.to_string())
}

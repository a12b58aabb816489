//! CSV file source implementation.

use super::{ensure_file, file_extension, path_str, TableSource};
use crate::prelude::*;
use async_trait::async_trait;
use datafusion::prelude::*;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Options for configuring CSV file reading.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the CSV file has a header row
    pub has_header: bool,
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    /// Maximum records to read for schema inference
    pub schema_infer_max_records: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            quote: b'"',
            schema_infer_max_records: 1000,
        }
    }
}

/// A single CSV file with an inferred schema.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    options: CsvOptions,
}

impl CsvSource {
    /// Creates a CSV source with default options.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, CsvOptions::default())
    }

    /// Creates a CSV source with custom options.
    pub fn with_options(path: impl Into<PathBuf>, options: CsvOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }
}

#[async_trait]
impl TableSource for CsvSource {
    #[instrument(skip(self, ctx), fields(
        table.name = %table_name,
        source.type = "csv",
        csv.delimiter = %(self.options.delimiter as char),
        csv.has_header = self.options.has_header
    ))]
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()> {
        ensure_file("CSV", &self.path).await?;
        let path = path_str("CSV", &self.path)?;
        let extension = file_extension(&self.path, ".csv");

        info!(
            table.name = %table_name,
            source.path = %path,
            "Registering CSV data source"
        );

        let options = CsvReadOptions::new()
            .has_header(self.options.has_header)
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .schema_infer_max_records(self.options.schema_infer_max_records)
            .file_extension(&extension);

        ctx.register_csv(table_name, path, options).await?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("CSV file {}", self.path.display())
    }
}

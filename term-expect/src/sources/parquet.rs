//! Parquet file source implementation.

use super::{ensure_file, file_extension, path_str, TableSource};
use crate::prelude::*;
use async_trait::async_trait;
use datafusion::prelude::*;
use std::path::PathBuf;
use tracing::{info, instrument};

/// A single Parquet file; the schema comes from the file metadata.
#[derive(Debug, Clone)]
pub struct ParquetSource {
    path: PathBuf,
}

impl ParquetSource {
    /// Creates a Parquet source from a file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TableSource for ParquetSource {
    #[instrument(skip(self, ctx), fields(table.name = %table_name, source.type = "parquet"))]
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()> {
        ensure_file("Parquet", &self.path).await?;
        let path = path_str("Parquet", &self.path)?;
        let extension = file_extension(&self.path, ".parquet");

        info!(
            table.name = %table_name,
            source.path = %path,
            "Registering Parquet data source"
        );

        let options = ParquetReadOptions {
            file_extension: &extension,
            ..Default::default()
        };
        ctx.register_parquet(table_name, path, options).await?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Parquet file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_register_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numbers.parquet");

        let batch = RecordBatch::try_from_iter(vec![(
            "n",
            Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef,
        )])
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ctx = SessionContext::new();
        ParquetSource::new(&path).register(&ctx, "data").await.unwrap();

        let count = ctx.table("data").await.unwrap().count().await.unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_missing_parquet_file() {
        let ctx = SessionContext::new();
        let err = ParquetSource::new("/missing.parquet")
            .register(&ctx, "data")
            .await
            .unwrap_err();
        assert!(matches!(err, TermError::DataSource { .. }));
    }
}

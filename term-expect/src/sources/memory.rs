//! In-memory record batches as a table.

use super::TableSource;
use crate::prelude::*;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Rows held in memory, registered through a [`MemTable`].
#[derive(Debug, Clone)]
pub struct MemorySource {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl MemorySource {
    /// Wraps a single record batch.
    pub fn new(batch: RecordBatch) -> Self {
        Self {
            schema: batch.schema(),
            batches: vec![batch],
        }
    }

    /// Wraps several batches that share a schema.
    pub fn try_from_batches(batches: Vec<RecordBatch>) -> Result<Self> {
        let first = batches.first().ok_or_else(|| {
            TermError::data_source("DataFrame", "at least one record batch is required")
        })?;
        let schema = first.schema();
        if let Some(other) = batches.iter().find(|b| b.schema() != schema) {
            return Err(TermError::data_source(
                "DataFrame",
                format!(
                    "record batches have different schemas: {:?} vs {:?}",
                    schema,
                    other.schema()
                ),
            ));
        }
        Ok(Self { schema, batches })
    }

    /// Total number of rows across all batches.
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }
}

#[async_trait]
impl TableSource for MemorySource {
    #[instrument(skip(self, ctx), fields(table.name = %table_name, source.type = "dataframe"))]
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()> {
        debug!(rows = self.num_rows(), "Registering in-memory table");
        let provider = MemTable::try_new(self.schema.clone(), vec![self.batches.clone()])?;
        ctx.register_table(table_name, Arc::new(provider))?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("in-memory table with {} rows", self.num_rows())
    }
}

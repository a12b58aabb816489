//! Materializing a batch from a batch definition.
//!
//! A [`Batch`] is recomputed on every run and never persisted. It owns a
//! DataFusion session with the rows registered as table [`BATCH_TABLE`].

use crate::datasource::{AssetKind, BatchDefinition, BatchPartitioner, DataAsset, Datasource};
use crate::prelude::*;
use crate::sources::{CsvOptions, CsvSource, MemorySource, ParquetSource, TableSource};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::prelude::SessionContext;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Table name every batch is registered under.
pub const BATCH_TABLE: &str = "data";

/// Runtime inputs for producing a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchParameters {
    dataframe: Option<Vec<RecordBatch>>,
}

impl BatchParameters {
    /// No runtime inputs; used for file-backed assets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies the rows of a dataframe asset.
    pub fn dataframe(batch: RecordBatch) -> Self {
        Self {
            dataframe: Some(vec![batch]),
        }
    }
}

/// Resolved description of what a batch was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchSpec {
    Dataframe { rows: usize },
    Csv { path: PathBuf },
    Parquet { path: PathBuf },
}

/// One concrete materialization of data.
#[derive(Clone)]
pub struct Batch {
    id: String,
    datasource_name: String,
    asset_name: String,
    batch_definition_name: String,
    spec: BatchSpec,
    loaded_at: DateTime<Utc>,
    row_count: usize,
    schema: SchemaRef,
    session: SessionContext,
}

impl Batch {
    /// Reads a batch of `asset` according to `definition`.
    ///
    /// Relative file paths are resolved against `base_dir`.
    #[instrument(skip_all, fields(
        datasource = %datasource.name,
        asset = %asset.name,
        batch_definition = %definition.name
    ))]
    pub async fn load(
        datasource: &Datasource,
        asset: &DataAsset,
        definition: &BatchDefinition,
        parameters: BatchParameters,
        base_dir: &Path,
    ) -> Result<Self> {
        let session = SessionContext::new();

        let (source, spec): (Box<dyn TableSource>, BatchSpec) =
            match (&asset.kind, &definition.partitioner) {
                (AssetKind::Dataframe, BatchPartitioner::WholeTable) => {
                    let batches = parameters.dataframe.ok_or_else(|| {
                        TermError::Configuration(format!(
                            "batch parameters for dataframe asset '{}' must include a dataframe",
                            asset.name
                        ))
                    })?;
                    let source = MemorySource::try_from_batches(batches)?;
                    let rows = source.num_rows();
                    (Box::new(source) as Box<dyn TableSource>, BatchSpec::Dataframe { rows })
                }
                (AssetKind::Dataframe, BatchPartitioner::Path { .. }) => {
                    return Err(TermError::Configuration(format!(
                        "dataframe asset '{}' only supports whole-table batch definitions",
                        asset.name
                    )));
                }
                (
                    AssetKind::Csv {
                        path,
                        has_header,
                        delimiter,
                    },
                    partitioner,
                ) => {
                    let path = resolve(base_dir, partitioned_path(path, partitioner));
                    let options = CsvOptions {
                        has_header: *has_header,
                        delimiter: *delimiter as u8,
                        ..Default::default()
                    };
                    (
                        Box::new(CsvSource::with_options(&path, options)) as Box<dyn TableSource>,
                        BatchSpec::Csv { path },
                    )
                }
                (AssetKind::Parquet { path }, partitioner) => {
                    let path = resolve(base_dir, partitioned_path(path, partitioner));
                    (
                        Box::new(ParquetSource::new(&path)) as Box<dyn TableSource>,
                        BatchSpec::Parquet { path },
                    )
                }
            };

        debug!(source = %source.description(), "Registering batch source");
        source.register(&session, BATCH_TABLE).await?;

        let table = session.table(BATCH_TABLE).await?;
        let schema: SchemaRef = table.schema().inner().clone();
        let row_count = table.count().await?;

        let batch = Self {
            id: format!("{}-{}", datasource.name, asset.name),
            datasource_name: datasource.name.clone(),
            asset_name: asset.name.clone(),
            batch_definition_name: definition.name.clone(),
            spec,
            loaded_at: Utc::now(),
            row_count,
            schema,
            session,
        };

        info!(
            batch.id = %batch.id,
            batch.rows = batch.row_count,
            batch.columns = batch.schema.fields().len(),
            "Loaded batch"
        );

        Ok(batch)
    }

    /// Batch id, `<datasource>-<asset>`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn datasource_name(&self) -> &str {
        &self.datasource_name
    }

    pub fn asset_name(&self) -> &str {
        &self.asset_name
    }

    pub fn batch_definition_name(&self) -> &str {
        &self.batch_definition_name
    }

    /// What the batch was read from.
    pub fn spec(&self) -> &BatchSpec {
        &self.spec
    }

    /// When the rows were materialized.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// The session holding [`BATCH_TABLE`].
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Fails with [`TermError::ColumnNotFound`] when `column` is absent.
    pub fn require_column(&self, column: &str) -> Result<()> {
        if self.schema.column_with_name(column).is_none() {
            return Err(TermError::ColumnNotFound {
                column: column.to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("id", &self.id)
            .field("batch_definition", &self.batch_definition_name)
            .field("spec", &self.spec)
            .field("row_count", &self.row_count)
            .field("loaded_at", &self.loaded_at)
            .finish_non_exhaustive()
    }
}

fn partitioned_path<'a>(asset_path: &'a PathBuf, partitioner: &'a BatchPartitioner) -> &'a PathBuf {
    match partitioner {
        BatchPartitioner::WholeTable => asset_path,
        BatchPartitioner::Path { path } => path,
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use std::sync::Arc;

    fn people() -> RecordBatch {
        RecordBatch::try_from_iter(vec![
            (
                "name",
                Arc::new(StringArray::from(vec!["Alice", "Bob", "Charlie"])) as ArrayRef,
            ),
            (
                "age",
                Arc::new(Int64Array::from(vec![25, 30, 35])) as ArrayRef,
            ),
        ])
        .unwrap()
    }

    fn dataframe_setup() -> (Datasource, DataAsset, BatchDefinition) {
        (
            Datasource::new("my_pandas_datasource").unwrap(),
            DataAsset::new("my_df_asset", AssetKind::Dataframe).unwrap(),
            BatchDefinition::whole_table("my_batch_def").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_dataframe_batch() {
        let (source, asset, definition) = dataframe_setup();
        let batch = Batch::load(
            &source,
            &asset,
            &definition,
            BatchParameters::dataframe(people()),
            Path::new("."),
        )
        .await
        .unwrap();

        assert_eq!(batch.id(), "my_pandas_datasource-my_df_asset");
        assert_eq!(batch.row_count(), 3);
        assert_eq!(batch.spec(), &BatchSpec::Dataframe { rows: 3 });
        assert!(batch.require_column("age").is_ok());
        assert!(matches!(
            batch.require_column("salary"),
            Err(TermError::ColumnNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_dataframe_batch_requires_parameters() {
        let (source, asset, definition) = dataframe_setup();
        let err = Batch::load(
            &source,
            &asset,
            &definition,
            BatchParameters::new(),
            Path::new("."),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TermError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_csv_batch_resolves_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(
            dir.path().join("data/employees.csv"),
            "id,name\n1,Alice\n2,Bob\n",
        )
        .unwrap();

        let source = Datasource::new("my_csv_datasource").unwrap();
        let asset = DataAsset::new("employees_asset", AssetKind::csv("data/employees.csv")).unwrap();
        let definition = BatchDefinition::path("my_batch_def", "data/employees.csv").unwrap();

        let batch = Batch::load(
            &source,
            &asset,
            &definition,
            BatchParameters::new(),
            dir.path(),
        )
        .await
        .unwrap();

        assert_eq!(batch.row_count(), 2);
        assert_eq!(
            batch.spec(),
            &BatchSpec::Csv {
                path: dir.path().join("data/employees.csv")
            }
        );
    }
}

//! Persisted descriptors of where data lives and how a batch is read from it.
//!
//! A [`Datasource`] owns named [`DataAsset`]s, and each asset owns named
//! [`BatchDefinition`]s. All three are plain serde records stored in the
//! context configuration file; materializing data is the job of
//! [`crate::batch`].

use crate::error::{Result, TermError};
use crate::registry::{self, Named, Registration};
use crate::security::StoreKeySecurity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A named data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datasource {
    pub name: String,
    #[serde(default)]
    pub assets: Vec<DataAsset>,
}

impl Datasource {
    /// Creates an empty datasource after validating its name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        StoreKeySecurity::validate_segment("datasource name", &name)?;
        Ok(Self {
            name,
            assets: Vec::new(),
        })
    }

    /// Looks up an asset by name.
    pub fn asset(&self, name: &str) -> Option<&DataAsset> {
        registry::find(&self.assets, name)
    }

    pub(crate) fn asset_mut(&mut self, name: &str) -> Option<&mut DataAsset> {
        registry::find_mut(&mut self.assets, name)
    }

    /// Adds a new asset, failing if the name is taken.
    pub fn add_asset(&mut self, asset: DataAsset) -> Result<()> {
        registry::insert_new(&mut self.assets, "data asset", asset)
    }

    /// Returns the named asset, creating it with `kind` when missing.
    pub fn get_or_add_asset(
        &mut self,
        name: &str,
        kind: AssetKind,
    ) -> Result<Registration<DataAsset>> {
        registry::get_or_insert_with(&mut self.assets, name, || DataAsset::new(name, kind))
    }
}

impl Named for Datasource {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Storage format of an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssetKind {
    /// Rows supplied in memory at batch time as batch parameters.
    Dataframe,
    /// A delimited text file.
    Csv {
        path: PathBuf,
        #[serde(default = "default_true")]
        has_header: bool,
        #[serde(default = "default_delimiter")]
        delimiter: char,
    },
    /// A Parquet file.
    Parquet { path: PathBuf },
}

fn default_true() -> bool {
    true
}

fn default_delimiter() -> char {
    ','
}

impl AssetKind {
    /// A comma-separated file with a header row.
    pub fn csv(path: impl Into<PathBuf>) -> Self {
        AssetKind::Csv {
            path: path.into(),
            has_header: true,
            delimiter: ',',
        }
    }

    /// A Parquet file.
    pub fn parquet(path: impl Into<PathBuf>) -> Self {
        AssetKind::Parquet { path: path.into() }
    }

    /// Short name used in logs and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            AssetKind::Dataframe => "dataframe",
            AssetKind::Csv { .. } => "csv",
            AssetKind::Parquet { .. } => "parquet",
        }
    }

    /// The file the asset points at, if it is file-backed.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            AssetKind::Dataframe => None,
            AssetKind::Csv { path, .. } | AssetKind::Parquet { path } => Some(path),
        }
    }

    fn validate(&self) -> Result<()> {
        if let AssetKind::Csv { delimiter, .. } = self {
            if !delimiter.is_ascii() {
                return Err(TermError::Configuration(format!(
                    "CSV delimiter must be a single ASCII character, got '{delimiter}'"
                )));
            }
        }
        if let Some(path) = self.path() {
            if path.as_os_str().is_empty() {
                return Err(TermError::Configuration(format!(
                    "{} asset path cannot be empty",
                    self.type_name()
                )));
            }
        }
        Ok(())
    }
}

/// A named dataset within a datasource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAsset {
    pub name: String,
    pub kind: AssetKind,
    #[serde(default)]
    pub batch_definitions: Vec<BatchDefinition>,
}

impl DataAsset {
    /// Creates an asset without batch definitions.
    pub fn new(name: impl Into<String>, kind: AssetKind) -> Result<Self> {
        let name = name.into();
        StoreKeySecurity::validate_segment("data asset name", &name)?;
        kind.validate()?;
        Ok(Self {
            name,
            kind,
            batch_definitions: Vec::new(),
        })
    }

    /// Looks up a batch definition by name.
    pub fn batch_definition(&self, name: &str) -> Option<&BatchDefinition> {
        registry::find(&self.batch_definitions, name)
    }

    /// Adds a batch definition, failing if the name is taken.
    pub fn add_batch_definition(&mut self, definition: BatchDefinition) -> Result<()> {
        self.check_partitioner(&definition.partitioner)?;
        registry::insert_new(&mut self.batch_definitions, "batch definition", definition)
    }

    /// Returns the named batch definition, creating it when missing.
    pub fn get_or_add_batch_definition(
        &mut self,
        name: &str,
        partitioner: BatchPartitioner,
    ) -> Result<Registration<BatchDefinition>> {
        if self.batch_definition(name).is_none() {
            self.check_partitioner(&partitioner)?;
        }
        registry::get_or_insert_with(&mut self.batch_definitions, name, || {
            BatchDefinition::new(name, partitioner)
        })
    }

    fn check_partitioner(&self, partitioner: &BatchPartitioner) -> Result<()> {
        match (&self.kind, partitioner) {
            (AssetKind::Dataframe, BatchPartitioner::Path { .. }) => {
                Err(TermError::Configuration(format!(
                    "dataframe asset '{}' only supports whole-table batch definitions",
                    self.name
                )))
            }
            _ => Ok(()),
        }
    }
}

impl Named for DataAsset {
    fn name(&self) -> &str {
        &self.name
    }
}

/// How a batch definition selects data from its asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchPartitioner {
    /// The whole asset forms one batch.
    WholeTable,
    /// Read the file at `path` using the asset's format.
    Path { path: PathBuf },
}

/// A named recipe for producing a batch from an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDefinition {
    pub name: String,
    pub partitioner: BatchPartitioner,
}

impl BatchDefinition {
    /// Creates a batch definition after validating its name.
    pub fn new(name: impl Into<String>, partitioner: BatchPartitioner) -> Result<Self> {
        let name = name.into();
        StoreKeySecurity::validate_segment("batch definition name", &name)?;
        if let BatchPartitioner::Path { path } = &partitioner {
            if path.as_os_str().is_empty() {
                return Err(TermError::Configuration(
                    "batch definition path cannot be empty".to_string(),
                ));
            }
        }
        Ok(Self { name, partitioner })
    }

    /// A definition covering the whole asset.
    pub fn whole_table(name: impl Into<String>) -> Result<Self> {
        Self::new(name, BatchPartitioner::WholeTable)
    }

    /// A definition reading one file.
    pub fn path(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(name, BatchPartitioner::Path { path: path.into() })
    }
}

impl Named for BatchDefinition {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_registration_is_idempotent() {
        let mut source = Datasource::new("my_csv_datasource").unwrap();

        let first = source
            .get_or_add_asset("employees_asset", AssetKind::csv("data/employees.csv"))
            .unwrap();
        assert!(first.was_created());

        // Different parameters on the second call are ignored.
        let second = source
            .get_or_add_asset("employees_asset", AssetKind::parquet("other.parquet"))
            .unwrap();
        assert!(!second.was_created());
        assert_eq!(second.get().kind, AssetKind::csv("data/employees.csv"));
        assert_eq!(source.assets.len(), 1);
    }

    #[test]
    fn test_add_asset_rejects_duplicate() {
        let mut source = Datasource::new("src").unwrap();
        source
            .add_asset(DataAsset::new("a", AssetKind::Dataframe).unwrap())
            .unwrap();
        let err = source
            .add_asset(DataAsset::new("a", AssetKind::Dataframe).unwrap())
            .unwrap_err();
        assert!(err.is_already_exists());
    }

    #[test]
    fn test_dataframe_asset_rejects_path_partitioner() {
        let mut asset = DataAsset::new("my_df_asset", AssetKind::Dataframe).unwrap();
        let err = asset
            .get_or_add_batch_definition(
                "by_path",
                BatchPartitioner::Path {
                    path: "x.csv".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, TermError::Configuration(_)));

        let reg = asset
            .get_or_add_batch_definition("my_batch_def", BatchPartitioner::WholeTable)
            .unwrap();
        assert!(reg.was_created());
        assert!(asset.batch_definition("my_batch_def").is_some());
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        assert!(Datasource::new("../escape").is_err());
        assert!(DataAsset::new("", AssetKind::Dataframe).is_err());
        assert!(BatchDefinition::whole_table("a/b").is_err());
        assert!(BatchDefinition::path("ok", "").is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let mut asset = DataAsset::new("transactions_asset", AssetKind::parquet("t.parquet")).unwrap();
        asset
            .add_batch_definition(BatchDefinition::path("my_batch_def", "t.parquet").unwrap())
            .unwrap();

        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["kind"]["type"], "parquet");
        assert_eq!(json["batch_definitions"][0]["partitioner"]["type"], "path");

        let back: DataAsset = serde_json::from_value(json).unwrap();
        assert_eq!(back, asset);
    }

    #[test]
    fn test_csv_defaults_when_deserializing() {
        let kind: AssetKind =
            serde_json::from_str(r#"{"type": "csv", "path": "data/employees.csv"}"#).unwrap();
        assert_eq!(kind, AssetKind::csv("data/employees.csv"));
    }
}

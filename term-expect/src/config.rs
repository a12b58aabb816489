//! On-disk configuration of a data context.
//!
//! The configuration lives in `term_expect.json` at the context root. Store
//! locations are relative to the root; by default validation results and data
//! docs sit directly under it (not under an `uncommitted/` directory) so the
//! validation history can be committed alongside the project.

use crate::datasource::Datasource;
use crate::error::{Result, TermError};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Name of the configuration file inside the context root.
pub const CONFIG_FILE_NAME: &str = "term_expect.json";

/// Current configuration format version.
pub const CONFIG_VERSION: u32 = 1;

/// Locations of the persisted stores, relative to the context root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub expectations_dir: PathBuf,
    pub validation_results_dir: PathBuf,
    pub checkpoints_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            expectations_dir: PathBuf::from("expectations"),
            validation_results_dir: PathBuf::from("validations"),
            checkpoints_dir: PathBuf::from("checkpoints"),
        }
    }
}

/// Where and how the HTML data docs site is rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDocsConfig {
    pub site_name: String,
    pub site_dir: PathBuf,
}

impl Default for DataDocsConfig {
    fn default() -> Self {
        Self {
            site_name: "local_site".to_string(),
            site_dir: PathBuf::from("data_docs/local_site"),
        }
    }
}

/// Full context configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub config_version: u32,
    #[serde(default)]
    pub stores: StoreConfig,
    #[serde(default)]
    pub data_docs: DataDocsConfig,
    #[serde(default = "default_plugins_dir")]
    pub plugins_dir: PathBuf,
    #[serde(default)]
    pub data_sources: Vec<Datasource>,
}

fn default_plugins_dir() -> PathBuf {
    PathBuf::from("plugins")
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION,
            stores: StoreConfig::default(),
            data_docs: DataDocsConfig::default(),
            plugins_dir: default_plugins_dir(),
            data_sources: Vec::new(),
        }
    }
}

impl ContextConfig {
    /// Sets the expectation suite directory.
    pub fn with_expectations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.stores.expectations_dir = dir.into();
        self
    }

    /// Sets the validation results directory.
    pub fn with_validation_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.stores.validation_results_dir = dir.into();
        self
    }

    /// Sets the data docs site directory.
    pub fn with_data_docs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_docs.site_dir = dir.into();
        self
    }

    /// Checks the version and that every store path stays inside the root.
    pub fn validate(&self) -> Result<()> {
        if self.config_version != CONFIG_VERSION {
            return Err(TermError::Configuration(format!(
                "unsupported config_version {} (expected {CONFIG_VERSION})",
                self.config_version
            )));
        }

        for (label, path) in self.directories() {
            validate_relative(label, path)?;
        }

        let mut names: Vec<&str> = self.data_sources.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        if let Some(dup) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(TermError::Configuration(format!(
                "datasource '{}' is declared more than once",
                dup[0]
            )));
        }

        Ok(())
    }

    /// Every directory the context creates under its root.
    pub fn directories(&self) -> [(&'static str, &Path); 5] {
        [
            ("expectations_dir", self.stores.expectations_dir.as_path()),
            (
                "validation_results_dir",
                self.stores.validation_results_dir.as_path(),
            ),
            ("checkpoints_dir", self.stores.checkpoints_dir.as_path()),
            ("data_docs.site_dir", self.data_docs.site_dir.as_path()),
            ("plugins_dir", self.plugins_dir.as_path()),
        ]
    }

    /// Parses a configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ContextConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn validate_relative(label: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(TermError::Configuration(format!("{label} cannot be empty")));
    }
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(TermError::Configuration(format!(
            "{label} must be a relative path inside the context root, got '{}'",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_keeps_history_inside_root() {
        let config = ContextConfig::default();
        assert_eq!(
            config.stores.validation_results_dir,
            PathBuf::from("validations")
        );
        assert_eq!(
            config.data_docs.site_dir,
            PathBuf::from("data_docs/local_site")
        );
        assert!(config
            .directories()
            .iter()
            .all(|(_, p)| !p.starts_with("uncommitted")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_paths_escaping_root_are_rejected() {
        let config = ContextConfig::default().with_validation_results_dir("../elsewhere");
        assert!(matches!(config.validate(), Err(TermError::Configuration(_))));

        let config = ContextConfig::default().with_data_docs_dir("/tmp/docs");
        assert!(config.validate().is_err());

        let config = ContextConfig::default().with_expectations_dir("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = ContextConfig::from_json(r#"{"config_version": 1}"#).unwrap();
        assert_eq!(config, ContextConfig::default());
    }

    #[test]
    fn test_unsupported_version() {
        assert!(ContextConfig::from_json(r#"{"config_version": 7}"#).is_err());
    }

    #[test]
    fn test_duplicate_datasources_are_rejected() {
        let mut config = ContextConfig::default();
        config.data_sources.push(Datasource::new("a").unwrap());
        config.data_sources.push(Datasource::new("a").unwrap());
        assert!(config.validate().is_err());
    }
}

//! The persistent data context.
//!
//! A [`DataContext`] is rooted at `<project>/gx`. Opening it creates the
//! directory layout and `term_expect.json` on first use and reloads both on
//! every later run, so named objects registered once are found again.
//!
//! # Example
//!
//! ```rust,ignore
//! use term_expect::prelude::*;
//!
//! let mut context = DataContext::open_or_create("my_project").await?;
//! let source = context.get_or_add_datasource("my_csv_datasource").await?;
//! println!("{} datasource", source.outcome());
//! ```

use crate::batch::{Batch, BatchParameters};
use crate::config::{ContextConfig, CONFIG_FILE_NAME};
use crate::datasource::{AssetKind, BatchDefinition, BatchPartitioner, DataAsset, Datasource};
use crate::docs::{self, DataDocsBuilder, DataDocsSite};
use crate::prelude::*;
use crate::registry;
use crate::results::{
    FilesystemResultStore, RunIdentifier, ValidationResult, ValidationResultIdentifier,
    ValidationResultStore,
};
use crate::suite::{ExpectationSuite, SuiteStore};
use crate::validator::Validator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Name of the context root directory inside a project.
pub const CONTEXT_DIR_NAME: &str = "gx";

/// Handle on a context root and its stores.
///
/// Validation results go to a [`FilesystemResultStore`] under the root unless
/// another backend is set with
/// [`with_validation_results_store`](Self::with_validation_results_store).
#[derive(Debug, Clone)]
pub struct DataContext {
    root_dir: PathBuf,
    project_dir: PathBuf,
    config: ContextConfig,
    suites: SuiteStore,
    results: Arc<dyn ValidationResultStore>,
}

impl DataContext {
    /// Opens `<project_dir>/gx`, creating it with the default layout if
    /// it does not exist yet.
    pub async fn open_or_create(project_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_or_create_with_config(project_dir, ContextConfig::default()).await
    }

    /// Like [`open_or_create`](Self::open_or_create), using `config` when the
    /// context is created. An existing configuration file always wins.
    #[instrument(skip_all, fields(project = %project_dir.as_ref().display()))]
    pub async fn open_or_create_with_config(
        project_dir: impl AsRef<Path>,
        config: ContextConfig,
    ) -> Result<Self> {
        let project_dir = project_dir.as_ref().to_path_buf();
        let root_dir = project_dir.join(CONTEXT_DIR_NAME);
        let config_path = root_dir.join(CONFIG_FILE_NAME);

        let (config, created) = match tokio::fs::read_to_string(&config_path).await {
            Ok(json) => (
                ContextConfig::from_json(&json)?,
                false,
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                config.validate()?;
                (config, true)
            }
            Err(e) => return Err(e.into()),
        };

        for (_, dir) in config.directories() {
            tokio::fs::create_dir_all(root_dir.join(dir)).await?;
        }

        let context = Self {
            suites: SuiteStore::new(root_dir.join(&config.stores.expectations_dir)),
            results: Arc::new(FilesystemResultStore::new(
                root_dir.join(&config.stores.validation_results_dir),
            )),
            root_dir,
            project_dir,
            config,
        };
        if created {
            context.write_config(&context.config).await?;
        }

        info!(
            root = %context.root_dir.display(),
            created,
            datasources = context.config.data_sources.len(),
            "Opened data context"
        );
        Ok(context)
    }

    /// The context root, `<project>/gx`.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// The project directory; relative asset paths resolve against it.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn config_path(&self) -> PathBuf {
        self.root_dir.join(CONFIG_FILE_NAME)
    }

    /// Replaces the validation result backend.
    pub fn with_validation_results_store(
        mut self,
        store: impl ValidationResultStore + 'static,
    ) -> Self {
        self.results = Arc::new(store);
        self
    }

    async fn write_config(&self, config: &ContextConfig) -> Result<()> {
        let json = config.to_json()?;
        let path = self.config_path();
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, json)
            .await
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        tokio::fs::rename(&staging, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        debug!(path = %path.display(), "Saved context configuration");
        Ok(())
    }

    /// Looks up a registered datasource.
    pub fn datasource(&self, name: &str) -> Option<&Datasource> {
        registry::find(&self.config.data_sources, name)
    }

    /// Every registered datasource.
    pub fn datasources(&self) -> &[Datasource] {
        &self.config.data_sources
    }

    /// Registers a new datasource, failing if the name is taken.
    pub async fn add_datasource(&mut self, name: &str) -> Result<Datasource> {
        let source = Datasource::new(name)?;
        let mut staged = self.config.clone();
        registry::insert_new(&mut staged.data_sources, "datasource", source.clone())?;
        self.commit_config(staged).await?;
        Ok(source)
    }

    /// Returns the named datasource, registering it when missing.
    #[instrument(skip(self))]
    pub async fn get_or_add_datasource(&mut self, name: &str) -> Result<Registration<Datasource>> {
        let mut staged = self.config.clone();
        let registration = registry::get_or_insert_with(&mut staged.data_sources, name, || {
            Datasource::new(name)
        })?;
        self.commit_if_created(staged, &registration).await?;
        info!(outcome = registration.outcome(), "Datasource ready");
        Ok(registration)
    }

    /// Returns the named asset of `datasource`, registering it with `kind`
    /// when missing. `kind` is ignored for an existing asset.
    #[instrument(skip(self, kind))]
    pub async fn get_or_add_asset(
        &mut self,
        datasource: &str,
        name: &str,
        kind: AssetKind,
    ) -> Result<Registration<DataAsset>> {
        let mut staged = self.config.clone();
        let source = registry::find_mut(&mut staged.data_sources, datasource)
            .ok_or_else(|| TermError::not_found("datasource", datasource))?;
        let registration = source.get_or_add_asset(name, kind)?;
        self.commit_if_created(staged, &registration).await?;
        info!(outcome = registration.outcome(), "Data asset ready");
        Ok(registration)
    }

    /// Returns the named batch definition of an asset, registering it when
    /// missing.
    #[instrument(skip(self, partitioner))]
    pub async fn get_or_add_batch_definition(
        &mut self,
        datasource: &str,
        asset: &str,
        name: &str,
        partitioner: BatchPartitioner,
    ) -> Result<Registration<BatchDefinition>> {
        let mut staged = self.config.clone();
        let source = registry::find_mut(&mut staged.data_sources, datasource)
            .ok_or_else(|| TermError::not_found("datasource", datasource))?;
        let asset_ref = source
            .asset_mut(asset)
            .ok_or_else(|| TermError::not_found("data asset", asset))?;
        let registration = asset_ref.get_or_add_batch_definition(name, partitioner)?;
        self.commit_if_created(staged, &registration).await?;
        info!(outcome = registration.outcome(), "Batch definition ready");
        Ok(registration)
    }

    /// Saves `staged` and only then makes it the live configuration.
    async fn commit_config(&mut self, staged: ContextConfig) -> Result<()> {
        self.write_config(&staged).await?;
        self.config = staged;
        Ok(())
    }

    async fn commit_if_created<T>(
        &mut self,
        staged: ContextConfig,
        registration: &Registration<T>,
    ) -> Result<()> {
        if registration.was_created() {
            self.commit_config(staged).await?;
        }
        Ok(())
    }

    /// Materializes a fresh batch from a registered batch definition.
    pub async fn get_batch(
        &self,
        datasource: &str,
        asset: &str,
        batch_definition: &str,
        parameters: BatchParameters,
    ) -> Result<Batch> {
        let source = self
            .datasource(datasource)
            .ok_or_else(|| TermError::not_found("datasource", datasource))?;
        let asset_ref = source
            .asset(asset)
            .ok_or_else(|| TermError::not_found("data asset", asset))?;
        let definition = asset_ref
            .batch_definition(batch_definition)
            .ok_or_else(|| TermError::not_found("batch definition", batch_definition))?;

        Batch::load(source, asset_ref, definition, parameters, &self.project_dir).await
    }

    /// The expectation suite store.
    pub fn suites(&self) -> &SuiteStore {
        &self.suites
    }

    /// The validation result store.
    pub fn validation_results_store(&self) -> &dyn ValidationResultStore {
        self.results.as_ref()
    }

    /// Binds `batch` and `suite` for validation.
    pub fn get_validator(&self, batch: Batch, suite: ExpectationSuite) -> Validator {
        Validator::new(batch, suite)
    }

    /// Stores `result` under a key built from its suite, `run_id` and
    /// `batch_identifier`. Returns the key.
    #[instrument(skip_all, fields(suite = %result.suite_name, run = %run_id, batch = %batch_identifier))]
    pub async fn store_validation_result(
        &self,
        result: ValidationResult,
        run_id: RunIdentifier,
        batch_identifier: &str,
    ) -> Result<ValidationResultIdentifier> {
        let key = ValidationResultIdentifier::new(
            result.suite_name.clone(),
            run_id.clone(),
            batch_identifier,
        )?;
        let result = result.with_run_id(run_id);
        self.results.add(&key, &result).await?;
        Ok(key)
    }

    /// Rebuilds the data docs site from every stored suite and result.
    #[instrument(skip(self))]
    pub async fn build_data_docs(&self) -> Result<DataDocsSite> {
        let suites = self.suites.list().await?;

        let mut results = Vec::new();
        for key in self.results.list_keys().await? {
            if let Some(result) = self.results.get(&key).await? {
                results.push((key, result));
            }
        }

        self.docs_builder().build(&suites, &results).await
    }

    fn docs_builder(&self) -> DataDocsBuilder {
        DataDocsBuilder::new(
            self.config.data_docs.site_name.clone(),
            self.root_dir.join(&self.config.data_docs.site_dir),
        )
    }

    /// Location of the site's index page.
    pub fn data_docs_index(&self) -> PathBuf {
        self.docs_builder().index_path()
    }

    /// Opens the site's index page in the default browser.
    pub fn open_data_docs(&self) -> Result<()> {
        docs::open_page(&self.data_docs_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_layout_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let context = DataContext::open_or_create(dir.path()).await.unwrap();

        let root = dir.path().join("gx");
        assert_eq!(context.root_dir(), root);
        assert!(root.join("term_expect.json").exists());
        for sub in [
            "expectations",
            "validations",
            "checkpoints",
            "plugins",
            "data_docs/local_site",
        ] {
            assert!(root.join(sub).is_dir(), "{sub} missing");
        }
        assert!(!root.join("uncommitted").exists());
    }

    #[tokio::test]
    async fn test_registrations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let mut context = DataContext::open_or_create(dir.path()).await.unwrap();
        assert!(context
            .get_or_add_datasource("my_csv_datasource")
            .await
            .unwrap()
            .was_created());
        assert!(context
            .get_or_add_asset(
                "my_csv_datasource",
                "employees_asset",
                AssetKind::csv("data/employees.csv")
            )
            .await
            .unwrap()
            .was_created());

        let mut reopened = DataContext::open_or_create(dir.path()).await.unwrap();
        let source = reopened
            .get_or_add_datasource("my_csv_datasource")
            .await
            .unwrap();
        assert!(!source.was_created());
        assert_eq!(source.get().assets.len(), 1);
        assert_eq!(reopened.datasources().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_parents_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = DataContext::open_or_create(dir.path()).await.unwrap();

        let err = context
            .get_or_add_asset("nope", "a", AssetKind::Dataframe)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        context.add_datasource("src").await.unwrap();
        assert!(context.add_datasource("src").await.unwrap_err().is_already_exists());
        let err = context
            .get_or_add_batch_definition("src", "missing", "b", BatchPartitioner::WholeTable)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = context
            .get_batch("src", "missing", "b", BatchParameters::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_existing_config_wins() {
        let dir = tempfile::tempdir().unwrap();
        DataContext::open_or_create(dir.path()).await.unwrap();

        let custom = ContextConfig::default().with_validation_results_dir("history");
        let context = DataContext::open_or_create_with_config(dir.path(), custom)
            .await
            .unwrap();
        assert_eq!(
            context.config().stores.validation_results_dir,
            PathBuf::from("validations")
        );
    }

    #[tokio::test]
    async fn test_failed_save_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = DataContext::open_or_create(dir.path()).await.unwrap();

        // A plain file where the context root was makes every save fail.
        let root = dir.path().join("gx");
        std::fs::remove_dir_all(&root).unwrap();
        std::fs::write(&root, "").unwrap();
        assert!(context.get_or_add_datasource("src").await.is_err());
        assert!(context.add_datasource("other").await.is_err());
        assert!(context.datasource("src").is_none());
        assert!(context.datasources().is_empty());

        std::fs::remove_file(&root).unwrap();
        std::fs::create_dir_all(&root).unwrap();
        assert!(context
            .get_or_add_datasource("src")
            .await
            .unwrap()
            .was_created());
        let reopened = DataContext::open_or_create(dir.path()).await.unwrap();
        assert!(reopened.datasource("src").is_some());
    }

    #[tokio::test]
    async fn test_in_memory_results_store() {
        use crate::results::test_support::sample_result;
        use crate::results::InMemoryResultStore;

        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryResultStore::new();
        let context = DataContext::open_or_create(dir.path())
            .await
            .unwrap()
            .with_validation_results_store(store.clone());

        let key = context
            .store_validation_result(
                sample_result("my_hello_world_suite", true),
                RunIdentifier::named("my_run").unwrap(),
                "my_batch",
            )
            .await
            .unwrap();
        assert_eq!(store.list_keys().await.unwrap(), vec![key]);
        assert!(FilesystemResultStore::new(dir.path().join("gx/validations"))
            .is_empty()
            .await
            .unwrap());

        let site = context.build_data_docs().await.unwrap();
        assert_eq!(site.validation_pages, 1);
    }

    #[tokio::test]
    async fn test_corrupt_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("gx")).unwrap();
        std::fs::write(dir.path().join("gx/term_expect.json"), "{not json").unwrap();
        assert!(DataContext::open_or_create(dir.path()).await.is_err());
    }
}

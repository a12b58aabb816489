//! Expectation suites and their filesystem store.
//!
//! A suite is a named, ordered list of expectations persisted as
//! `<expectations_dir>/<name>.json`.

use crate::expectations::Expectation;
use crate::prelude::*;
use crate::registry::Named;
use crate::security::StoreKeySecurity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// Outcome of [`ExpectationSuite::populate_if_empty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    /// The suite was empty and `n` expectations were added.
    Populated(usize),
    /// The suite already held `n` expectations and was left untouched.
    AlreadyPopulated(usize),
}

impl Population {
    pub fn was_populated(&self) -> bool {
        matches!(self, Population::Populated(_))
    }

    /// Number of expectations in the suite after the call.
    pub fn len(&self) -> usize {
        match self {
            Population::Populated(n) | Population::AlreadyPopulated(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named, ordered collection of expectations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationSuite {
    pub name: String,
    #[serde(default)]
    pub expectations: Vec<Expectation>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl ExpectationSuite {
    /// Creates an empty suite.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        StoreKeySecurity::validate_segment("expectation suite name", &name)?;
        let mut meta = Map::new();
        meta.insert(
            "term_expect_version".to_string(),
            Value::from(env!("CARGO_PKG_VERSION")),
        );
        Ok(Self {
            name,
            expectations: Vec::new(),
            meta,
        })
    }

    pub fn len(&self) -> usize {
        self.expectations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expectations.is_empty()
    }

    /// Adds an expectation.
    ///
    /// An existing expectation with the same type and column is replaced in
    /// place, so the suite never holds two rules for the same domain.
    pub fn add_expectation(&mut self, expectation: impl Into<Expectation>) -> Result<()> {
        let expectation = expectation.into();
        expectation.validate()?;

        match self
            .expectations
            .iter_mut()
            .find(|existing| existing.same_domain(&expectation))
        {
            Some(existing) => {
                debug!(
                    suite = %self.name,
                    expectation_type = expectation.expectation_type(),
                    "Replacing expectation"
                );
                *existing = expectation;
            }
            None => self.expectations.push(expectation),
        }
        Ok(())
    }

    /// Adds `expectations` only when the suite has none.
    ///
    /// A suite that already holds rules is left exactly as it is; edits to
    /// the fixed list never reach an existing suite.
    pub fn populate_if_empty<I>(&mut self, expectations: I) -> Result<Population>
    where
        I: IntoIterator<Item = Expectation>,
    {
        if !self.is_empty() {
            return Ok(Population::AlreadyPopulated(self.len()));
        }

        let mut staged = self.clone();
        for expectation in expectations {
            staged.add_expectation(expectation)?;
        }
        *self = staged;
        Ok(Population::Populated(self.len()))
    }
}

impl Named for ExpectationSuite {
    fn name(&self) -> &str {
        &self.name
    }
}

/// JSON-file store of expectation suites.
#[derive(Debug, Clone)]
pub struct SuiteStore {
    dir: PathBuf,
}

impl SuiteStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        StoreKeySecurity::validate_segment("expectation suite name", name)?;
        Ok(self.dir.join(format!("{name}.json")))
    }

    /// Loads the named suite, or `None` when it has never been stored.
    #[instrument(skip(self))]
    pub async fn get(&self, name: &str) -> Result<Option<ExpectationSuite>> {
        let path = self.path_for(name)?;
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let suite: ExpectationSuite = serde_json::from_str(&json)?;
        if suite.name != name {
            return Err(TermError::Serialization(format!(
                "suite file '{}' contains suite '{}'",
                path.display(),
                suite.name
            )));
        }
        Ok(Some(suite))
    }

    /// Stores a new suite, failing with [`TermError::AlreadyExists`] if one
    /// with the same name is stored.
    #[instrument(skip(self, suite), fields(suite = %suite.name))]
    pub async fn add(&self, suite: &ExpectationSuite) -> Result<()> {
        let path = self.path_for(&suite.name)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let json = serde_json::to_string_pretty(suite)?;
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(TermError::already_exists("expectation suite", &suite.name));
            }
            Err(e) => return Err(e.into()),
        };

        use tokio::io::AsyncWriteExt;
        file.write_all(json.as_bytes()).await?;
        file.flush().await?;
        info!(expectations = suite.len(), "Stored new expectation suite");
        Ok(())
    }

    /// Stores `suite`, replacing any stored suite with the same name.
    #[instrument(skip(self, suite), fields(suite = %suite.name))]
    pub async fn add_or_update(&self, suite: &ExpectationSuite) -> Result<()> {
        let path = self.path_for(&suite.name)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(suite)?;

        // Readers only ever see the old file or the complete new one.
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, json)
            .await
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        tokio::fs::rename(&staging, &path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        info!(expectations = suite.len(), "Stored expectation suite");
        Ok(())
    }

    /// Returns the named suite, creating and storing an empty one if missing.
    pub async fn get_or_add(&self, name: &str) -> Result<Registration<ExpectationSuite>> {
        if let Some(existing) = self.get(name).await? {
            return Ok(Registration::Existing(existing));
        }
        let suite = ExpectationSuite::new(name)?;
        self.add(&suite).await?;
        Ok(Registration::Created(suite))
    }

    /// Populates `suite` when empty and persists it; a populated suite is
    /// neither changed nor rewritten.
    pub async fn populate_if_empty<I>(
        &self,
        suite: &mut ExpectationSuite,
        expectations: I,
    ) -> Result<Population>
    where
        I: IntoIterator<Item = Expectation>,
    {
        let population = suite.populate_if_empty(expectations)?;
        if population.was_populated() {
            self.add_or_update(suite).await?;
        }
        info!(
            suite = %suite.name,
            populated = population.was_populated(),
            expectations = population.len(),
            "Checked suite population"
        );
        Ok(population)
    }

    /// Names of every stored suite, sorted.
    pub async fn list_names(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match StoreKeySecurity::validate_segment("expectation suite name", stem) {
                Ok(()) => names.push(stem.to_string()),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unrecognized file in suite store");
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Loads every stored suite, sorted by name. Files that do not parse
    /// as a suite are skipped with a warning.
    pub async fn list(&self) -> Result<Vec<ExpectationSuite>> {
        let mut suites = Vec::new();
        for name in self.list_names().await? {
            match self.get(&name).await {
                Ok(Some(suite)) => suites.push(suite),
                Ok(None) => {}
                Err(e) => {
                    warn!(suite = %name, error = %e, "Skipping unreadable expectation suite");
                }
            }
        }
        Ok(suites)
    }
}

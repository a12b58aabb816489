//! Walkthroughs of the term-expect workflow.
//!
//! Each walkthrough opens (or creates) the context under a project
//! directory, registers its datasource, asset and batch definition once,
//! loads a fresh batch, populates its suite only when empty, validates,
//! stores the result and rebuilds the data docs. Running one repeatedly
//! reuses every named object and appends one stored result per run.
//!
//! - [`hello_world`]: an in-memory table
//! - [`csv_validation`]: `data/employees.csv`
//! - [`parquet_validation`]: a generated `data/transactions.parquet`

pub mod csv_validation;
pub mod hello_world;
pub mod parquet_validation;

use std::fmt::Write;
use std::path::PathBuf;
use term_expect::datasource::{AssetKind, BatchPartitioner};
use term_expect::docs::DataDocsSite;
use term_expect::formatters::{FormatterConfig, HumanFormatter};
use term_expect::prelude::*;
use term_expect::results::ValidationResultIdentifier;
use tracing::{info, warn};

/// Run name used when none is configured.
pub const DEFAULT_RUN_NAME: &str = "my_run";

/// Where and how a walkthrough runs.
#[derive(Debug, Clone)]
pub struct WalkthroughOptions {
    /// Directory holding `gx/` and `data/`.
    pub project_dir: PathBuf,
    /// Open the data docs index after building it.
    pub open_docs: bool,
    pub run_name: String,
}

impl WalkthroughOptions {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            open_docs: false,
            run_name: DEFAULT_RUN_NAME.to_string(),
        }
    }

    /// Options rooted at the current working directory, where `gx/` and
    /// `data/` are looked up.
    pub fn from_current_dir() -> Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn with_open_docs(mut self, open_docs: bool) -> Self {
        self.open_docs = open_docs;
        self
    }
}

/// Whether each named object was created by this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registrations {
    pub datasource_created: bool,
    pub asset_created: bool,
    pub batch_definition_created: bool,
    pub suite_created: bool,
}

impl Registrations {
    /// True when nothing had to be created.
    pub fn all_existing(&self) -> bool {
        !(self.datasource_created
            || self.asset_created
            || self.batch_definition_created
            || self.suite_created)
    }
}

/// Everything a walkthrough run produced.
#[derive(Debug, Clone)]
pub struct WalkthroughOutcome {
    pub registrations: Registrations,
    pub population: Population,
    pub result: ValidationResult,
    pub result_key: ValidationResultIdentifier,
    pub docs: DataDocsSite,
}

impl WalkthroughOutcome {
    /// Console summary: what was created or reused, then the result.
    pub fn summary(&self) -> Result<String> {
        let mut out = String::new();
        let label = |created: bool| if created { "Created new" } else { "Using existing" };
        let r = &self.registrations;
        let lines = [
            format!("{} datasource", label(r.datasource_created)),
            format!("{} asset", label(r.asset_created)),
            format!("{} batch definition", label(r.batch_definition_created)),
            format!("{} expectation suite", label(r.suite_created)),
            match self.population {
                Population::Populated(n) => format!("Added {n} expectations"),
                Population::AlreadyPopulated(n) => format!("Suite already has {n} expectations"),
            },
        ];
        for line in lines {
            writeln!(out, "{line}").map_err(|e| TermError::Internal(e.to_string()))?;
        }

        let formatter = HumanFormatter::with_config(FormatterConfig::default().with_colors(false));
        out.push_str(&formatter.format(&self.result)?);
        writeln!(out, "Stored result: {}", self.result_key)
            .and_then(|_| writeln!(out, "Data docs: {}", self.docs.index_path.display()))
            .map_err(|e| TermError::Internal(e.to_string()))?;
        Ok(out)
    }
}

/// The fixed names and rules of one walkthrough.
pub(crate) struct Flow {
    pub datasource: &'static str,
    pub asset: &'static str,
    pub kind: AssetKind,
    pub batch_definition: &'static str,
    pub partitioner: BatchPartitioner,
    pub suite: &'static str,
    pub rules: Vec<Expectation>,
    /// Label of the stored result; defaults to the batch id.
    pub batch_identifier: Option<&'static str>,
}

impl Flow {
    pub(crate) async fn run(
        self,
        options: &WalkthroughOptions,
        parameters: BatchParameters,
    ) -> Result<WalkthroughOutcome> {
        let mut context = DataContext::open_or_create(&options.project_dir).await?;

        let datasource = context.get_or_add_datasource(self.datasource).await?;
        let asset = context
            .get_or_add_asset(self.datasource, self.asset, self.kind)
            .await?;
        let batch_definition = context
            .get_or_add_batch_definition(
                self.datasource,
                self.asset,
                self.batch_definition,
                self.partitioner,
            )
            .await?;

        let batch = context
            .get_batch(self.datasource, self.asset, self.batch_definition, parameters)
            .await?;
        let batch_identifier = self
            .batch_identifier
            .map_or_else(|| batch.id().to_string(), str::to_string);

        let suite = context.suites().get_or_add(self.suite).await?;
        let suite_created = suite.was_created();
        let mut suite = suite.into_inner();
        let population = context
            .suites()
            .populate_if_empty(&mut suite, self.rules)
            .await?;

        let result = context.get_validator(batch, suite).validate().await?;

        let run_id = RunIdentifier::named(options.run_name.as_str())?;
        let result_key = context
            .store_validation_result(result.clone(), run_id, &batch_identifier)
            .await?;
        let docs = context.build_data_docs().await?;

        if options.open_docs {
            if let Err(e) = context.open_data_docs() {
                warn!(error = %e, "Could not open data docs");
            }
        }

        info!(
            suite = self.suite,
            success = result.success,
            key = %result_key,
            "Walkthrough finished"
        );

        Ok(WalkthroughOutcome {
            registrations: Registrations {
                datasource_created: datasource.was_created(),
                asset_created: asset.was_created(),
                batch_definition_created: batch_definition.was_created(),
                suite_created,
            },
            population,
            result,
            result_key,
            docs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_current_dir() {
        let options = WalkthroughOptions::from_current_dir().unwrap();
        assert_eq!(options.project_dir, std::env::current_dir().unwrap());
        assert_eq!(options.run_name, DEFAULT_RUN_NAME);
        assert!(!options.open_docs);
    }
}

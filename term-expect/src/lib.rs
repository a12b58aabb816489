//! # term-expect
//!
//! A file-backed data quality context built on Arrow and DataFusion.
//!
//! A [`DataContext`](context::DataContext) lives in a project's `gx/`
//! directory and persists everything a validation workflow needs between
//! runs: datasources, data assets and batch definitions in
//! `term_expect.json`, expectation suites as JSON files, every validation
//! result under a timestamped run identifier, and an HTML data docs site built
//! from the whole history.
//!
//! Named objects are get-or-create: the first run registers them and every
//! later run finds them again, reported through
//! [`Registration`](registry::Registration).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use arrow::array::{ArrayRef, Int64Array, StringArray};
//! use arrow::record_batch::RecordBatch;
//! use term_expect::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let mut context = DataContext::open_or_create(".").await?;
//! context.get_or_add_datasource("people").await?;
//! context
//!     .get_or_add_asset("people", "people_asset", AssetKind::Dataframe)
//!     .await?;
//! context
//!     .get_or_add_batch_definition("people", "people_asset", "whole", BatchPartitioner::WholeTable)
//!     .await?;
//!
//! let table = RecordBatch::try_from_iter(vec![
//!     ("name", Arc::new(StringArray::from(vec!["Alice", "Bob"])) as ArrayRef),
//!     ("age", Arc::new(Int64Array::from(vec![25, 30])) as ArrayRef),
//! ])?;
//! let batch = context
//!     .get_batch("people", "people_asset", "whole", BatchParameters::dataframe(table))
//!     .await?;
//!
//! let mut suite = context.suites().get_or_add("people_suite").await?.into_inner();
//! context
//!     .suites()
//!     .populate_if_empty(&mut suite, vec![
//!         Expectation::not_null("name"),
//!         Expectation::between("age", 0.0, 120.0),
//!     ])
//!     .await?;
//!
//! let result = context.get_validator(batch, suite).validate().await?;
//! println!("{}", HumanFormatter::new().format(&result)?);
//!
//! context
//!     .store_validation_result(result, RunIdentifier::named("nightly")?, "people_batch")
//!     .await?;
//! context.build_data_docs().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Expectations
//!
//! | Expectation | Unexpected rows |
//! |---|---|
//! | `expect_column_values_to_not_be_null` | null values |
//! | `expect_column_values_to_be_between` | values outside the bounds |
//! | `expect_column_values_to_be_unique` | values occurring more than once |
//! | `expect_column_values_to_be_in_set` | values outside the set |
//!
//! A failed expectation is a result with `success = false`, not an error.
//! Errors are reserved for faults like a missing column or an unreadable
//! file.
//!
//! ## Logging
//!
//! The library emits `tracing` events and spans. Binaries install a
//! subscriber with [`logging::setup::init_logging`].

pub mod batch;
pub mod config;
pub mod context;
pub mod datasource;
pub mod docs;
pub mod error;
pub mod expectations;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod registry;
pub mod results;
pub mod security;
pub mod sources;
pub mod suite;
pub mod validator;

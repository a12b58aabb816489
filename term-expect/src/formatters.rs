//! Result formatting for validation results.
//!
//! Formatters turn a [`ValidationResult`] into console text, JSON, or an HTML
//! fragment. The HTML fragment is what the data docs site embeds on each
//! result page.
//!
//! # Examples
//!
//! ```rust,ignore
//! use term_expect::formatters::{HumanFormatter, ResultFormatter};
//!
//! let formatter = HumanFormatter::new();
//! println!("{}", formatter.format(&result)?);
//! ```

use crate::docs::html_escape;
use crate::logging::truncate_field;
use crate::prelude::*;
use crate::results::{ExpectationValidationResult, ValidationResult};
use serde_json::Value;
use std::fmt::Write;

/// Longest rendered sample value.
const MAX_VALUE_LENGTH: usize = 80;

/// Configuration options for formatting validation results.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the statistics block
    pub include_statistics: bool,
    /// Include per-expectation detail for failed expectations
    pub include_failures: bool,
    /// Also list expectations that passed
    pub include_passed: bool,
    /// Maximum number of unexpected values listed per expectation (-1 for all)
    pub max_unexpected_values: i32,
    /// Whether to use colorized output (for the human formatter)
    pub use_colors: bool,
    /// Whether to include run and validation timestamps
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_statistics: true,
            include_failures: true,
            include_passed: false,
            max_unexpected_values: 10,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Summary only.
    pub fn minimal() -> Self {
        Self {
            include_statistics: true,
            include_failures: false,
            include_passed: false,
            max_unexpected_values: 0,
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Everything, including passing expectations and every sampled value.
    pub fn detailed() -> Self {
        Self {
            include_statistics: true,
            include_failures: true,
            include_passed: true,
            max_unexpected_values: -1,
            use_colors: true,
            include_timestamps: true,
        }
    }

    pub fn with_statistics(mut self, include: bool) -> Self {
        self.include_statistics = include;
        self
    }

    pub fn with_failures(mut self, include: bool) -> Self {
        self.include_failures = include;
        self
    }

    pub fn with_passed(mut self, include: bool) -> Self {
        self.include_passed = include;
        self
    }

    pub fn with_max_unexpected_values(mut self, max: i32) -> Self {
        self.max_unexpected_values = max;
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn sample<'a>(&self, values: &'a [Value]) -> &'a [Value] {
        if self.max_unexpected_values < 0 {
            values
        } else {
            &values[..values.len().min(self.max_unexpected_values as usize)]
        }
    }

    fn shows(&self, result: &ExpectationValidationResult) -> bool {
        if result.success {
            self.include_passed
        } else {
            self.include_failures
        }
    }
}

/// Trait for formatting validation results into different output formats.
pub trait ResultFormatter {
    /// Formats a validation result into a string representation.
    fn format(&self, result: &ValidationResult) -> Result<String>;

    /// Formats a validation result with custom configuration.
    fn format_with_config(
        &self,
        result: &ValidationResult,
        _config: &FormatterConfig,
    ) -> Result<String> {
        self.format(result)
    }
}

fn fmt_error(e: std::fmt::Error) -> TermError {
    TermError::Internal(format!("Failed to format validation result: {e}"))
}

fn render_value(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    };
    truncate_field(&text, MAX_VALUE_LENGTH)
}

fn render_percent(percent: Option<f64>) -> String {
    percent.map_or_else(|| "n/a".to_string(), |p| format!("{p:.1}%"))
}

/// Formats validation results as structured JSON.
///
/// The full stored representation is emitted unless the configuration
/// excludes passing or failing expectations.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::detailed(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for JsonFormatter {
    fn format(&self, result: &ValidationResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(
        &self,
        result: &ValidationResult,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut filtered = result.clone();
        filtered.results.retain(|r| config.shows(r));
        for r in &mut filtered.results {
            let keep = config.sample(&r.result.partial_unexpected_list).len();
            r.result.partial_unexpected_list.truncate(keep);
        }

        let json = if self.pretty {
            serde_json::to_string_pretty(&filtered)
        } else {
            serde_json::to_string(&filtered)
        };
        json.map_err(|e| TermError::Internal(format!("Failed to serialize result to JSON: {e}")))
    }
}

/// Formats validation results for console output.
///
/// Prints a pass/fail header, the statistics, and the detail of every failed
/// expectation.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn render(
        output: &mut String,
        result: &ValidationResult,
        config: &FormatterConfig,
    ) -> std::fmt::Result {
        let paint = |text: &str, code: &str| {
            if config.use_colors {
                format!("\x1b[{code}m{text}\x1b[0m")
            } else {
                text.to_string()
            }
        };

        writeln!(output)?;
        if result.success {
            writeln!(output, "✅ {}", paint("Validation PASSED", "32"))?;
        } else {
            writeln!(output, "❌ {}", paint("Validation FAILED", "31"))?;
        }
        writeln!(output)?;
        writeln!(output, "Suite: {}", result.suite_name)?;
        writeln!(
            output,
            "Batch: {} ({} rows)",
            result.meta.batch_id, result.meta.row_count
        )?;
        if let Some(run_id) = &result.meta.run_id {
            writeln!(output, "Run: {run_id}")?;
        }
        if config.include_timestamps {
            writeln!(output, "Validated at: {}", result.meta.validation_time)?;
        }

        if config.include_statistics {
            let stats = &result.statistics;
            writeln!(output)?;
            writeln!(output, "📊 Summary Statistics:")?;
            writeln!(output, "   Evaluated: {}", stats.evaluated_expectations)?;
            writeln!(
                output,
                "   ✅ Passed: {}",
                paint(&stats.successful_expectations.to_string(), "32")
            )?;
            writeln!(
                output,
                "   ❌ Failed: {}",
                paint(&stats.unsuccessful_expectations.to_string(), "31")
            )?;
            writeln!(
                output,
                "   Success Rate: {}",
                render_percent(stats.success_percent)
            )?;
        }

        let shown: Vec<_> = result.results.iter().filter(|r| config.shows(r)).collect();
        if !shown.is_empty() {
            writeln!(output)?;
            writeln!(output, "🔍 Expectations:")?;
        }
        for r in shown {
            let detail = &r.result;
            let symbol = if r.success { "✅" } else { "❌" };
            writeln!(output)?;
            writeln!(
                output,
                "   {symbol} {}",
                r.expectation_config.expectation_type()
            )?;
            writeln!(output, "      Rule: {}", r.expectation_config.describe())?;
            writeln!(
                output,
                "      Unexpected: {} of {} ({})",
                detail.unexpected_count,
                detail.element_count,
                render_percent(detail.unexpected_percent)
            )?;
            if let Some(missing) = detail.missing_count {
                writeln!(output, "      Missing: {missing}")?;
            }

            let sample = config.sample(&detail.partial_unexpected_list);
            if !sample.is_empty() {
                let values: Vec<String> = sample.iter().map(render_value).collect();
                writeln!(output, "      Sample: [{}]", values.join(", "))?;
            }
        }

        writeln!(output)
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for HumanFormatter {
    fn format(&self, result: &ValidationResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(
        &self,
        result: &ValidationResult,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        Self::render(&mut output, result, config).map_err(fmt_error)?;
        Ok(output)
    }
}

/// Renders a result as an HTML fragment: a summary table and one row per
/// expectation.
///
/// Every interpolated value is escaped.
#[derive(Debug, Clone)]
pub struct HtmlFormatter {
    config: FormatterConfig,
}

impl HtmlFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::detailed().with_max_unexpected_values(20),
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn render(
        output: &mut String,
        result: &ValidationResult,
        config: &FormatterConfig,
    ) -> std::fmt::Result {
        let status = if result.success { "success" } else { "failure" };
        let label = if result.success { "Succeeded" } else { "Failed" };

        writeln!(
            output,
            r#"<section class="validation {status}"><h2>{label}: {}</h2>"#,
            html_escape(&result.suite_name)
        )?;
        writeln!(output, r#"<table class="overview">"#)?;
        let mut row = |key: &str, value: String| {
            writeln!(
                output,
                "<tr><th>{}</th><td>{}</td></tr>",
                html_escape(key),
                html_escape(&value)
            )
        };
        row("Batch", result.meta.batch_id.clone())?;
        row("Batch definition", result.meta.batch_definition.clone())?;
        row("Rows", result.meta.row_count.to_string())?;
        if let Some(run_id) = &result.meta.run_id {
            row("Run name", run_id.run_name_segment().to_string())?;
            row("Run time", run_id.run_time().to_rfc3339())?;
        }
        if config.include_timestamps {
            row("Validated at", result.meta.validation_time.to_rfc3339())?;
        }
        if config.include_statistics {
            let stats = &result.statistics;
            row("Evaluated", stats.evaluated_expectations.to_string())?;
            row("Successful", stats.successful_expectations.to_string())?;
            row("Unsuccessful", stats.unsuccessful_expectations.to_string())?;
            row("Success percent", render_percent(stats.success_percent))?;
        }
        writeln!(output, "</table>")?;

        writeln!(output, r#"<table class="expectations">"#)?;
        writeln!(
            output,
            "<tr><th>Status</th><th>Expectation</th><th>Column</th><th>Rule</th><th>Unexpected</th><th>Sample</th></tr>"
        )?;
        for r in result.results.iter().filter(|r| config.shows(r)) {
            let detail = &r.result;
            let sample: Vec<String> = config
                .sample(&detail.partial_unexpected_list)
                .iter()
                .map(render_value)
                .collect();
            writeln!(
                output,
                r#"<tr class="{}"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{} of {} ({})</td><td>{}</td></tr>"#,
                if r.success { "success" } else { "failure" },
                if r.success { "✅" } else { "❌" },
                html_escape(r.expectation_config.expectation_type()),
                html_escape(r.expectation_config.column()),
                html_escape(&r.expectation_config.describe()),
                detail.unexpected_count,
                detail.element_count,
                render_percent(detail.unexpected_percent),
                html_escape(&sample.join(", "))
            )?;
        }
        writeln!(output, "</table></section>")
    }
}

impl Default for HtmlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for HtmlFormatter {
    fn format(&self, result: &ValidationResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(
        &self,
        result: &ValidationResult,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        Self::render(&mut output, result, config).map_err(fmt_error)?;
        Ok(output)
    }
}

use super::html_escape;
use crate::formatters::{HtmlFormatter, ResultFormatter};
use crate::prelude::*;
use crate::results::{ValidationResult, ValidationResultIdentifier};
use crate::suite::ExpectationSuite;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;margin:1em 0}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:left}\
tr.success td:first-child{color:#2a7a2a}tr.failure td:first-child{color:#b22}\
section.failure h2{color:#b22}section.success h2{color:#2a7a2a}";

/// Summary of a generated site.
#[derive(Debug, Clone, PartialEq)]
pub struct DataDocsSite {
    pub site_name: String,
    pub root: PathBuf,
    pub index_path: PathBuf,
    pub validation_pages: usize,
    pub suite_pages: usize,
}

/// Renders the data docs site into a directory.
#[derive(Debug, Clone)]
pub struct DataDocsBuilder {
    site_name: String,
    site_dir: PathBuf,
    formatter: HtmlFormatter,
}

impl DataDocsBuilder {
    pub fn new(site_name: impl Into<String>, site_dir: impl Into<PathBuf>) -> Self {
        Self {
            site_name: site_name.into(),
            site_dir: site_dir.into(),
            formatter: HtmlFormatter::new(),
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.site_dir.join("index.html")
    }

    /// Regenerates the whole site from `suites` and `results`.
    ///
    /// Pages of results or suites that are no longer stored are removed.
    #[instrument(skip_all, fields(site = %self.site_name, results = results.len(), suites = suites.len()))]
    pub async fn build(
        &self,
        suites: &[ExpectationSuite],
        results: &[(ValidationResultIdentifier, ValidationResult)],
    ) -> Result<DataDocsSite> {
        tokio::fs::create_dir_all(&self.site_dir).await?;
        for sub in ["validations", "expectations"] {
            let dir = self.site_dir.join(sub);
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let mut ordered: Vec<&(ValidationResultIdentifier, ValidationResult)> =
            results.iter().collect();
        ordered.sort_by(|(a, _), (b, _)| {
            b.run_id()
                .run_time()
                .cmp(&a.run_id().run_time())
                .then_with(|| a.suite_name().cmp(b.suite_name()))
        });

        for (key, result) in &ordered {
            let relative = Self::validation_page(key);
            let body = self.formatter.format(result)?;
            let title = format!("{} / {}", key.suite_name(), key.run_id());
            self.write_page(&relative, &title, &body).await?;
        }

        for suite in suites {
            let relative = Self::suite_page(&suite.name);
            let body = Self::render_suite(suite).map_err(fmt_error)?;
            self.write_page(&relative, &suite.name, &body).await?;
        }

        let index = self.render_index(&ordered, suites).map_err(fmt_error)?;
        self.write_page(Path::new("index.html"), &self.site_name, &index)
            .await?;

        let site = DataDocsSite {
            site_name: self.site_name.clone(),
            root: self.site_dir.clone(),
            index_path: self.index_path(),
            validation_pages: ordered.len(),
            suite_pages: suites.len(),
        };
        info!(index = %site.index_path.display(), "Built data docs");
        Ok(site)
    }

    fn validation_page(key: &ValidationResultIdentifier) -> PathBuf {
        Path::new("validations").join(key.relative_path("html"))
    }

    fn suite_page(name: &str) -> PathBuf {
        Path::new("expectations").join(format!("{name}.html"))
    }

    /// Relative link from `index.html`, always with forward slashes.
    fn link(path: &Path) -> String {
        path.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    async fn write_page(&self, relative: &Path, title: &str, body: &str) -> Result<()> {
        let path = self.site_dir.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let html = format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
            html_escape(title)
        );
        tokio::fs::write(&path, html).await?;
        Ok(())
    }

    fn render_index(
        &self,
        results: &[&(ValidationResultIdentifier, ValidationResult)],
        suites: &[ExpectationSuite],
    ) -> std::result::Result<String, std::fmt::Error> {
        let mut out = String::new();
        writeln!(out, "<h1>{}</h1>", html_escape(&self.site_name))?;

        writeln!(out, "<h2>Validation results ({})</h2>", results.len())?;
        if results.is_empty() {
            writeln!(out, "<p>No validation results stored yet.</p>")?;
        } else {
            writeln!(
                out,
                "<table class=\"results\"><tr><th>Status</th><th>Suite</th><th>Run name</th><th>Run time</th><th>Batch</th></tr>"
            )?;
            for (key, result) in results {
                let (class, label) = if result.success {
                    ("success", "✅ Succeeded")
                } else {
                    ("failure", "❌ Failed")
                };
                writeln!(
                    out,
                    "<tr class=\"{class}\"><td><a href=\"{}\">{label}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    html_escape(&Self::link(&Self::validation_page(key))),
                    html_escape(key.suite_name()),
                    html_escape(key.run_id().run_name_segment()),
                    html_escape(&key.run_id().run_time().to_rfc3339()),
                    html_escape(key.batch_identifier())
                )?;
            }
            writeln!(out, "</table>")?;
        }

        writeln!(out, "<h2>Expectation suites ({})</h2>", suites.len())?;
        writeln!(out, "<ul>")?;
        for suite in suites {
            writeln!(
                out,
                "<li><a href=\"{}\">{}</a> ({} expectations)</li>",
                html_escape(&Self::link(&Self::suite_page(&suite.name))),
                html_escape(&suite.name),
                suite.len()
            )?;
        }
        writeln!(out, "</ul>")?;
        Ok(out)
    }

    fn render_suite(suite: &ExpectationSuite) -> std::result::Result<String, std::fmt::Error> {
        let mut out = String::new();
        writeln!(out, "<h1>{}</h1>", html_escape(&suite.name))?;
        writeln!(
            out,
            "<table class=\"expectations\"><tr><th>Expectation</th><th>Column</th><th>Rule</th></tr>"
        )?;
        for e in &suite.expectations {
            writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                html_escape(e.expectation_type()),
                html_escape(e.column()),
                html_escape(&e.describe())
            )?;
        }
        writeln!(out, "</table>")?;
        Ok(out)
    }
}

fn fmt_error(e: std::fmt::Error) -> TermError {
    TermError::Internal(format!("Failed to render data docs: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectations::Expectation;
    use crate::results::test_support::sample_result;
    use crate::results::RunIdentifier;
    use chrono::{TimeZone, Utc};

    fn keyed(seconds: u32, success: bool) -> (ValidationResultIdentifier, ValidationResult) {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, seconds).unwrap();
        let run_id = RunIdentifier::new(Some("my_run".to_string()), time).unwrap();
        let key =
            ValidationResultIdentifier::new("my_hello_world_suite", run_id.clone(), "my_batch")
                .unwrap();
        (
            key,
            sample_result("my_hello_world_suite", success).with_run_id(run_id),
        )
    }

    fn suite() -> ExpectationSuite {
        let mut suite = ExpectationSuite::new("my_hello_world_suite").unwrap();
        suite.add_expectation(Expectation::not_null("name")).unwrap();
        suite
    }

    #[tokio::test]
    async fn test_build_writes_every_page() {
        let dir = tempfile::tempdir().unwrap();
        let builder = DataDocsBuilder::new("local_site", dir.path().join("site"));
        let results = vec![keyed(1, true), keyed(2, false)];

        let site = builder.build(&[suite()], &results).await.unwrap();
        assert_eq!(site.validation_pages, 2);
        assert_eq!(site.suite_pages, 1);

        let index = std::fs::read_to_string(&site.index_path).unwrap();
        assert!(index.contains("Validation results (2)"));
        // Newest first.
        let newer = index.find("20240301T120002").unwrap();
        let older = index.find("20240301T120001").unwrap();
        assert!(newer < older);
        assert!(index.contains("expectations/my_hello_world_suite.html"));

        for (key, _) in &results {
            assert!(site
                .root
                .join("validations")
                .join(key.relative_path("html"))
                .exists());
        }
        assert!(site.root.join("expectations/my_hello_world_suite.html").exists());
    }

    #[tokio::test]
    async fn test_rebuild_drops_stale_pages() {
        let dir = tempfile::tempdir().unwrap();
        let builder = DataDocsBuilder::new("local_site", dir.path());
        let first = keyed(1, true);
        builder.build(&[], std::slice::from_ref(&first)).await.unwrap();
        let page = dir
            .path()
            .join("validations")
            .join(first.0.relative_path("html"));
        assert!(page.exists());

        let site = builder.build(&[], &[]).await.unwrap();
        assert!(!page.exists());
        let index = std::fs::read_to_string(site.index_path).unwrap();
        assert!(index.contains("No validation results stored yet."));
    }
}

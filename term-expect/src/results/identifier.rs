//! Keys for stored validation results.

use crate::prelude::*;
use crate::security::StoreKeySecurity;
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Rendering of a run time inside store paths, e.g. `20240105T093012.123456Z`.
pub const RUN_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%.6fZ";

/// Path segment used for runs without a run name.
pub const UNNAMED_RUN: &str = "__none__";

/// Identifies one validation run: an optional label plus a UTC timestamp.
///
/// Run times are kept at microsecond precision so they survive a round trip
/// through [`RUN_TIME_FORMAT`].
///
/// # Example
///
/// ```rust
/// use term_expect::results::RunIdentifier;
///
/// let run_id = RunIdentifier::named("my_run").unwrap();
/// assert_eq!(run_id.run_name(), Some("my_run"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunIdentifier {
    run_name: Option<String>,
    run_time: DateTime<Utc>,
}

impl RunIdentifier {
    pub fn new(run_name: Option<String>, run_time: DateTime<Utc>) -> Result<Self> {
        if let Some(name) = &run_name {
            StoreKeySecurity::validate_segment("run name", name)?;
            if name == UNNAMED_RUN {
                return Err(TermError::Configuration(format!(
                    "'{UNNAMED_RUN}' is reserved for unnamed runs"
                )));
            }
        }
        Ok(Self {
            run_name,
            run_time: run_time.trunc_subsecs(6),
        })
    }

    /// A run named `run_name`, timestamped now.
    pub fn named(run_name: impl Into<String>) -> Result<Self> {
        Self::new(Some(run_name.into()), Utc::now())
    }

    /// An unnamed run timestamped now.
    pub fn now() -> Self {
        Self {
            run_name: None,
            run_time: Utc::now().trunc_subsecs(6),
        }
    }

    pub fn run_name(&self) -> Option<&str> {
        self.run_name.as_deref()
    }

    pub fn run_time(&self) -> DateTime<Utc> {
        self.run_time
    }

    /// The run name, or [`UNNAMED_RUN`].
    pub fn run_name_segment(&self) -> &str {
        self.run_name.as_deref().unwrap_or(UNNAMED_RUN)
    }

    pub fn run_time_segment(&self) -> String {
        self.run_time.format(RUN_TIME_FORMAT).to_string()
    }

    fn parse_run_time(segment: &str) -> Result<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(segment, RUN_TIME_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| {
                TermError::Serialization(format!("invalid run time '{segment}': {e}"))
            })
    }
}

impl fmt::Display for RunIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.run_name_segment(), self.run_time_segment())
    }
}

/// Key of a stored validation result: suite, run and batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationResultIdentifier {
    suite_name: String,
    run_id: RunIdentifier,
    batch_identifier: String,
}

impl ValidationResultIdentifier {
    pub fn new(
        suite_name: impl Into<String>,
        run_id: RunIdentifier,
        batch_identifier: impl Into<String>,
    ) -> Result<Self> {
        let suite_name = suite_name.into();
        let batch_identifier = batch_identifier.into();
        StoreKeySecurity::validate_segment("expectation suite name", &suite_name)?;
        StoreKeySecurity::validate_segment("batch identifier", &batch_identifier)?;
        Ok(Self {
            suite_name,
            run_id,
            batch_identifier,
        })
    }

    pub fn suite_name(&self) -> &str {
        &self.suite_name
    }

    pub fn run_id(&self) -> &RunIdentifier {
        &self.run_id
    }

    pub fn batch_identifier(&self) -> &str {
        &self.batch_identifier
    }

    /// `<suite>/<run_name>/<run_time>/<batch>.<extension>`, relative to a
    /// store root.
    pub fn relative_path(&self, extension: &str) -> PathBuf {
        PathBuf::from(&self.suite_name)
            .join(self.run_id.run_name_segment())
            .join(self.run_id.run_time_segment())
            .join(format!("{}.{extension}", self.batch_identifier))
    }

    /// Parses a path produced by [`relative_path`](Self::relative_path).
    pub fn from_relative_path(path: &Path) -> Result<Self> {
        let invalid = || {
            TermError::Serialization(format!(
                "'{}' is not a validation result path",
                path.display()
            ))
        };

        let segments = path
            .components()
            .map(|c| match c {
                Component::Normal(s) => s.to_str().ok_or_else(invalid),
                _ => Err(invalid()),
            })
            .collect::<Result<Vec<_>>>()?;
        let [suite, run_name, run_time, file] = segments.as_slice() else {
            return Err(invalid());
        };

        let batch = Path::new(file)
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(invalid)?;
        let run_name = (*run_name != UNNAMED_RUN).then(|| run_name.to_string());
        let run_id = RunIdentifier::new(run_name, RunIdentifier::parse_run_time(run_time)?)?;

        Self::new(*suite, run_id, batch)
    }
}

impl fmt::Display for ValidationResultIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.suite_name, self.run_id, self.batch_identifier
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 9, 30, 12).unwrap()
            + chrono::Duration::nanoseconds(123_456_789)
    }

    #[test]
    fn test_run_time_segment() {
        let run_id = RunIdentifier::new(Some("my_run".to_string()), fixed_time()).unwrap();
        assert_eq!(run_id.run_time_segment(), "20240105T093012.123456Z");
        assert_eq!(run_id.to_string(), "my_run/20240105T093012.123456Z");
    }

    #[test]
    fn test_relative_path_round_trip() {
        let run_id = RunIdentifier::new(Some("my_run".to_string()), fixed_time()).unwrap();
        let key = ValidationResultIdentifier::new("my_hello_world_suite", run_id, "my_batch").unwrap();

        let path = key.relative_path("json");
        assert_eq!(
            path,
            PathBuf::from("my_hello_world_suite/my_run/20240105T093012.123456Z/my_batch.json")
        );
        assert_eq!(ValidationResultIdentifier::from_relative_path(&path).unwrap(), key);
    }

    #[test]
    fn test_unnamed_run() {
        let run_id = RunIdentifier::new(None, fixed_time()).unwrap();
        let key = ValidationResultIdentifier::new("s", run_id, "b").unwrap();
        let path = key.relative_path("json");
        assert!(path.starts_with("s/__none__"));

        let parsed = ValidationResultIdentifier::from_relative_path(&path).unwrap();
        assert_eq!(parsed.run_id().run_name(), None);
        assert!(RunIdentifier::named(UNNAMED_RUN).is_err());
    }

    #[test]
    fn test_invalid_keys() {
        assert!(RunIdentifier::named("a/b").is_err());
        assert!(ValidationResultIdentifier::new("..", RunIdentifier::now(), "b").is_err());
        assert!(ValidationResultIdentifier::from_relative_path(Path::new("s/run/b.json")).is_err());
        assert!(
            ValidationResultIdentifier::from_relative_path(Path::new("s/run/yesterday/b.json"))
                .is_err()
        );
    }
}

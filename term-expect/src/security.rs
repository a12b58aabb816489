//! Input hardening for SQL generation and on-disk store keys.
//!
//! Column names and set values end up inside generated SQL, and object names
//! (suites, run names, batch identifiers) end up as path segments under the
//! context root. Both go through this module before use.

use crate::error::{Result, TermError};
use once_cell::sync::Lazy;
use regex::Regex;

/// SQL identifier validation and escaping utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates and quotes a SQL identifier (table or column name).
    ///
    /// Any header a CSV or Parquet file can carry is accepted; embedded
    /// double quotes are doubled so the result is always one identifier.
    ///
    /// # Examples
    /// ```rust
    /// use term_expect::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::escape_identifier("age").unwrap(), "\"age\"");
    /// assert_eq!(SqlSecurity::escape_identifier("full name").unwrap(), "\"full name\"");
    /// assert_eq!(SqlSecurity::escape_identifier("a\"b").unwrap(), "\"a\"\"b\"");
    /// ```
    pub fn escape_identifier(identifier: &str) -> Result<String> {
        Self::validate_identifier(identifier)?;

        let escaped = identifier.replace('"', "\"\"");
        Ok(format!("\"{escaped}\""))
    }

    /// Validates a SQL identifier without escaping it.
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.is_empty() || identifier.trim().is_empty() {
            return Err(TermError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > 128 {
            return Err(TermError::SecurityError(
                "SQL identifier too long (max 128 characters)".to_string(),
            ));
        }

        if identifier.contains('\0') {
            return Err(TermError::SecurityError(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }

        Ok(())
    }

    /// Quotes a string literal for SQL, doubling embedded single quotes.
    pub fn quote_literal(value: &str) -> Result<String> {
        if value.contains('\0') {
            return Err(TermError::SecurityError(
                "SQL literal cannot contain null bytes".to_string(),
            ));
        }
        Ok(format!("'{}'", value.replace('\'', "''")))
    }
}

/// Validation of names that are used as path segments inside the stores.
pub struct StoreKeySecurity;

impl StoreKeySecurity {
    /// Maximum length of a single store key segment.
    pub const MAX_SEGMENT_LENGTH: usize = 128;

    /// Validates that `value` is usable as one directory or file name segment.
    ///
    /// Segments may contain ASCII letters, digits, `_`, `-` and `.`, must not
    /// start with a dot, and must not be empty.
    pub fn validate_segment(kind: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            return Err(TermError::SecurityError(format!("{kind} cannot be empty")));
        }

        if value.len() > Self::MAX_SEGMENT_LENGTH {
            return Err(TermError::SecurityError(format!(
                "{kind} too long: {} characters (max {})",
                value.len(),
                Self::MAX_SEGMENT_LENGTH
            )));
        }

        static SEGMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(r"^[A-Za-z0-9_\-][A-Za-z0-9_.\-]*$")
                .expect("Hard-coded regex pattern should be valid")
        });

        if !SEGMENT_REGEX.is_match(value) {
            return Err(TermError::SecurityError(format!(
                "Invalid {kind} '{value}': only letters, digits, '_', '-' and '.' are allowed, and it may not start with '.'"
            )));
        }

        Ok(())
    }
}

/// Validates a fraction such as `mostly` (0.0 to 1.0, finite).
pub fn validate_fraction(value: f64, name: &str) -> Result<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(TermError::Configuration(format!(
            "Invalid {name} value: must be between 0.0 and 1.0, got {value}"
        )));
    }
    Ok(())
}

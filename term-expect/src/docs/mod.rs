//! Static HTML data docs.
//!
//! The site is regenerated in full from the stored suites and validation
//! results on every build, so it always reflects the whole history.

mod builder;

pub use builder::{DataDocsBuilder, DataDocsSite};

use crate::prelude::*;
use std::path::Path;
use tracing::info;

/// Escapes text for inclusion in HTML element content or attribute values.
pub fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Opens a page of the site in the default browser.
pub fn open_page(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(TermError::not_found(
            "data docs page",
            path.display().to_string(),
        ));
    }
    open::that(path).map_err(|e| {
        TermError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open '{}': {e}", path.display()),
        ))
    })?;
    info!(path = %path.display(), "Opened data docs");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(html_escape("plain"), "plain");
    }

    #[test]
    fn test_open_missing_page() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_page(&dir.path().join("index.html")).unwrap_err();
        assert!(err.is_not_found());
    }
}

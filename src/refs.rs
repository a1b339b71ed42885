//! Extraction of an application name and version from pipeline refs.
//!
//! Many projects tag release pipelines with refs such as `my-app - v1.2.3`.
//! A user-supplied regular expression with a `name` group (and optionally a
//! `version` group) turns those refs into a logical application name, which
//! is used to group history runs.
//!
//! Matching uses [`Regex::captures`], so it is a search: anchor the pattern
//! with `^`/`$` to force a full match. Case sensitivity is whatever the
//! pattern asks for (`(?i)` for insensitive).

use regex::Regex;

use crate::error::{CISyncError, Result};
use crate::models::{PipelineHistoryEntry, NOT_AVAILABLE};

/// Result of matching one ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRef {
    pub name: String,
    pub version: String,
    /// `false` means the entry must not be enriched or grouped.
    pub matched: bool,
}

impl ParsedRef {
    fn unmatched() -> Self {
        Self {
            name: String::new(),
            version: NOT_AVAILABLE.to_string(),
            matched: false,
        }
    }
}

/// A validated ref pattern.
#[derive(Debug, Clone)]
pub struct RefPattern {
    regex: Regex,
}

impl RefPattern {
    /// Compiles `pattern` and checks it declares a `name` group.
    ///
    /// # Errors
    ///
    /// Returns [`CISyncError::InvalidRefPattern`] if the pattern does not
    /// compile or has no group called `name`.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).map_err(|e| CISyncError::InvalidRefPattern(e.to_string()))?;

        if !regex.capture_names().flatten().any(|group| group == "name") {
            return Err(CISyncError::InvalidRefPattern(format!(
                "`{pattern}` has no named group `name`"
            )));
        }

        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Never fails: a ref the pattern does not match gives `("", "N/A", false)`.
    pub fn parse(&self, ref_: &str) -> ParsedRef {
        let Some(captures) = self.regex.captures(ref_) else {
            return ParsedRef::unmatched();
        };

        let name = captures
            .name("name")
            .map_or("", |m| m.as_str())
            .to_string();
        let version = captures
            .name("version")
            .map(|m| m.as_str())
            .filter(|version| !version.is_empty())
            .unwrap_or(NOT_AVAILABLE)
            .to_string();

        ParsedRef {
            name,
            version,
            matched: true,
        }
    }
}

/// Keeps the runs of application `app_name`, enriched with their version and link.
///
/// Runs whose ref does not match the pattern are dropped.
pub fn select_application_runs(
    history: &[PipelineHistoryEntry],
    pattern: &RefPattern,
    app_name: &str,
) -> Vec<PipelineHistoryEntry> {
    history
        .iter()
        .filter_map(|entry| {
            let parsed = pattern.parse(&entry.ref_);
            (parsed.matched && parsed.name == app_name).then(|| {
                entry.with_version_and_url(parsed.version, entry.web_url.clone().unwrap_or_default())
            })
        })
        .collect()
}

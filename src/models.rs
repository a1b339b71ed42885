//! Typed views over raw GitLab pipeline and test-report records.
//!
//! Parsing is total: every field that is absent, `null` or of an unexpected
//! type resolves to its default instead of failing, so a partially populated
//! upstream record never aborts a run.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Sentinel rendered wherever a value is unknown.
pub const NOT_AVAILABLE: &str = "N/A";

/// Name given to pipelines whose record carries no name.
const UNNAMED_PIPELINE: &str = "unknown";

/// Final or current state of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Success,
    Failed,
    Running,
    Pending,
    Canceled,
    Skipped,
    #[default]
    Unknown,
}

impl PipelineStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "running" => Self::Running,
            "pending" => Self::Pending,
            "canceled" | "cancelled" => Self::Canceled,
            "skipped" => Self::Skipped,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Running => "running",
            Self::Pending => "pending",
            Self::Canceled => "canceled",
            Self::Skipped => "skipped",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A duration as reported upstream.
///
/// GitLab sends whole seconds, but anything else is kept as text so it can
/// still be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Elapsed {
    Seconds(i64),
    Text(String),
}

impl Elapsed {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|secs| secs as i64))
                .map(Self::Seconds),
            Value::String(s) => Some(
                s.trim()
                    .parse::<i64>()
                    .map_or_else(|_| Self::Text(s.clone()), Self::Seconds),
            ),
            other => Some(Self::Text(other.to_string())),
        }
    }
}

impl From<i64> for Elapsed {
    fn from(seconds: i64) -> Self {
        Self::Seconds(seconds)
    }
}

/// Timestamps and duration of a pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PipelineMetadata {
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub duration: Option<Elapsed>,
}

/// The pipeline being published.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineInfo {
    pub id: u64,
    pub name: String,
    pub status: PipelineStatus,
    #[serde(rename = "ref")]
    pub ref_: String,
    pub sha: String,
    pub web_url: String,
    pub metadata: PipelineMetadata,
}

impl PipelineInfo {
    /// Parses a `GET /projects/:id/pipelines/:pipeline_id` response.
    pub fn from_record(record: &Value) -> Self {
        Self {
            id: count_field(record, "id"),
            name: str_field(record, "name").unwrap_or_else(|| UNNAMED_PIPELINE.to_string()),
            status: status_field(record),
            ref_: str_field(record, "ref").unwrap_or_default(),
            sha: str_field(record, "sha").unwrap_or_default(),
            web_url: str_field(record, "web_url").unwrap_or_default(),
            metadata: PipelineMetadata {
                created_at: str_field(record, "created_at"),
                updated_at: str_field(record, "updated_at"),
                duration: field(record, "duration").and_then(Elapsed::from_value),
            },
        }
    }

    pub fn created_at(&self) -> Option<&str> {
        self.metadata.created_at.as_deref()
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.metadata.updated_at.as_deref()
    }

    pub fn duration(&self) -> Option<&Elapsed> {
        self.metadata.duration.as_ref()
    }
}

/// Aggregated test results of one pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TestSummary {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub skipped: u64,
    pub error: u64,
    /// Total test time in seconds; GitLab reports it with a fractional part.
    pub total_time: f64,
}

impl TestSummary {
    /// Parses a `GET /projects/:id/pipelines/:pipeline_id/test_report_summary` response.
    pub fn from_record(record: &Value) -> Self {
        let Some(totals) = field(record, "total") else {
            return Self::default();
        };

        Self {
            total: count_field(totals, "count"),
            success: count_field(totals, "success"),
            failed: count_field(totals, "failed"),
            skipped: count_field(totals, "skipped"),
            error: count_field(totals, "error"),
            total_time: field(totals, "time")
                .and_then(Value::as_f64)
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .unwrap_or(0.0),
        }
    }
}

/// Test counts attached to a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PipelineTestCounts {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl From<&TestSummary> for PipelineTestCounts {
    fn from(summary: &TestSummary) -> Self {
        Self {
            total: summary.total,
            success: summary.success,
            failed: summary.failed,
            skipped: summary.skipped,
        }
    }
}

/// One past pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineHistoryEntry {
    pub id: u64,
    pub status: PipelineStatus,
    #[serde(rename = "ref")]
    pub ref_: String,
    pub version: String,
    pub url: String,
    pub created_at: Option<String>,
    pub duration: Option<Elapsed>,
    pub web_url: Option<String>,
    pub test_counts: PipelineTestCounts,
}

impl PipelineHistoryEntry {
    /// Parses one element of a `GET /projects/:id/pipelines` response.
    pub fn from_record(record: &Value) -> Self {
        Self {
            id: count_field(record, "id"),
            status: status_field(record),
            ref_: str_field(record, "ref").unwrap_or_default(),
            version: NOT_AVAILABLE.to_string(),
            url: String::new(),
            created_at: str_field(record, "created_at"),
            duration: field(record, "duration").and_then(Elapsed::from_value),
            web_url: str_field(record, "web_url"),
            test_counts: PipelineTestCounts::default(),
        }
    }

    /// Returns a copy of this entry carrying the counts of `summary`.
    #[must_use]
    pub fn with_test_counts(&self, summary: &TestSummary) -> Self {
        Self {
            test_counts: PipelineTestCounts::from(summary),
            ..self.clone()
        }
    }

    /// Returns a copy of this entry carrying an application version and link.
    #[must_use]
    pub fn with_version_and_url(&self, version: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            url: url.into(),
            ..self.clone()
        }
    }
}

/// Parses a pipeline list response, most recent run first.
pub fn parse_history(records: &[Value]) -> Vec<PipelineHistoryEntry> {
    records.iter().map(PipelineHistoryEntry::from_record).collect()
}

fn field<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    record.get(key).filter(|value| !value.is_null())
}

fn str_field(record: &Value, key: &str) -> Option<String> {
    field(record, key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn count_field(record: &Value, key: &str) -> u64 {
    field(record, key)
        .and_then(|value| {
            value.as_u64().or_else(|| {
                value
                    .as_f64()
                    .filter(|n| n.is_finite() && *n >= 0.0)
                    .map(|n| n as u64)
            })
        })
        .unwrap_or(0)
}

fn status_field(record: &Value) -> PipelineStatus {
    str_field(record, "status")
        .map(|raw| PipelineStatus::parse(&raw))
        .unwrap_or_default()
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// File name of the per-run load generator report.
pub const SUMMARY_FILE_NAME: &str = "fortio.json";
/// Substring identifying metric tables.
const SERIES_MARKER: &str = "csv";
/// Substring identifying the request rate tables used by the dashboard.
const RATE_MARKER: &str = "rate";

/// The role of a stored object, inferred from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The load generator report, one per run.
    Summary,
    /// A per-node metric table.
    TimeSeries,
    /// Anything else found under a run prefix.
    Other,
}

impl ArtifactKind {
    /// Classify an object key or path by its final segment.
    pub fn classify(key: &str) -> Self {
        let file_name = file_name(key);
        if file_name.contains(SUMMARY_FILE_NAME) {
            ArtifactKind::Summary
        } else if file_name.contains(SERIES_MARKER) {
            ArtifactKind::TimeSeries
        } else {
            ArtifactKind::Other
        }
    }
}

/// Identifies one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// The bucket or container the object lives in
    pub namespace: String,
    /// The full object key
    pub key: String,
    /// The role of the object
    pub kind: ArtifactKind,
}

impl ArtifactRef {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            namespace: namespace.into(),
            kind: ArtifactKind::classify(&key),
            key,
        }
    }

    /// The last path segment of the key.
    pub fn file_name(&self) -> &str {
        file_name(&self.key)
    }

    /// Whether this object is one of the request rate tables.
    ///
    /// Matches on the whole key, so a `rate` anywhere in the run prefix selects every object
    /// below it. That is how the harness has always behaved and the dashboard relies on it.
    pub fn is_rate_metric(&self) -> bool {
        self.key.contains(RATE_MARKER)
    }

    /// Whether this object is a metric table of any kind.
    pub fn is_series(&self) -> bool {
        self.key.contains(SERIES_MARKER)
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.key)
    }
}

fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Identifies a run.
///
/// This is the run directory relative to the artifact root, which encodes the test name and the
/// run timestamp, for example `fishapp-load/2021-06-01T10:00:00`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build a run id from a directory relative to the artifact root.
    ///
    /// Path separators are normalised to `/` so ids match object key prefixes.
    pub fn from_relative_path(path: &Path) -> Self {
        let id = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Self(id)
    }

    /// Build the run prefix used in the store from a test name and a run timestamp.
    ///
    /// Trailing separators are stripped from both parts.
    pub fn from_test_and_timestamp(test_name: &str, run_ts: &str) -> Self {
        Self(format!(
            "{}/{}",
            test_name.trim_end_matches('/'),
            run_ts.trim_end_matches('/')
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Summary of a run as reported by the load generator.
///
/// Only [RunSummary::actual_qps] is required. The remaining fields are decoded when present so
/// they can be carried into reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The realised request rate over the run, in requests per second.
    #[serde(rename = "ActualQPS")]
    pub actual_qps: f64,
    /// The request rate the load generator was asked for.
    ///
    /// The load generator writes this as a string (`"1000"`, `"max"`) in some versions and as a
    /// number in others, so it is kept as raw JSON.
    #[serde(rename = "RequestedQPS", default, skip_serializing_if = "Option::is_none")]
    pub requested_qps: Option<serde_json::Value>,
    /// Free form labels attached to the run
    #[serde(rename = "Labels", default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,
    /// The time the run started, as written by the load generator
    #[serde(rename = "StartTime", default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// The measured run duration in nanoseconds
    #[serde(rename = "ActualDuration", default, skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<u64>,
    /// The number of load generating connections
    #[serde(rename = "NumThreads", default, skip_serializing_if = "Option::is_none")]
    pub num_threads: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid run summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> Result<RunSummary, SummaryError> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load a run summary from raw bytes
pub fn parse_run_summary(bytes: &[u8]) -> Result<RunSummary, SummaryError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Load a run summary from a file
pub fn load_run_summary_from_path(path: impl AsRef<Path>) -> Result<RunSummary, SummaryError> {
    let file = std::fs::File::open(path)?;
    load_run_summary(file)
}

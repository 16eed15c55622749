use mesh_load_artifact_model::{RunId, RunSummary};
use serde::{Deserialize, Serialize};

/// The achieved load of one run joined with the peak of its node metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunLoadMemoryPair {
    pub run_id: RunId,
    pub achieved_load: f64,
    pub peak_metric: f64,
    /// The decoded run summary, for reporting
    pub summary: RunSummary,
}

/// A run that could not be compared, and why.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedRun {
    pub run_id: RunId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Compared(RunLoadMemoryPair),
    Skipped(SkippedRun),
}

impl RunOutcome {
    pub fn skipped(run_id: RunId, reason: impl Into<String>) -> Self {
        RunOutcome::Skipped(SkippedRun {
            run_id,
            reason: reason.into(),
        })
    }

    pub fn run_id(&self) -> &RunId {
        match self {
            RunOutcome::Compared(pair) => &pair.run_id,
            RunOutcome::Skipped(skipped) => &skipped.run_id,
        }
    }
}

/// Result of comparing load against node metric across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComparisonReport {
    /// Node whose metric was compared
    pub node: String,
    /// Compared runs, ascending by achieved load
    pub pairs: Vec<RunLoadMemoryPair>,
    /// Runs left out of the comparison, in discovery order
    pub skipped: Vec<SkippedRun>,
}

impl ComparisonReport {
    pub fn total_runs(&self) -> usize {
        self.pairs.len() + self.skipped.len()
    }

    /// `(achieved_load, peak_metric)` for each compared run, in order.
    pub fn load_and_peak(&self) -> Vec<(f64, f64)> {
        self.pairs
            .iter()
            .map(|pair| (pair.achieved_load, pair.peak_metric))
            .collect()
    }
}

/// One row of the long-form metric table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricPoint {
    pub kubernetes_pod_name: String,
    pub timestamp: String,
    pub metric_name: String,
    pub metric_value: f64,
    pub normalized_ts: f64,
}

/// A metric table that was left out of the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedFrame {
    pub origin: String,
    pub reason: String,
}

/// What went into a dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardSummary {
    pub run_id: Option<RunId>,
    /// Metric tables found under the run
    pub series_files: Vec<String>,
    /// Tables that contributed rows
    pub frames_used: usize,
    /// Tables that were empty
    pub frames_empty: usize,
    pub frames_skipped: Vec<SkippedFrame>,
    /// Tables the placeholder column was removed from
    pub placeholder_removals: usize,
    pub rows: usize,
}

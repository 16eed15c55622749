use crate::aggregator::{compare_runs, union_metric_frames};
use crate::fetch::{mirror_namespace, query_run_artifacts, MirrorStats};
use crate::model::{ComparisonReport, DashboardSummary, SkippedFrame};
use crate::schema::load_metric_frame;
use crate::store::ArtifactStore;
use anyhow::Context;
use mesh_load_artifact_model::RunId;
use std::path::Path;

pub mod aggregator;
pub mod discover;
pub mod fetch;
pub mod frame;
pub mod model;
pub mod render;
pub mod report;
pub mod schema;
pub mod series;
pub mod store;
pub mod summary;

/// Mirror a bucket, or the part of it under `prefix`, into `dest`.
pub async fn execute_mirror<S: ArtifactStore>(
    store: &S,
    bucket: &str,
    prefix: &str,
    dest: &Path,
) -> anyhow::Result<MirrorStats> {
    mirror_namespace(store, bucket, prefix, dest)
        .await
        .with_context(|| format!("Failed to mirror {bucket} into {}", dest.display()))
}

/// Compare the achieved load of every run under `data_dir` with the peak of `node` in each
/// run's `series_file`.
///
/// Fails if no run could be compared. Runs that were skipped are listed in the report.
pub fn build_comparison(
    data_dir: &Path,
    series_file: &str,
    node: &str,
) -> anyhow::Result<ComparisonReport> {
    let runs = discover::discover_runs(data_dir, series_file)
        .with_context(|| format!("Failed to read runs from {}", data_dir.display()))?;

    let report = compare_runs(&runs, node);
    if report.pairs.is_empty() {
        anyhow::bail!(
            "None of the {} runs under {} could be compared",
            report.total_runs(),
            data_dir.display()
        );
    }

    Ok(report)
}

/// Build the comparison for the runs under `data_dir` and chart it to `output`.
pub fn execute_comparison(
    data_dir: &Path,
    series_file: &str,
    node: &str,
    output: &Path,
) -> anyhow::Result<ComparisonReport> {
    let report = build_comparison(data_dir, series_file, node)?;

    render::render_load_comparison(&report.load_and_peak(), node, output)
        .context("Load comparison chart")?;

    Ok(report)
}

/// Mirror the bucket into `data_dir`, then compare its runs and chart them to `output`.
///
/// A failed mirror is fatal and no chart is written.
pub async fn execute_sync_and_comparison<S: ArtifactStore>(
    store: &S,
    bucket: &str,
    data_dir: &Path,
    series_file: &str,
    node: &str,
    output: &Path,
) -> anyhow::Result<ComparisonReport> {
    execute_mirror(store, bucket, "", data_dir).await?;
    execute_comparison(data_dir, series_file, node, output)
}

/// Build the request rate dashboard for one run and write it to `output`.
///
/// A listing that fails or finds nothing is fatal and nothing is written. Metric tables that do
/// not match the expected schema are skipped, but at least one must contribute rows.
pub async fn execute_dashboard<S: ArtifactStore>(
    store: &S,
    bucket: &str,
    run_id: &RunId,
    output: &Path,
) -> anyhow::Result<DashboardSummary> {
    let artifacts = query_run_artifacts(store, bucket, run_id)
        .await
        .with_context(|| format!("Failed to query artifacts of run {run_id}"))?;

    let mut summary = DashboardSummary {
        run_id: Some(run_id.clone()),
        series_files: artifacts.series_file_names.clone(),
        ..Default::default()
    };

    let mut frames = Vec::new();
    for (artifact, content) in &artifacts.rate_tables {
        match load_metric_frame(content, &artifact.key) {
            Ok(Some(metric)) => {
                log::debug!(
                    "Loaded {} rows of {} from {}",
                    metric.frame.height(),
                    metric.metric_name,
                    artifact.key
                );
                if metric.placeholder_removed {
                    summary.placeholder_removals += 1;
                }
                summary.frames_used += 1;
                frames.push(metric.frame);
            }
            Ok(None) => summary.frames_empty += 1,
            Err(e) => {
                log::warn!("Skipping metric table {}: {e}", artifact.key);
                summary.frames_skipped.push(SkippedFrame {
                    origin: artifact.key.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if frames.is_empty() {
        anyhow::bail!(
            "No usable request rate tables under {run_id} ({} found)",
            artifacts.rate_tables.len()
        );
    }

    let table = union_metric_frames(frames).context("Failed to combine metric tables")?;
    summary.rows = table.height();

    render::write_dashboard(&table, output).context("Request rate dashboard")?;

    Ok(summary)
}

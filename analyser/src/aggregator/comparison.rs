use crate::discover::DiscoveredRun;
use crate::model::{ComparisonReport, RunLoadMemoryPair, RunOutcome};
use crate::series::peak_node_metric;
use crate::summary::achieved_load;
use anyhow::Context;
use std::path::Path;

/// Joins the achieved load of each run with the peak of a node metric from the same run.
///
/// Runs are joined by their [RunId](mesh_load_artifact_model::RunId), never by position, so a run
/// that cannot be used drops out on its own without shifting the pairing of the others.
pub struct LoadComparisonAggregator<'a> {
    runs: &'a [DiscoveredRun],
    node: &'a str,
}

impl<'a> LoadComparisonAggregator<'a> {
    pub fn new(runs: &'a [DiscoveredRun], node: &'a str) -> Self {
        Self { runs, node }
    }
}

impl LoadComparisonAggregator<'_> {
    /// Compare every run, skipping those that cannot be compared.
    ///
    /// Compared pairs are ordered by achieved load. Skipped runs are logged and listed in the
    /// report in discovery order.
    pub fn aggregate(&self) -> ComparisonReport {
        let mut report = ComparisonReport {
            node: self.node.to_string(),
            ..Default::default()
        };

        for run in self.runs {
            match self.outcome_for_run(run) {
                RunOutcome::Compared(pair) => {
                    log::debug!(
                        "Run {} achieved {} QPS with {} peak {}",
                        pair.run_id,
                        pair.achieved_load,
                        self.node,
                        pair.peak_metric
                    );
                    report.pairs.push(pair);
                }
                RunOutcome::Skipped(skipped) => {
                    log::warn!("Skipping run {}: {}", skipped.run_id, skipped.reason);
                    report.skipped.push(skipped);
                }
            }
        }

        sort_pairs_by_load(&mut report.pairs);

        log::info!(
            "Compared {} of {} runs",
            report.pairs.len(),
            report.total_runs()
        );

        report
    }

    /// Work out the outcome for a single run.
    pub fn outcome_for_run(&self, run: &DiscoveredRun) -> RunOutcome {
        let summary_path = match run.summary_paths.as_slice() {
            [] => return RunOutcome::skipped(run.run_id.clone(), "No run summary found"),
            [path] => path,
            paths => {
                return RunOutcome::skipped(
                    run.run_id.clone(),
                    format!("Found {} run summaries, expected one", paths.len()),
                )
            }
        };
        let series_path = match run.series_paths.as_slice() {
            [] => return RunOutcome::skipped(run.run_id.clone(), "No metric table found"),
            [path] => path,
            paths => {
                return RunOutcome::skipped(
                    run.run_id.clone(),
                    format!("Found {} metric tables, expected one", paths.len()),
                )
            }
        };

        match self.pair_for_run(run, summary_path, series_path) {
            Ok(pair) => RunOutcome::Compared(pair),
            Err(e) => RunOutcome::skipped(run.run_id.clone(), format!("{e:#}")),
        }
    }

    fn pair_for_run(
        &self,
        run: &DiscoveredRun,
        summary_path: &Path,
        series_path: &Path,
    ) -> anyhow::Result<RunLoadMemoryPair> {
        let summary_bytes = std::fs::read(summary_path)
            .with_context(|| format!("Failed to read {}", summary_path.display()))?;
        let (achieved_load, summary) = achieved_load(&summary_bytes)
            .with_context(|| format!("Failed to parse {}", summary_path.display()))?;

        let series_bytes = std::fs::read(series_path)
            .with_context(|| format!("Failed to read {}", series_path.display()))?;
        let peak_metric = peak_node_metric(&series_bytes, self.node)
            .with_context(|| format!("Failed to find peak in {}", series_path.display()))?;

        Ok(RunLoadMemoryPair {
            run_id: run.run_id.clone(),
            achieved_load,
            peak_metric,
            summary,
        })
    }
}

/// Compare the achieved load and peak node metric of every run.
pub fn compare_runs(runs: &[DiscoveredRun], node: &str) -> ComparisonReport {
    LoadComparisonAggregator::new(runs, node).aggregate()
}

/// Order pairs by achieved load, ascending.
///
/// The sort is stable, so runs with the same load keep their discovery order.
pub fn sort_pairs_by_load(pairs: &mut [RunLoadMemoryPair]) {
    pairs.sort_by(|a, b| a.achieved_load.total_cmp(&b.achieved_load));
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_load_artifact_model::{parse_run_summary, RunId};
    use std::fs;

    const SERIES: &str = "envoy_memory_MB_by_replica_set.csv";

    fn write_run(
        root: &Path,
        name: &str,
        summary: Option<&str>,
        series: Option<&str>,
    ) -> anyhow::Result<DiscoveredRun> {
        let dir = root.join(name);
        fs::create_dir_all(&dir)?;
        let mut run = DiscoveredRun {
            run_id: RunId::new(name),
            summary_paths: vec![],
            series_paths: vec![],
        };
        if let Some(summary) = summary {
            let path = dir.join("fortio.json");
            fs::write(&path, summary)?;
            run.summary_paths.push(path);
        }
        if let Some(series) = series {
            let path = dir.join(SERIES);
            fs::write(&path, series)?;
            run.series_paths.push(path);
        }
        Ok(run)
    }

    fn pair(run_id: &str, load: f64, peak: f64) -> anyhow::Result<RunLoadMemoryPair> {
        Ok(RunLoadMemoryPair {
            run_id: RunId::new(run_id),
            achieved_load: load,
            peak_metric: peak,
            summary: parse_run_summary(format!(r#"{{"ActualQPS": {load}}}"#).as_bytes())?,
        })
    }

    #[test]
    fn pairs_are_sorted_by_load_and_keep_their_peak() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let runs = vec![
            write_run(
                dir.path(),
                "high",
                Some(r#"{"ActualQPS": 250.0}"#),
                Some("pod-node-0,t0,768.9\n"),
            )?,
            write_run(
                dir.path(),
                "low",
                Some(r#"{"ActualQPS": 100.0}"#),
                Some("pod-node-0,t0,512.3\n"),
            )?,
        ];

        let report = compare_runs(&runs, "node-0");

        assert_eq!(report.load_and_peak(), vec![(100.0, 512.3), (250.0, 768.9)]);
        assert_eq!(report.pairs[0].run_id, RunId::new("low"));
        assert!(report.skipped.is_empty());

        Ok(())
    }

    #[test]
    fn unusable_runs_are_skipped_without_shifting_others() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let runs = vec![
            write_run(dir.path(), "no-series", Some(r#"{"ActualQPS": 50.0}"#), None)?,
            write_run(dir.path(), "no-summary", None, Some("pod-node-0,t0,1.0\n"))?,
            write_run(
                dir.path(),
                "bad-summary",
                Some(r#"{"Requested": 1}"#),
                Some("pod-node-0,t0,2.0\n"),
            )?,
            write_run(
                dir.path(),
                "other-node",
                Some(r#"{"ActualQPS": 75.0}"#),
                Some("pod-node-1,t0,3.0\n"),
            )?,
            write_run(
                dir.path(),
                "good",
                Some(r#"{"ActualQPS": 100.0}"#),
                Some("pod-node-0,t0,512.3\n"),
            )?,
        ];

        let report = compare_runs(&runs, "node-0");

        assert_eq!(report.load_and_peak(), vec![(100.0, 512.3)]);
        assert_eq!(
            report
                .skipped
                .iter()
                .map(|s| s.run_id.as_str())
                .collect::<Vec<_>>(),
            vec!["no-series", "no-summary", "bad-summary", "other-node"]
        );
        assert!(report.skipped[3].reason.contains("No rows found"));

        Ok(())
    }

    #[test]
    fn more_than_one_summary_is_skipped() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut run = write_run(
            dir.path(),
            "twice",
            Some(r#"{"ActualQPS": 100.0}"#),
            Some("pod-node-0,t0,1.0\n"),
        )?;
        let extra = dir.path().join("twice").join("retry-fortio.json");
        fs::write(&extra, r#"{"ActualQPS": 90.0}"#)?;
        run.summary_paths.push(extra);

        let outcome = LoadComparisonAggregator::new(&[], "node-0").outcome_for_run(&run);

        match outcome {
            RunOutcome::Skipped(skipped) => assert!(skipped.reason.contains("2 run summaries")),
            other => panic!("Expected run to be skipped, got {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn equal_loads_keep_discovery_order() -> anyhow::Result<()> {
        let mut pairs = vec![
            pair("b", 200.0, 2.0)?,
            pair("first", 100.0, 10.0)?,
            pair("second", 100.0, 20.0)?,
        ];

        sort_pairs_by_load(&mut pairs);

        assert_eq!(
            pairs
                .iter()
                .map(|p| (p.run_id.as_str(), p.peak_metric))
                .collect::<Vec<_>>(),
            vec![("first", 10.0), ("second", 20.0), ("b", 2.0)]
        );

        Ok(())
    }
}

use itertools::Itertools;
use mesh_load_artifact_model::{RunId, SUMMARY_FILE_NAME};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The files of one run in a mirrored artifact tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredRun {
    pub run_id: RunId,
    /// Every summary file in the run directory. A usable run has exactly one.
    pub summary_paths: Vec<PathBuf>,
    /// Every copy of the per-node metric table in the run directory
    pub series_paths: Vec<PathBuf>,
}

fn is_summary_file(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().contains(SUMMARY_FILE_NAME))
}

/// Find every run under `root` that has a summary file or the named series file.
///
/// Files are matched when their name contains the summary or series file name, so renamed copies
/// such as `run-2-fortio.json` are picked up too. A run is a directory, identified by its path
/// relative to `root`. Runs are returned ordered by run id so that discovery order does not depend
/// on the file system.
pub fn discover_runs(root: &Path, series_file_name: &str) -> anyhow::Result<Vec<DiscoveredRun>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name.contains(SUMMARY_FILE_NAME) || name.contains(series_file_name) {
            files.push(entry.into_path());
        }
    }

    let runs = files
        .into_iter()
        .into_group_map_by(|path| {
            let dir = path.parent().unwrap_or(root);
            RunId::from_relative_path(dir.strip_prefix(root).unwrap_or(dir))
        })
        .into_iter()
        .map(|(run_id, mut paths)| {
            paths.sort();
            let (summary_paths, series_paths): (Vec<_>, Vec<_>) = paths
                .into_iter()
                .partition(|p| is_summary_file(p));

            DiscoveredRun {
                run_id,
                summary_paths,
                series_paths,
            }
        })
        .sorted_by(|a, b| a.run_id.cmp(&b.run_id))
        .collect::<Vec<_>>();

    log::info!("Discovered {} runs under {}", runs.len(), root.display());

    Ok(runs)
}

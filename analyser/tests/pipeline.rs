use anyhow::Context;
use mesh_load_analyser::store::{DirectoryStore, MemoryStore, BAD_LOCATION_MESSAGE};
use mesh_load_analyser::{
    build_comparison, execute_comparison, execute_dashboard, execute_mirror,
    execute_sync_and_comparison,
};
use mesh_load_artifact_model::RunId;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SERIES_FILE: &str = "envoy_memory_MB_by_replica_set.csv";

fn runs_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join("runs")
}

/// Load every fixture file into an in-memory bucket, keyed by its path under the runs directory.
fn fixture_store() -> anyhow::Result<MemoryStore> {
    let root = runs_dir();
    let mut store = MemoryStore::new();
    for entry in WalkDir::new(&root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let key = entry
            .path()
            .strip_prefix(&root)?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let content = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read fixture {}", entry.path().display()))?;
        store = store.with_object(key, content);
    }
    Ok(store)
}

#[test]
fn compare_pairs_load_with_peak_memory() -> anyhow::Result<()> {
    env_logger::try_init().ok();

    let report = build_comparison(&runs_dir(), SERIES_FILE, "node-0")?;

    pretty_assertions::assert_eq!(report.load_and_peak(), vec![(100.0, 512.3), (250.0, 768.9)]);
    assert_eq!(
        report.pairs[0].run_id,
        RunId::new("fishapp-load/2021-06-01T10.00")
    );
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(
        report.skipped[0].run_id,
        RunId::new("fishapp-load/2021-06-03T10.00")
    );

    Ok(())
}

#[test]
fn compare_fails_when_no_run_has_the_node() {
    env_logger::try_init().ok();

    let result = build_comparison(&runs_dir(), SERIES_FILE, "node-9");
    assert!(result.is_err());
}

#[test]
fn compare_writes_the_chart() -> anyhow::Result<()> {
    env_logger::try_init().ok();

    let dir = tempfile::tempdir()?;
    let output = dir.path().join("load_vs_memory.png");

    let report = execute_comparison(&runs_dir(), SERIES_FILE, "node-0", &output)?;

    pretty_assertions::assert_eq!(report.load_and_peak(), vec![(100.0, 512.3), (250.0, 768.9)]);
    assert!(output.is_file());
    assert!(std::fs::metadata(&output)?.len() > 0);

    Ok(())
}

#[tokio::test]
async fn sync_and_compare_writes_the_chart() -> anyhow::Result<()> {
    env_logger::try_init().ok();

    let store = fixture_store()?;
    let data_dir = tempfile::tempdir()?;
    let out_dir = tempfile::tempdir()?;
    let output = out_dir.path().join("load_vs_memory.png");

    let report = execute_sync_and_comparison(
        &store,
        "load-results",
        data_dir.path(),
        SERIES_FILE,
        "node-0",
        &output,
    )
    .await?;

    assert_eq!(report.pairs.len(), 2);
    assert!(output.is_file());

    Ok(())
}

#[tokio::test]
async fn forbidden_listing_writes_no_chart() -> anyhow::Result<()> {
    env_logger::try_init().ok();

    let store = fixture_store()?.with_list_status(403);
    let data_dir = tempfile::tempdir()?;
    let out_dir = tempfile::tempdir()?;
    let output = out_dir.path().join("load_vs_memory.png");

    let err = execute_sync_and_comparison(
        &store,
        "load-results",
        data_dir.path(),
        SERIES_FILE,
        "node-0",
        &output,
    )
    .await
    .expect_err("Listing should fail");

    assert!(format!("{err:#}").contains(BAD_LOCATION_MESSAGE));
    assert!(!output.exists());
    assert_eq!(std::fs::read_dir(data_dir.path())?.count(), 0);
    assert_eq!(store.list_calls(), 1);
    assert_eq!(store.get_calls(), 0);

    Ok(())
}

#[tokio::test]
async fn mirrored_bucket_compares_like_the_source() -> anyhow::Result<()> {
    env_logger::try_init().ok();

    let store = fixture_store()?;
    let dir = tempfile::tempdir()?;

    let stats = execute_mirror(&store, "load-results", "", dir.path()).await?;
    assert_eq!(stats.objects, 9);

    let report = build_comparison(dir.path(), SERIES_FILE, "node-0")?;
    pretty_assertions::assert_eq!(report.load_and_peak(), vec![(100.0, 512.3), (250.0, 768.9)]);

    Ok(())
}

#[tokio::test]
async fn dashboard_from_mirrored_directory() -> anyhow::Result<()> {
    env_logger::try_init().ok();

    let store = DirectoryStore::new(runs_dir());
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("viz.html");
    let run_id = RunId::from_test_and_timestamp("fishapp-load/", "2021-06-01T10.00/");

    let summary = execute_dashboard(&store, "local", &run_id, &output).await?;

    assert_eq!(summary.series_files.len(), 5);
    assert_eq!(summary.frames_used, 3);
    assert_eq!(summary.frames_empty, 1);
    assert!(summary.frames_skipped.is_empty());
    assert_eq!(summary.placeholder_removals, 1);
    // 3 ingress rows, 2 of the 2xx rows have a value, 2 5xx rows
    assert_eq!(summary.rows, 7);

    let html = std::fs::read_to_string(&output)?;
    assert!(html.contains("envoy_ingress_rate_by_replica_set"));
    assert!(!html.contains("rollup_column"));

    Ok(())
}

#[tokio::test]
async fn forbidden_listing_writes_no_dashboard() -> anyhow::Result<()> {
    env_logger::try_init().ok();

    let store = fixture_store()?.with_list_status(403);
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("viz.html");
    let run_id = RunId::from_test_and_timestamp("fishapp-load", "2021-06-01T10.00");

    let err = execute_dashboard(&store, "load-results", &run_id, &output)
        .await
        .expect_err("Listing should fail");

    assert!(format!("{err:#}").contains(BAD_LOCATION_MESSAGE));
    assert!(!output.exists());
    assert_eq!(store.list_calls(), 1);
    assert_eq!(store.get_calls(), 0);

    Ok(())
}

#[tokio::test]
async fn unknown_run_writes_no_dashboard() -> anyhow::Result<()> {
    env_logger::try_init().ok();

    let store = DirectoryStore::new(runs_dir());
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("viz.html");
    let run_id = RunId::from_test_and_timestamp("fishapp-load", "1999-01-01T00.00");

    let result = execute_dashboard(&store, "local", &run_id, &output).await;

    assert!(result.is_err());
    assert!(!output.exists());

    Ok(())
}

#[tokio::test]
async fn run_without_rate_tables_is_an_error() -> anyhow::Result<()> {
    env_logger::try_init().ok();

    let store = DirectoryStore::new(runs_dir());
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("viz.html");
    let run_id = RunId::from_test_and_timestamp("fishapp-load", "2021-06-02T10.00");

    let result = execute_dashboard(&store, "local", &run_id, &output).await;

    assert!(result.is_err());
    assert!(!output.exists());

    Ok(())
}

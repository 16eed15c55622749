use crate::store::{key_to_relative_path, ArtifactStore, FetchError};
use bytes::Bytes;
use mesh_load_artifact_model::{ArtifactRef, RunId};
use std::path::Path;

/// Maximum number of keys requested when querying a single run.
pub const QUERY_PAGE_SIZE: i32 = 100;
/// Page size used while mirroring a whole namespace.
const MIRROR_PAGE_SIZE: i32 = 1000;

/// The artifacts of one run that the dashboard needs.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub run_id: RunId,
    /// File names of every metric table found under the run prefix
    pub series_file_names: Vec<String>,
    /// The request rate tables, fetched, in listing order
    pub rate_tables: Vec<(ArtifactRef, Bytes)>,
}

/// Query the store for the artifacts of a single run.
///
/// Lists one page of at most [QUERY_PAGE_SIZE] keys under the run prefix and fetches the request
/// rate tables among them. A listing that fails or comes back empty means the bucket or run was
/// given incorrectly, which is reported as a [FetchError] that callers should treat as fatal.
pub async fn query_run_artifacts<S: ArtifactStore>(
    store: &S,
    bucket: &str,
    run_id: &RunId,
) -> Result<RunArtifacts, FetchError> {
    let prefix = run_id.as_str();
    let page = store
        .list_page(bucket, prefix, QUERY_PAGE_SIZE, None)
        .await?;

    if page.artifacts.is_empty() {
        return Err(FetchError::EmptyListing {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        });
    }
    if page.continuation.is_some() {
        log::warn!(
            "More than {QUERY_PAGE_SIZE} objects under {bucket}/{prefix}, only the first page is used"
        );
    }

    let mut series_file_names = Vec::new();
    let mut rate_tables = Vec::new();
    for artifact in page.artifacts {
        if artifact.is_series() {
            series_file_names.push(artifact.file_name().to_string());
        }
        if artifact.is_rate_metric() {
            let content = store.get(bucket, &artifact.key).await?;
            log::debug!("Fetched {artifact} ({} bytes)", content.len());
            rate_tables.push((artifact, content));
        }
    }

    log::info!(
        "Found {} metric tables under {bucket}/{prefix}, {} of them request rates",
        series_file_names.len(),
        rate_tables.len()
    );

    Ok(RunArtifacts {
        run_id: run_id.clone(),
        series_file_names,
        rate_tables,
    })
}

/// Outcome of mirroring a namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorStats {
    pub objects: usize,
    pub bytes: usize,
}

/// Mirror every object under `prefix` into `dest`, one file per object key.
///
/// Existing files are overwritten. Local files without a remote counterpart are left alone; this
/// is a plain copy, not a reconciliation.
pub async fn mirror_namespace<S: ArtifactStore>(
    store: &S,
    bucket: &str,
    prefix: &str,
    dest: &Path,
) -> Result<MirrorStats, FetchError> {
    let mut stats = MirrorStats::default();
    let mut continuation = None;

    loop {
        let page = store
            .list_page(bucket, prefix, MIRROR_PAGE_SIZE, continuation)
            .await?;

        if stats.objects == 0 && page.artifacts.is_empty() {
            return Err(FetchError::EmptyListing {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
            });
        }

        for artifact in &page.artifacts {
            let path = dest.join(key_to_relative_path(&artifact.key)?);
            let content = store.get(bucket, &artifact.key).await?;

            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &content).await?;
            log::debug!("Mirrored {artifact} to {}", path.display());

            stats.objects += 1;
            stats.bytes += content.len();
        }

        continuation = page.continuation;
        if continuation.is_none() {
            break;
        }
    }

    log::info!(
        "Mirrored {} objects ({} bytes) from {bucket}/{prefix} into {}",
        stats.objects,
        stats.bytes,
        dest.display()
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_object("load/run-1/fortio.json", r#"{"ActualQPS": 100.0}"#)
            .with_object("load/run-1/envoy_memory_MB_by_replica_set.csv", "a,b,c\n")
            .with_object(
                "load/run-1/envoy_ingress_rate_by_replica_set.csv",
                "metric.kubernetes_pod_name,timestamp,envoy_ingress_rate_by_replica_set,normalized_ts\n",
            )
            .with_object("load/run-2/fortio.json", r#"{"ActualQPS": 250.0}"#)
    }

    #[tokio::test]
    async fn query_fetches_only_rate_tables() -> anyhow::Result<()> {
        let store = store();
        let artifacts =
            query_run_artifacts(&store, "bucket", &RunId::new("load/run-1")).await?;

        assert_eq!(
            artifacts.series_file_names,
            vec![
                "envoy_ingress_rate_by_replica_set.csv",
                "envoy_memory_MB_by_replica_set.csv"
            ]
        );
        assert_eq!(artifacts.rate_tables.len(), 1);
        assert_eq!(
            artifacts.rate_tables[0].0.file_name(),
            "envoy_ingress_rate_by_replica_set.csv"
        );
        assert_eq!(store.list_calls(), 1);
        assert_eq!(store.get_calls(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn forbidden_listing_is_fatal_and_not_retried() {
        let store = store().with_list_status(403);
        let result = query_run_artifacts(&store, "bucket", &RunId::new("load/run-1")).await;

        match result {
            Err(e @ FetchError::ListStatus { status: 403, .. }) => assert!(e.is_bad_location()),
            other => panic!("Expected a listing status error, got {other:?}"),
        }
        assert_eq!(store.list_calls(), 1);
        assert_eq!(store.get_calls(), 0);
    }

    #[tokio::test]
    async fn empty_listing_is_fatal() {
        let result = query_run_artifacts(&store(), "bucket", &RunId::new("load/run-9")).await;
        assert!(matches!(result, Err(FetchError::EmptyListing { .. })));
    }

    #[tokio::test]
    async fn mirror_writes_every_object() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir_all(dir.path().join("load").join("run-2"))?;
        std::fs::write(
            dir.path().join("load").join("run-2").join("fortio.json"),
            "stale",
        )?;

        let stats = mirror_namespace(&store(), "bucket", "", dir.path()).await?;
        assert_eq!(stats.objects, 4);

        let overwritten =
            std::fs::read_to_string(dir.path().join("load").join("run-2").join("fortio.json"))?;
        assert_eq!(overwritten, r#"{"ActualQPS": 250.0}"#);
        assert!(dir
            .path()
            .join("load")
            .join("run-1")
            .join("envoy_memory_MB_by_replica_set.csv")
            .is_file());

        Ok(())
    }

    #[tokio::test]
    async fn mirror_of_empty_namespace_is_fatal() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let result = mirror_namespace(&MemoryStore::new(), "bucket", "", dir.path()).await;
        assert!(matches!(result, Err(FetchError::EmptyListing { .. })));
        Ok(())
    }
}

use super::{key_to_relative_path, ArtifactStore, FetchError, ListPage};
use bytes::Bytes;
use mesh_load_artifact_model::ArtifactRef;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// An [ArtifactStore] serving a local directory tree, such as a previous mirror of a bucket.
///
/// The directory stands in for the bucket, so the bucket name is only used to label results.
/// Object keys are the `/` separated paths of files relative to the root and are listed in
/// lexicographic order, like S3 does.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn keys(&self) -> Result<Vec<String>, walkdir::Error> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            // Entries from walkdir always live below the root
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            keys.push(key);
        }
        keys.sort();

        Ok(keys)
    }
}

impl ArtifactStore for DirectoryStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        page_size: i32,
        continuation: Option<String>,
    ) -> Result<ListPage, FetchError> {
        log::debug!(
            "Listing {prefix} under {} as bucket {bucket}",
            self.root.display()
        );

        let keys = self.keys().map_err(|e| FetchError::List {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            message: e.to_string(),
        })?;

        let page_size = usize::try_from(page_size.max(1)).unwrap_or(1);
        let mut matching = keys
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| continuation.as_deref().map_or(true, |after| key.as_str() > after))
            .peekable();

        let mut artifacts = Vec::with_capacity(page_size);
        while artifacts.len() < page_size {
            match matching.next() {
                Some(key) => artifacts.push(ArtifactRef::new(bucket, key)),
                None => break,
            }
        }

        let continuation = match matching.peek() {
            Some(_) => artifacts.last().map(|a: &ArtifactRef| a.key.clone()),
            None => None,
        };

        Ok(ListPage {
            artifacts,
            continuation,
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, FetchError> {
        let path = self.root.join(key_to_relative_path(key)?);
        log::debug!("Reading {}", path.display());

        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

use super::{ArtifactStore, FetchError, ListPage};
use bytes::Bytes;
use mesh_load_artifact_model::ArtifactRef;
use std::cell::Cell;
use std::collections::BTreeMap;

/// An in-memory [ArtifactStore] for tests.
///
/// Listings can be made to fail with an HTTP status to simulate bad credentials or a wrong
/// bucket. Calls are counted so tests can check that nothing was retried.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: BTreeMap<String, Bytes>,
    list_status: Option<u16>,
    list_calls: Cell<usize>,
    get_calls: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, key: impl Into<String>, content: impl Into<Bytes>) -> Self {
        self.objects.insert(key.into(), content.into());
        self
    }

    /// Make every listing fail with the given HTTP status.
    pub fn with_list_status(mut self, status: u16) -> Self {
        self.list_status = Some(status);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.get()
    }
}

impl ArtifactStore for MemoryStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        page_size: i32,
        continuation: Option<String>,
    ) -> Result<ListPage, FetchError> {
        self.list_calls.set(self.list_calls.get() + 1);

        if let Some(status) = self.list_status {
            return Err(FetchError::ListStatus {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                status,
            });
        }

        let page_size = usize::try_from(page_size.max(1)).unwrap_or(1);
        let mut matching = self
            .objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| continuation.as_deref().map_or(true, |after| key.as_str() > after));

        let artifacts = matching
            .by_ref()
            .take(page_size)
            .map(|key| ArtifactRef::new(bucket, key.as_str()))
            .collect::<Vec<_>>();

        let continuation = match matching.next() {
            Some(_) => artifacts.last().map(|a| a.key.clone()),
            None => None,
        };

        Ok(ListPage {
            artifacts,
            continuation,
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, FetchError> {
        self.get_calls.set(self.get_calls.get() + 1);

        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}

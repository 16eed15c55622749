use bytes::Bytes;
use mesh_load_artifact_model::ArtifactRef;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

mod local;
#[cfg(any(test, feature = "test_utils"))]
mod memory;
mod s3;

pub use local::DirectoryStore;
#[cfg(any(test, feature = "test_utils"))]
pub use memory::MemoryStore;
pub use s3::{S3Store, S3StoreConfig};

/// Message shown for any listing that cannot be used, matching what operators already know.
pub const BAD_LOCATION_MESSAGE: &str = "Bucket or folder path incorrect. Please check inputs";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Bucket or folder path incorrect. Please check inputs (listing {bucket}/{prefix} returned HTTP status {status})")]
    ListStatus {
        bucket: String,
        prefix: String,
        status: u16,
    },
    #[error("Bucket or folder path incorrect. Please check inputs (no objects under {bucket}/{prefix})")]
    EmptyListing { bucket: String, prefix: String },
    #[error("Failed to list {bucket}/{prefix}: {message}")]
    List {
        bucket: String,
        prefix: String,
        message: String,
    },
    #[error("Failed to get {bucket}/{key}: {message}")]
    Get {
        bucket: String,
        key: String,
        message: String,
    },
    #[error("Object {bucket}/{key} does not exist")]
    NotFound { bucket: String, key: String },
    #[error("Refusing unsafe object key: {key:?}")]
    UnsafeKey { key: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Whether this error means the requested location is wrong rather than that a transfer
    /// failed part way.
    pub fn is_bad_location(&self) -> bool {
        matches!(
            self,
            FetchError::ListStatus { .. } | FetchError::EmptyListing { .. }
        )
    }
}

/// One page of an object listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// The objects on this page, in key order
    pub artifacts: Vec<ArtifactRef>,
    /// Token to pass back to fetch the next page, if the listing was truncated
    pub continuation: Option<String>,
}

/// A remote or local namespace of artifacts that can be listed and read.
///
/// Every call is attempted exactly once. Implementations must not retry.
#[allow(async_fn_in_trait)]
pub trait ArtifactStore {
    /// List at most `page_size` objects under `prefix`, starting after `continuation`.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        page_size: i32,
        continuation: Option<String>,
    ) -> Result<ListPage, FetchError>;

    /// Read a whole object.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, FetchError>;
}

/// Turn an object key into a relative path that cannot escape the directory it is joined to.
pub(crate) fn key_to_relative_path(key: &str) -> Result<PathBuf, FetchError> {
    let unsafe_key = || FetchError::UnsafeKey {
        key: key.to_string(),
    };

    let mut path = PathBuf::new();
    for segment in key.split('/').filter(|s| !s.is_empty()) {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => path.push(part),
            _ => return Err(unsafe_key()),
        }
    }

    if path.as_os_str().is_empty() {
        return Err(unsafe_key());
    }

    Ok(path)
}

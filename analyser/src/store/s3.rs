use super::{ArtifactStore, FetchError, ListPage};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use bytes::Bytes;
use mesh_load_artifact_model::ArtifactRef;

/// Connection settings for [S3Store].
#[derive(Debug, Clone)]
pub struct S3StoreConfig {
    /// The AWS region the bucket lives in
    pub region: String,
    /// Custom endpoint, for S3 compatible stores such as MinIO or LocalStack
    ///
    /// Setting this also switches to path style addressing.
    pub endpoint_url: Option<String>,
}

/// An [ArtifactStore] backed by S3.
///
/// Credentials are resolved through the standard AWS provider chain.
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub async fn connect(config: &S3StoreConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.endpoint_url.is_some() {
            s3_config = s3_config.force_path_style(true);
        }

        log::debug!("Connected S3 client for region {}", config.region);

        Self {
            client: Client::from_conf(s3_config.build()),
        }
    }
}

impl ArtifactStore for S3Store {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        page_size: i32,
        continuation: Option<String>,
    ) -> Result<ListPage, FetchError> {
        log::debug!("Listing s3://{bucket}/{prefix} (max {page_size} keys)");

        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(page_size)
            .set_continuation_token(continuation)
            .send()
            .await
            .map_err(|e| match e.raw_response().map(|r| r.status().as_u16()) {
                Some(status) => FetchError::ListStatus {
                    bucket: bucket.to_string(),
                    prefix: prefix.to_string(),
                    status,
                },
                None => FetchError::List {
                    bucket: bucket.to_string(),
                    prefix: prefix.to_string(),
                    message: DisplayErrorContext(&e).to_string(),
                },
            })?;

        let artifacts = output
            .contents()
            .iter()
            .filter_map(|object| object.key())
            .map(|key| ArtifactRef::new(bucket, key))
            .collect();

        let continuation = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListPage {
            artifacts,
            continuation,
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, FetchError> {
        log::debug!("Getting s3://{bucket}/{key}");

        let get_error = |message: String| FetchError::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        };

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| get_error(DisplayErrorContext(&e).to_string()))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| get_error(e.to_string()))?;

        Ok(body.into_bytes())
    }
}

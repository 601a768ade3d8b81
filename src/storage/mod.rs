//! Object storage client for task attachments.
//!
//! Wraps an S3-compatible endpoint behind a single `upload` operation. The
//! service never reads the bytes back; it only persists the object key on
//! the file record.

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;

use crate::config::StorageConfig;

pub struct ObjectStorage {
    client: aws_sdk_s3::Client,
    files_bucket: String,
}

impl ObjectStorage {
    /// Build a client from the `[storage]` config section. Static keys in
    /// the config win; otherwise the ambient AWS credential chain applies.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let base = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&base).force_path_style(true);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            builder = builder.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "boardr-config",
            ));
        }

        let client = aws_sdk_s3::Client::from_conf(builder.build());

        info!(
            bucket = %config.files_bucket,
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            "Object storage client initialized"
        );

        Self {
            client,
            files_bucket: config.files_bucket.clone(),
        }
    }

    /// Upload a blob under the given key. Failure here must prevent the
    /// caller from persisting the file record.
    pub async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.files_bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .with_context(|| format!("Failed to upload object '{key}'"))?;

        Ok(())
    }
}

//! S3-compatible storage backend (MinIO, AWS S3).

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use tracing::debug;

use notedeck_core::{Error, Result};

/// Region used when none is configured. MinIO ignores it.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for an S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Full endpoint URL including scheme, e.g. `http://localhost:9000`.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`.
    /// MinIO requires this.
    pub force_path_style: bool,
}

impl S3Config {
    pub fn from_parts(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: DEFAULT_REGION.to_string(),
            force_path_style: true,
        }
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn force_path_style(mut self, enabled: bool) -> Self {
        self.force_path_style = enabled;
        self
    }
}

/// [`StorageBackend`](crate::StorageBackend) over the AWS S3 API.
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    region: String,
}

impl S3Backend {
    pub fn new(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "static",
        );
        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint.clone())
            .credentials_provider(credentials)
            .force_path_style(config.force_path_style)
            .build();

        debug!(
            subsystem = "storage",
            component = "s3",
            endpoint = %config.endpoint,
            region = %config.region,
            "S3 client configured"
        );

        Self {
            client: Client::from_conf(sdk_config),
            region: config.region.clone(),
        }
    }
}

fn store_error<E>(op: &str, target: &str, err: E) -> Error
where
    E: std::error::Error + 'static,
{
    Error::ObjectStore(format!("{} {}: {}", op, target, DisplayErrorContext(err)))
}

#[async_trait]
impl crate::StorageBackend for S3Backend {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    Ok(false)
                } else {
                    Err(store_error("head_bucket", bucket, err))
                }
            }
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        // us-east-1 is the implicit location and must not be sent explicitly.
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err) => {
                let already_there = err.as_service_error().is_some_and(|e| {
                    e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists()
                });
                if already_there {
                    Ok(())
                } else {
                    Err(store_error("create_bucket", bucket, err))
                }
            }
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| store_error("put_object", key, e))?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    return Err(Error::NotFound(format!("object {}/{}", bucket, key)));
                }
                return Err(store_error("get_object", key, err));
            }
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| store_error("get_object body", key, e))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    Ok(false)
                } else {
                    Err(store_error("head_object", key, err))
                }
            }
        }
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| store_error("delete_object", key, e))?;
        Ok(())
    }

    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| store_error("presign", key, e))?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| store_error("presign", key, e))?;
        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageBackend;

    #[test]
    fn test_config_defaults_for_minio() {
        let config = S3Config::from_parts("http://localhost:9000", "minio", "minio123");
        assert_eq!(config.region, DEFAULT_REGION);
        assert!(config.force_path_style);
    }

    #[test]
    fn test_config_builder() {
        let config = S3Config::from_parts("https://s3.eu-west-1.amazonaws.com", "a", "b")
            .region("eu-west-1")
            .force_path_style(false);
        assert_eq!(config.region, "eu-west-1");
        assert!(!config.force_path_style);
    }

    #[tokio::test]
    async fn test_presign_is_computed_locally() {
        let backend = S3Backend::new(&S3Config::from_parts(
            "http://localhost:9000",
            "minio",
            "minio123",
        ));
        let url = backend
            .presign_get("notes-files", "42-report.pdf", Duration::from_secs(604_800))
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:9000/notes-files/42-report.pdf?"));
        assert!(url.contains("X-Amz-Expires=604800"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn test_presign_rejects_ttl_over_seven_days() {
        let backend = S3Backend::new(&S3Config::from_parts("http://localhost:9000", "a", "b"));
        let result = backend
            .presign_get("notes-files", "k", Duration::from_secs(8 * 24 * 60 * 60))
            .await;
        assert!(matches!(result, Err(Error::ObjectStore(_))));
    }
}

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use serde::Deserialize;
use tracing::debug;

use super::error::StorageError;
use super::traits::{ObjectStore, validate_location};

/// Connection settings for an S3-compatible endpoint (MinIO in development).
#[derive(Debug, Deserialize, Clone)]
pub struct S3Settings {
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// MinIO needs path-style addressing. Default: true.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_region() -> String {
    "us-east-1".into()
}
fn default_path_style() -> bool {
    true
}

/// Object store backed by an S3-compatible service.
pub struct S3ObjectStore {
    region: Region,
    credentials: Credentials,
    path_style: bool,
    max_size: u64,
}

impl S3ObjectStore {
    pub fn new(settings: &S3Settings, max_size: u64) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            Some(&settings.access_key),
            Some(&settings.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(Self {
            region: Region::Custom {
                region: settings.region.clone(),
                endpoint: settings.endpoint.clone(),
            },
            credentials,
            path_style: settings.path_style,
            max_size,
        })
    }

    fn bucket(&self, name: &str) -> Result<Box<Bucket>, StorageError> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

fn check_status(status: u16, bucket: &str, key: &str) -> Result<(), StorageError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(format!("{bucket}/{key}"))),
        other => Err(StorageError::Backend(format!(
            "{bucket}/{key}: unexpected status {other}"
        ))),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        validate_location(bucket, key)?;
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let response = self
            .bucket(bucket)?
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        check_status(response.status_code(), bucket, key)?;
        debug!(bucket, key, bytes = data.len(), "Stored object");
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_location(bucket, key)?;
        let response = self
            .bucket(bucket)?
            .get_object(key)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        check_status(response.status_code(), bucket, key)?;
        Ok(response.bytes().to_vec())
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        validate_location(bucket, key)?;
        let (_, status) = self
            .bucket(bucket)?
            .head_object(key)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        match check_status(status, bucket, key) {
            Ok(()) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        if !self.exists(bucket, key).await? {
            return Ok(false);
        }
        let response = self
            .bucket(bucket)?
            .delete_object(key)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        check_status(response.status_code(), bucket, key)?;
        Ok(true)
    }
}

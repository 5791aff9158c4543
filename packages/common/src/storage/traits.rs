use async_trait::async_trait;

use super::error::StorageError;

/// Key-addressed object storage, organised in buckets.
///
/// Writes replace whatever was stored under the same key. Callers that record
/// a key in the database must only do so after `put` returned `Ok`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `bucket/key`.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Retrieve all bytes stored under `bucket/key`.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Check whether an object exists.
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    /// Delete an object.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;
}

/// Reject bucket names and keys that could escape their namespace.
pub(crate) fn validate_location(bucket: &str, key: &str) -> Result<(), StorageError> {
    if bucket.is_empty()
        || !bucket
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.'))
        || bucket.starts_with('.')
    {
        return Err(StorageError::InvalidKey(format!("bad bucket name '{bucket}'")));
    }
    if key.is_empty() || key.len() > 1024 {
        return Err(StorageError::InvalidKey("key must be 1-1024 bytes".into()));
    }
    if key.starts_with('/') || key.contains('\\') || key.contains('\0') {
        return Err(StorageError::InvalidKey(format!("bad key '{key}'")));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(format!(
            "key '{key}' has an empty or relative segment"
        )));
    }
    Ok(())
}

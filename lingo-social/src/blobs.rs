//! Image storage. The service hands out upload URLs and storage keys;
//! records only ever hold keys, which are resolved to URLs on read.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use lingo_shared::clients::minio::MinioClient;
use lingo_shared::errors::{AppError, AppResult, ErrorCode};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Presigned URL the client uploads `key` to.
    async fn upload_url(&self, key: &str) -> AppResult<String>;
    /// Fetchable URL for `key`, or `None` when nothing was stored under it.
    async fn resolve_url(&self, key: &str) -> Option<String>;
    async fn delete(&self, key: &str) -> AppResult<()>;
}

/// New storage key inside the caller's namespace.
pub fn new_storage_key(owner: Uuid) -> String {
    format!("uploads/{owner}/{}", Uuid::now_v7())
}

/// Keys may only be attached to records by the user they were issued to.
pub fn ensure_owned_key(owner: Uuid, key: &str) -> AppResult<()> {
    let prefix = format!("uploads/{owner}/");
    let rest = key.strip_prefix(&prefix).unwrap_or_default();
    if rest.is_empty() || rest.contains('/') {
        return Err(AppError::new(ErrorCode::InvalidStorageKey, "storage key does not belong to caller"));
    }
    Ok(())
}

pub struct S3BlobStore {
    client: MinioClient,
    upload_ttl_secs: u64,
    download_ttl_secs: u64,
}

impl S3BlobStore {
    pub fn new(client: MinioClient, upload_ttl_secs: u64, download_ttl_secs: u64) -> Self {
        Self {
            client,
            upload_ttl_secs,
            download_ttl_secs,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload_url(&self, key: &str) -> AppResult<String> {
        self.client
            .presigned_upload_url(key, self.upload_ttl_secs)
            .await
            .map_err(|e| AppError::new(ErrorCode::UploadFailed, e))
    }

    async fn resolve_url(&self, key: &str) -> Option<String> {
        match self.client.exists(key).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "blob existence check failed");
                return None;
            }
        }
        match self.client.presigned_url(key, self.download_ttl_secs).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "failed to presign blob url");
                None
            }
        }
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete(key)
            .await
            .map_err(AppError::internal)
    }
}

/// Keeps the set of "uploaded" keys in memory; URLs are synthetic.
#[derive(Default)]
pub struct MemoryBlobStore {
    stored: RwLock<HashSet<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as uploaded, standing in for the client's PUT.
    pub fn put(&self, key: &str) {
        if let Ok(mut stored) = self.stored.write() {
            stored.insert(key.to_string());
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.stored
            .read()
            .map(|s| s.contains(key))
            .unwrap_or(false)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload_url(&self, key: &str) -> AppResult<String> {
        Ok(format!("memory://upload/{key}"))
    }

    async fn resolve_url(&self, key: &str) -> Option<String> {
        self.contains(key).then(|| format!("memory://blob/{key}"))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.stored
            .write()
            .map_err(|_| AppError::internal("blob store lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_keys_are_namespaced_per_owner() {
        let owner = Uuid::now_v7();
        let key = new_storage_key(owner);
        assert!(ensure_owned_key(owner, &key).is_ok());
        assert!(ensure_owned_key(Uuid::now_v7(), &key).is_err());
        assert!(ensure_owned_key(owner, &format!("uploads/{owner}/")).is_err());
        assert!(ensure_owned_key(owner, &format!("uploads/{owner}/a/../b")).is_err());
    }

    #[tokio::test]
    async fn memory_blobs_resolve_only_after_upload() {
        let blobs = MemoryBlobStore::new();
        assert_eq!(blobs.resolve_url("k").await, None);
        blobs.put("k");
        assert_eq!(blobs.resolve_url("k").await.as_deref(), Some("memory://blob/k"));
        blobs.delete("k").await.unwrap();
        assert!(!blobs.contains("k"));
    }
}

use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use lexia_core::StorageBackend;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for artifact storage (e.g., "/var/lib/lexia/artifacts")
    /// * `base_url` - Base URL for serving artifacts (e.g., "http://localhost:4000/artifacts")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys containing traversal sequences that could escape the
    /// base storage directory.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.contains("..") || key.starts_with('/') || key.is_empty() {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        Ok(self.base_path.join(key))
    }

    /// Generate public URL for an artifact
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, key: &str, _content_type: &str, data: Vec<u8>) -> StorageResult<String> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let url = self.generate_url(key);

        tracing::debug!(
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(url)
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;

        fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::DownloadFailed(format!(
                    "Failed to read file {}: {}",
                    path.display(),
                    e
                ))
            }
        })
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn storage() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:4000/artifacts".to_string())
            .await
            .unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let (_dir, storage) = storage().await;
        let url = storage
            .put("originals/abc.jpg", "image/jpeg", b"jpeg bytes".to_vec())
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:4000/artifacts/originals/abc.jpg");
        let data = storage.get("originals/abc.jpg").await.unwrap();
        assert_eq!(data, b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let (_dir, storage) = storage().await;
        assert!(!storage.exists("thumbnails/abc.jpg").await.unwrap());
        storage
            .put("thumbnails/abc.jpg", "image/jpeg", vec![1, 2, 3])
            .await
            .unwrap();
        assert!(storage.exists("thumbnails/abc.jpg").await.unwrap());
        storage.delete("thumbnails/abc.jpg").await.unwrap();
        assert!(!storage.exists("thumbnails/abc.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let (_dir, storage) = storage().await;
        assert!(storage.delete("originals/missing.jpg").await.is_ok());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (_dir, storage) = storage().await;
        let err = storage.get("originals/missing.jpg").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_traversal_key_rejected() {
        let (_dir, storage) = storage().await;
        let err = storage
            .put("../escape.jpg", "image/jpeg", vec![0])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}

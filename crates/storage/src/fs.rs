use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageError;
use crate::traits::BlobStore;

/// Blob store writing objects as files below a root directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Only plain relative paths are accepted; anything that could leave the root is rejected.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let plain = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        let upload_err = |e: std::io::Error| StorageError::Upload {
            path: path.to_string(),
            reason: e.to_string(),
        };
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(upload_err)?;
        }
        tokio::fs::write(&target, bytes).await.map_err(upload_err)?;
        debug!(path, size = bytes.len(), "stored blob");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| StorageError::Delete {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        debug!(path, "deleted blob");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_creates_nested_directories() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let blobs = FsBlobStore::new(dir.path());
        blobs.upload("countries/peru/gallery/a.jpg", b"jpeg").await?;
        let written = std::fs::read(dir.path().join("countries/peru/gallery/a.jpg"))?;
        assert_eq!(written, b"jpeg");

        blobs.delete("countries/peru/gallery/a.jpg").await?;
        assert!(!dir.path().join("countries/peru/gallery/a.jpg").exists());
        Ok(())
    }

    #[tokio::test]
    async fn rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path());
        for path in ["../outside.png", "/etc/passwd", "", "a/../../b"] {
            let err = blobs.upload(path, b"x").await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidPath(_)), "{path}");
        }
    }
}

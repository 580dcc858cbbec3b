// ABOUTME: Opaque blob storage for uploaded pet photos
// ABOUTME: Filesystem-backed implementation; size policy is enforced by callers, not here

use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, Result};

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(&self, blob: &[u8]) -> Result<String>;
    async fn read(&self, reference: &str) -> Result<Vec<u8>>;
    async fn remove(&self, reference: &str) -> Result<()>;
}

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, reference: &str) -> Result<PathBuf> {
        // References are always UUIDs we generated; anything else could walk out of root.
        let id = Uuid::parse_str(reference)
            .map_err(|_| AppError::NotFound(format!("blob {}", reference)))?;
        Ok(self.root.join(id.to_string()))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, blob: &[u8]) -> Result<String> {
        let reference = Uuid::new_v4().to_string();
        let path = self.path_for(&reference)?;
        tokio::fs::write(&path, blob).await?;
        tracing::debug!(%reference, bytes = blob.len(), "Stored blob");
        Ok(reference)
    }

    async fn read(&self, reference: &str) -> Result<Vec<u8>> {
        let path = self.path_for(reference)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("blob {}", reference)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, reference: &str) -> Result<()> {
        let path = self.path_for(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

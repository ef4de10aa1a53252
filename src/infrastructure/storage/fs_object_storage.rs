//! Filesystem adapter for the object-storage port. Cover images land under
//! a local uploads root and are served by the reverse proxy (or the
//! hosted bucket in production deployments).

use std::path::{Component, Path, PathBuf};

use anyhow::bail;
use async_trait::async_trait;

use crate::application::ports::object_storage::ObjectStorage;

pub struct FsObjectStorage {
    root: PathBuf,
    public_base: String,
}

impl FsObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Rejects traversal outside the uploads root.
    fn resolve(&self, path: &str) -> anyhow::Result<PathBuf> {
        let rel = Path::new(path.trim_start_matches('/'));
        if rel
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            bail!("invalid storage path '{}'", path);
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ObjectStorage for FsObjectStorage {
    async fn upload(&self, path: &str, bytes: &[u8]) -> anyhow::Result<String> {
        let abs = self.resolve(path)?;
        if let Some(parent) = abs.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&abs, bytes).await?;
        Ok(format!(
            "{}/{}",
            self.public_base,
            path.trim_start_matches('/')
        ))
    }

    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        let abs = self.resolve(path)?;
        match tokio::fs::remove_file(&abs).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let dir = self.resolve(prefix)?;
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                let name = entry.file_name().to_string_lossy().to_string();
                out.push(format!("{}/{}", prefix.trim_end_matches('/'), name));
            }
        }
        out.sort();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn upload_list_delete_roundtrip() {
        let temp = TempDir::new().unwrap();
        let storage = FsObjectStorage::new(temp.path(), "http://localhost:8888/uploads");

        let url = storage
            .upload("covers/a.png", b"png-bytes")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:8888/uploads/covers/a.png");

        let listed = storage.list("covers").await.unwrap();
        assert_eq!(listed, vec!["covers/a.png".to_string()]);

        storage.delete("covers/a.png").await.unwrap();
        assert!(storage.list("covers").await.unwrap().is_empty());
        // deleting again is a no-op
        storage.delete("covers/a.png").await.unwrap();
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let temp = TempDir::new().unwrap();
        let storage = FsObjectStorage::new(temp.path(), "http://localhost");
        assert!(storage.upload("../evil", b"x").await.is_err());
    }
}

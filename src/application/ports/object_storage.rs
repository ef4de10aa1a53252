use async_trait::async_trait;

/// Blob store for cover images. Paths are forward-slash relative keys.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores the bytes and returns a public URL for the object.
    async fn upload(&self, path: &str, bytes: &[u8]) -> anyhow::Result<String>;

    async fn delete(&self, path: &str) -> anyhow::Result<()>;

    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<String>>;
}

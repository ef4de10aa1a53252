use uuid::Uuid;

use crate::application::ports::object_storage::ObjectStorage;

#[derive(Debug, Clone)]
pub struct UploadedCoverImage {
    pub path: String,
    pub url: String,
}

pub struct UploadCoverImage<'a, S: ObjectStorage + ?Sized> {
    pub storage: &'a S,
}

impl<'a, S: ObjectStorage + ?Sized> UploadCoverImage<'a, S> {
    pub async fn execute(
        &self,
        original_filename: Option<&str>,
        bytes: &[u8],
    ) -> anyhow::Result<UploadedCoverImage> {
        let ext = original_filename
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()) && ext.len() <= 8);
        let path = match ext {
            Some(ext) => format!("covers/{}.{}", Uuid::new_v4(), ext),
            None => format!("covers/{}", Uuid::new_v4()),
        };
        let url = self.storage.upload(&path, bytes).await?;
        Ok(UploadedCoverImage { path, url })
    }
}

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::application::ports::document_store::DocumentStore;
use crate::domain::posts::POSTS_COLLECTION;
use crate::domain::posts::error::BlogError;
use crate::domain::posts::post::PostStatus;

pub struct UnpublishPost<'a, S: DocumentStore + ?Sized> {
    pub store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> UnpublishPost<'a, S> {
    /// Single-document status flip; slugs are untouched. A post never goes
    /// back to draft once it has been published.
    pub async fn execute(&self, post_id: Uuid) -> anyhow::Result<()> {
        let id = post_id.to_string();
        if self.store.get(POSTS_COLLECTION, &id).await?.is_none() {
            return Err(BlogError::PostNotFound { id: post_id }.into());
        }
        self.store
            .update(
                POSTS_COLLECTION,
                &id,
                json!({
                    "status": PostStatus::Unpublished,
                    "updatedAt": Utc::now(),
                }),
            )
            .await
    }
}

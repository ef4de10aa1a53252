use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::application::ports::document_store::DocumentStore;
use crate::application::services::indexing;
use crate::domain::posts::POSTS_COLLECTION;
use crate::domain::posts::error::BlogError;
use crate::domain::posts::post::{Post, PostStatus};

pub struct PublishPost<'a, S: DocumentStore + ?Sized> {
    pub store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> PublishPost<'a, S> {
    /// Read-validate-update, deliberately outside a transaction: publishing
    /// never touches slugs, only status and derived fields. `published_at`
    /// is set on the first successful publish and never reset.
    pub async fn execute(&self, post_id: Uuid) -> anyhow::Result<()> {
        let id = post_id.to_string();
        let current = self
            .store
            .get(POSTS_COLLECTION, &id)
            .await?
            .ok_or(BlogError::PostNotFound { id: post_id })?;
        let mut post: Post = serde_json::from_value(current)?;

        if !post.has_publishable_language() {
            return Err(BlogError::Validation(
                "publishing requires at least one language with title, slug and content".into(),
            )
            .into());
        }

        for lc in post.languages.values_mut() {
            lc.search_tokens = indexing::search_tokens(lc);
        }
        let insight_keys = indexing::insight_keys(&post);
        let now = Utc::now();
        let published_at = post.published_at.unwrap_or(now);

        self.store
            .update(
                POSTS_COLLECTION,
                &id,
                json!({
                    "status": PostStatus::Published,
                    "publishedAt": published_at,
                    "updatedAt": now,
                    "languages": serde_json::to_value(&post.languages)?,
                    "insightKeys": insight_keys,
                }),
            )
            .await
    }
}

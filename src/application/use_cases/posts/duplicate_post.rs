use chrono::Utc;
use uuid::Uuid;

use crate::application::ports::document_store::DocumentStore;
use crate::application::services::slug::{ClaimSlugsAndWritePost, next_copy_slug};
use crate::domain::posts::POSTS_COLLECTION;
use crate::domain::posts::error::BlogError;
use crate::domain::posts::post::{Author, Post, PostStatus};

pub struct DuplicatePost<'a, S: DocumentStore + ?Sized> {
    pub store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> DuplicatePost<'a, S> {
    /// Copies a post as a fresh draft, deriving a `-copy`/`-copy-N` slug
    /// per language. The suffix probes run outside the claiming
    /// transaction, so a concurrent duplicate of the same source may lose
    /// the race and abort with `SlugTaken`; the caller retries.
    pub async fn execute(&self, source_id: Uuid, author: Author) -> anyhow::Result<Uuid> {
        let source = self
            .store
            .get(POSTS_COLLECTION, &source_id.to_string())
            .await?
            .ok_or(BlogError::PostNotFound { id: source_id })?;
        let source: Post = serde_json::from_value(source)?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut languages = source.languages.clone();
        for (lang, lc) in languages.iter_mut() {
            if !lc.slug.is_empty() {
                lc.slug = next_copy_slug(self.store, lang, &lc.slug).await?;
            }
        }

        let post = Post {
            id,
            status: PostStatus::Draft,
            languages,
            category: source.category.clone(),
            tags: source.tags.clone(),
            keywords: source.keywords.clone(),
            event_tags: source.event_tags.clone(),
            currency_tags: source.currency_tags.clone(),
            // post-specific fields are not carried over
            related_post_ids: Vec::new(),
            author_ids: source.author_ids.clone(),
            author: Some(author),
            insight_keys: source.insight_keys.clone(),
            view_count: 0,
            created_at: now,
            updated_at: now,
            published_at: None,
        };

        let claims = post
            .owned_slugs()
            .map(|(lang, slug)| (lang.to_string(), slug.to_string()))
            .collect();
        let body = ClaimSlugsAndWritePost {
            post_id: id,
            post_doc: serde_json::to_value(&post)?,
            claims,
            now,
        };
        self.store.run_transaction(&body).await?;
        Ok(id)
    }
}

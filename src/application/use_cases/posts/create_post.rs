use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use crate::application::ports::document_store::DocumentStore;
use crate::application::services::indexing;
use crate::application::services::slug::ClaimSlugsAndWritePost;
use crate::application::use_cases::posts::{LanguageContentInput, build_languages};
use crate::domain::posts::error::BlogError;
use crate::domain::posts::post::{Author, Post, PostStatus};

#[derive(Debug, Clone, Default)]
pub struct CreatePostInput {
    pub languages: BTreeMap<String, LanguageContentInput>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    pub event_tags: Vec<String>,
    pub currency_tags: Vec<String>,
    pub related_post_ids: Vec<Uuid>,
    pub author_ids: Vec<String>,
}

pub struct CreatePost<'a, S: DocumentStore + ?Sized> {
    pub store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> CreatePost<'a, S> {
    /// Allocates the post id and writes the post together with all of its
    /// slug claims in one transaction. A slug collision aborts the whole
    /// create; no document is written.
    pub async fn execute(&self, input: CreatePostInput, author: Author) -> anyhow::Result<Uuid> {
        if input.languages.is_empty() {
            return Err(
                BlogError::Validation("a post needs at least one language".into()).into(),
            );
        }
        let languages = build_languages(&input.languages)?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut post = Post {
            id,
            status: PostStatus::Draft,
            languages,
            category: input.category,
            tags: input.tags,
            keywords: input.keywords,
            event_tags: input.event_tags,
            currency_tags: input.currency_tags,
            related_post_ids: input.related_post_ids,
            author_ids: input.author_ids,
            author: Some(author),
            insight_keys: Vec::new(),
            view_count: 0,
            created_at: now,
            updated_at: now,
            published_at: None,
        };
        post.insight_keys = indexing::insight_keys(&post);

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

        tracing::info!(post_id = %id, "post_created");
        Ok(id)
    }
}

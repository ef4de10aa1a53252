use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::application::ports::document_store::{DocumentStore, StoreTransaction, TransactionBody};
use crate::application::services::indexing;
use crate::application::services::slug::{SlugPlan, apply_slug_plan, plan_slug_changes, read_claim_targets};
use crate::application::use_cases::posts::{LanguageContentInput, build_languages};
use crate::domain::posts::POSTS_COLLECTION;
use crate::domain::posts::error::BlogError;
use crate::domain::posts::post::{LanguageContent, Post};

/// Partial update. `languages`, when provided, replaces the whole language
/// map: languages absent from it are removed from the post and their slug
/// entries released.
#[derive(Debug, Clone, Default)]
pub struct UpdatePostInput {
    pub languages: Option<BTreeMap<String, LanguageContentInput>>,
    // None => unchanged; Some(None) => clear category
    pub category: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub event_tags: Option<Vec<String>>,
    pub currency_tags: Option<Vec<String>>,
    pub related_post_ids: Option<Vec<Uuid>>,
    pub author_ids: Option<Vec<String>>,
}

pub struct UpdatePost<'a, S: DocumentStore + ?Sized> {
    pub store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> UpdatePost<'a, S> {
    pub async fn execute(&self, post_id: Uuid, input: UpdatePostInput) -> anyhow::Result<()> {
        let new_languages = match &input.languages {
            Some(inputs) if inputs.is_empty() => {
                return Err(BlogError::LastLanguageRemoval.into());
            }
            Some(inputs) => Some(build_languages(inputs)?),
            None => None,
        };

        let body = UpdatePostTxn {
            post_id,
            new_languages,
            input,
            now: Utc::now(),
        };
        self.store.run_transaction(&body).await
    }
}

/// The update transaction. Phase 1 reads the post document and the index
/// entry of every slug the update claims, collecting everything in memory;
/// Phase 2 derives all writes from those reads. Interleaving a per-language
/// read with a per-language write would break the store's ordering rule as
/// soon as a second language is touched.
struct UpdatePostTxn {
    post_id: Uuid,
    new_languages: Option<BTreeMap<String, LanguageContent>>,
    input: UpdatePostInput,
    now: DateTime<Utc>,
}

#[async_trait]
impl TransactionBody for UpdatePostTxn {
    async fn run(&self, tx: &mut dyn StoreTransaction) -> anyhow::Result<()> {
        let id = self.post_id.to_string();
        let current = tx
            .get(POSTS_COLLECTION, &id)
            .await?
            .ok_or(BlogError::PostNotFound { id: self.post_id })?;
        let mut post: Post = serde_json::from_value(current)?;

        let plan = match &self.new_languages {
            Some(new_languages) => plan_slug_changes(&post, new_languages),
            None => SlugPlan::default(),
        };
        let targets = read_claim_targets(tx, &plan.changes).await?;

        apply_slug_plan(tx, self.post_id, &plan, &targets, self.now)?;

        if let Some(new_languages) = &self.new_languages {
            post.languages = new_languages.clone();
        }
        if let Some(category) = &self.input.category {
            post.category = category.clone();
        }
        if let Some(tags) = &self.input.tags {
            post.tags = tags.clone();
        }
        if let Some(keywords) = &self.input.keywords {
            post.keywords = keywords.clone();
        }
        if let Some(event_tags) = &self.input.event_tags {
            post.event_tags = event_tags.clone();
        }
        if let Some(currency_tags) = &self.input.currency_tags {
            post.currency_tags = currency_tags.clone();
        }
        if let Some(related) = &self.input.related_post_ids {
            post.related_post_ids = related.clone();
        }
        if let Some(author_ids) = &self.input.author_ids {
            post.author_ids = author_ids.clone();
        }
        post.insight_keys = indexing::insight_keys(&post);
        post.updated_at = self.now;

        tx.set(POSTS_COLLECTION, &id, serde_json::to_value(&post)?);
        Ok(())
    }
}

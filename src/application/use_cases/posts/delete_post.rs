use async_trait::async_trait;
use uuid::Uuid;

use crate::application::ports::document_store::{DocumentStore, StoreTransaction, TransactionBody};
use crate::domain::posts::error::BlogError;
use crate::domain::posts::post::Post;
use crate::domain::posts::slug::slug_key;
use crate::domain::posts::{POSTS_COLLECTION, SLUG_INDEX_COLLECTION};

pub struct DeletePost<'a, S: DocumentStore + ?Sized> {
    pub store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> DeletePost<'a, S> {
    /// Releases every slug entry the post owns and removes the post, all in
    /// one transaction so no entry can outlive its owner.
    pub async fn execute(&self, post_id: Uuid) -> anyhow::Result<()> {
        let body = DeletePostTxn { post_id };
        self.store.run_transaction(&body).await
    }
}

struct DeletePostTxn {
    post_id: Uuid,
}

#[async_trait]
impl TransactionBody for DeletePostTxn {
    async fn run(&self, tx: &mut dyn StoreTransaction) -> anyhow::Result<()> {
        let id = self.post_id.to_string();
        let current = tx
            .get(POSTS_COLLECTION, &id)
            .await?
            .ok_or(BlogError::PostNotFound { id: self.post_id })?;
        let post: Post = serde_json::from_value(current)?;

        for (lang, slug) in post.owned_slugs() {
            tx.delete(SLUG_INDEX_COLLECTION, &slug_key(lang, slug));
        }
        tx.delete(POSTS_COLLECTION, &id);
        Ok(())
    }
}

use uuid::Uuid;

use crate::application::ports::document_store::DocumentStore;
use crate::domain::posts::POSTS_COLLECTION;
use crate::domain::posts::post::Post;

pub struct GetPost<'a, S: DocumentStore + ?Sized> {
    pub store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> GetPost<'a, S> {
    pub async fn execute(&self, post_id: Uuid) -> anyhow::Result<Option<Post>> {
        let doc = self
            .store
            .get(POSTS_COLLECTION, &post_id.to_string())
            .await?;
        Ok(match doc {
            Some(value) => Some(serde_json::from_value(value)?),
            None => None,
        })
    }
}

use crate::application::ports::document_store::{DocumentStore, Filter, Query, SortDirection};
use crate::domain::posts::POSTS_COLLECTION;
use crate::domain::posts::post::{Post, PostStatus};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;

pub struct ListPosts<'a, S: DocumentStore + ?Sized> {
    pub store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> ListPosts<'a, S> {
    pub async fn execute(
        &self,
        status: Option<PostStatus>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> anyhow::Result<Vec<Post>> {
        let mut filters = Vec::new();
        if let Some(status) = status {
            filters.push(Filter {
                field: "status".into(),
                value: serde_json::to_value(status)?,
            });
        }
        let order_field = match status {
            Some(PostStatus::Published) => "publishedAt",
            _ => "updatedAt",
        };
        let query = Query {
            filters,
            order_by: Some((order_field.into(), SortDirection::Desc)),
            limit: Some(limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)),
            offset,
        };

        let rows = self.store.query(POSTS_COLLECTION, &query).await?;
        let mut posts = Vec::with_capacity(rows.len());
        for row in rows {
            posts.push(serde_json::from_value(row)?);
        }
        Ok(posts)
    }
}

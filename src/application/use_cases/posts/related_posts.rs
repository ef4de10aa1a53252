use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::application::ports::document_store::{DocumentStore, Filter, Query, SortDirection};
use crate::application::services::related::rank_related;
use crate::domain::posts::POSTS_COLLECTION;
use crate::domain::posts::error::BlogError;
use crate::domain::posts::post::{Post, PostStatus};

/// How many recent published posts are scored as candidates.
const CANDIDATE_POOL: usize = 100;

pub struct GetRelatedPosts<'a, S: DocumentStore + ?Sized> {
    pub store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> GetRelatedPosts<'a, S> {
    pub async fn execute(
        &self,
        post_id: Uuid,
        read_ids: &HashSet<Uuid>,
        limit: usize,
    ) -> anyhow::Result<Vec<Post>> {
        let subject = self
            .store
            .get(POSTS_COLLECTION, &post_id.to_string())
            .await?
            .ok_or(BlogError::PostNotFound { id: post_id })?;
        let subject: Post = serde_json::from_value(subject)?;

        let query = Query {
            filters: vec![Filter {
                field: "status".into(),
                value: serde_json::to_value(PostStatus::Published)?,
            }],
            order_by: Some(("publishedAt".into(), SortDirection::Desc)),
            limit: Some(CANDIDATE_POOL),
            offset: None,
        };
        let rows = self.store.query(POSTS_COLLECTION, &query).await?;
        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            candidates.push(serde_json::from_value::<Post>(row)?);
        }

        let ranked = rank_related(&subject, &candidates, read_ids, Utc::now(), limit);
        let mut by_id: std::collections::HashMap<Uuid, Post> =
            candidates.into_iter().map(|p| (p.id, p)).collect();
        Ok(ranked.into_iter().filter_map(|id| by_id.remove(&id)).collect())
    }
}

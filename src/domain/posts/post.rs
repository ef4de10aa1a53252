use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
    Unpublished,
}

/// Identity stamped on a post, supplied by the hosted auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverImage {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
    /// Object-storage path, kept so the blob can be deleted with the post.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageContent {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content_html: String,
    #[serde(default)]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub seo_description: Option<String>,
    #[serde(default)]
    pub cover_image: Option<CoverImage>,
    /// Derived, recomputed on write/publish. Never edited directly.
    #[serde(default)]
    pub search_tokens: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub status: PostStatus,
    /// Language code -> content. Keys unique, insertion order irrelevant.
    pub languages: BTreeMap<String, LanguageContent>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub event_tags: Vec<String>,
    #[serde(default)]
    pub currency_tags: Vec<String>,
    #[serde(default)]
    pub related_post_ids: Vec<Uuid>,
    #[serde(default)]
    pub author_ids: Vec<String>,
    #[serde(default)]
    pub author: Option<Author>,
    /// Derived from category and event/currency tags on publish.
    #[serde(default)]
    pub insight_keys: Vec<String>,
    #[serde(default)]
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Languages that currently hold a non-empty slug, i.e. own a live
    /// index entry.
    pub fn owned_slugs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.languages
            .iter()
            .filter(|(_, lc)| !lc.slug.is_empty())
            .map(|(lang, lc)| (lang.as_str(), lc.slug.as_str()))
    }

    /// A post is publishable when at least one language has title, slug and
    /// body all present.
    pub fn has_publishable_language(&self) -> bool {
        self.languages.values().any(|lc| {
            !lc.title.trim().is_empty()
                && !lc.slug.is_empty()
                && !lc.content_html.trim().is_empty()
        })
    }
}

/// One record of the `blogSlugIndex` collection, keyed by `"<lang>_<slug>"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugIndexEntry {
    pub post_id: Uuid,
    pub lang: String,
    pub slug: String,
    pub claimed_at: DateTime<Utc>,
}

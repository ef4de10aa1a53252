use std::collections::{BTreeMap, HashSet};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::use_cases::posts::check_slug::CheckSlugAvailability;
use crate::application::use_cases::posts::create_post::{CreatePost, CreatePostInput};
use crate::application::use_cases::posts::delete_post::DeletePost;
use crate::application::use_cases::posts::duplicate_post::DuplicatePost;
use crate::application::use_cases::posts::get_post::GetPost;
use crate::application::use_cases::posts::list_posts::ListPosts;
use crate::application::use_cases::posts::publish_post::PublishPost;
use crate::application::use_cases::posts::related_posts::GetRelatedPosts;
use crate::application::use_cases::posts::unpublish_post::UnpublishPost;
use crate::application::use_cases::posts::update_post::{UpdatePost, UpdatePostInput};
use crate::application::use_cases::posts::LanguageContentInput;
use crate::bootstrap::app_context::AppContext;
use crate::domain::posts::post::{CoverImage, Post, PostStatus};
use crate::presentation::http::ApiError;
use crate::presentation::http::auth::{self, Bearer};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CoverImagePayload {
    pub url: String,
    pub alt: Option<String>,
    pub path: Option<String>,
}

impl From<CoverImagePayload> for CoverImage {
    fn from(p: CoverImagePayload) -> Self {
        CoverImage {
            url: p.url,
            alt: p.alt,
            path: p.path,
        }
    }
}

impl From<CoverImage> for CoverImagePayload {
    fn from(c: CoverImage) -> Self {
        CoverImagePayload {
            url: c.url,
            alt: c.alt,
            path: c.path,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LanguageBlockRequest {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content_html: String,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub cover_image: Option<CoverImagePayload>,
}

impl From<LanguageBlockRequest> for LanguageContentInput {
    fn from(req: LanguageBlockRequest) -> Self {
        LanguageContentInput {
            title: req.title,
            slug: req.slug,
            excerpt: req.excerpt,
            content_html: req.content_html,
            seo_title: req.seo_title,
            seo_description: req.seo_description,
            cover_image: req.cover_image.map(Into::into),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LanguageBlock {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content_html: String,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub cover_image: Option<CoverImagePayload>,
    pub search_tokens: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorInfo {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostResponse {
    pub id: Uuid,
    pub status: String,
    pub languages: BTreeMap<String, LanguageBlock>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    pub event_tags: Vec<String>,
    pub currency_tags: Vec<String>,
    pub related_post_ids: Vec<Uuid>,
    pub author_ids: Vec<String>,
    pub author: Option<AuthorInfo>,
    pub insight_keys: Vec<String>,
    pub view_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Post> for PostResponse {
    fn from(p: Post) -> Self {
        let status = match p.status {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
            PostStatus::Unpublished => "unpublished",
        };
        PostResponse {
            id: p.id,
            status: status.to_string(),
            languages: p
                .languages
                .into_iter()
                .map(|(lang, lc)| {
                    (
                        lang,
                        LanguageBlock {
                            title: lc.title,
                            slug: lc.slug,
                            excerpt: lc.excerpt,
                            content_html: lc.content_html,
                            seo_title: lc.seo_title,
                            seo_description: lc.seo_description,
                            cover_image: lc.cover_image.map(Into::into),
                            search_tokens: lc.search_tokens,
                        },
                    )
                })
                .collect(),
            category: p.category,
            tags: p.tags,
            keywords: p.keywords,
            event_tags: p.event_tags,
            currency_tags: p.currency_tags,
            related_post_ids: p.related_post_ids,
            author_ids: p.author_ids,
            author: p.author.map(|a| AuthorInfo {
                id: a.id,
                name: a.name,
                email: a.email,
            }),
            insight_keys: p.insight_keys,
            view_count: p.view_count,
            created_at: p.created_at,
            updated_at: p.updated_at,
            published_at: p.published_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostListResponse {
    pub items: Vec<PostResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatePostResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub languages: BTreeMap<String, LanguageBlockRequest>,
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
}

#[derive(Debug, Deserialize, ToSchema, Default)]
pub struct UpdatePostRequest {
    /// Full replacement of the language map when present.
    pub languages: Option<BTreeMap<String, LanguageBlockRequest>>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    #[schema(value_type = Option<String>)]
    pub category: DoubleOption<String>,
    pub tags: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub event_tags: Option<Vec<String>>,
    pub currency_tags: Option<Vec<String>>,
    pub related_post_ids: Option<Vec<Uuid>>,
    pub author_ids: Option<Vec<String>>,
}

/// Distinguishes "field absent" from an explicit `null` in PATCH bodies.
#[derive(Debug, Clone)]
pub enum DoubleOption<T> {
    NotProvided,
    Null,
    Some(T),
}

impl<T> Default for DoubleOption<T> {
    fn default() -> Self {
        DoubleOption::NotProvided
    }
}

fn deserialize_double_option<'de, D, T>(deserializer: D) -> Result<DoubleOption<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(|opt| match opt {
        None => DoubleOption::Null,
        Some(value) => DoubleOption::Some(value),
    })
}

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

fn parse_status(s: &str) -> Result<PostStatus, ApiError> {
    match s {
        "draft" => Ok(PostStatus::Draft),
        "published" => Ok(PostStatus::Published),
        "unpublished" => Ok(PostStatus::Unpublished),
        _ => Err(StatusCode::BAD_REQUEST.into()),
    }
}

#[utoipa::path(get, path = "/api/posts", tag = "Posts",
    params(
        ("status" = Option<String>, Query, description = "Filter by status (draft|published|unpublished)"),
        ("limit" = Option<usize>, Query, description = "Page size"),
        ("offset" = Option<usize>, Query, description = "Page offset")
    ),
    responses((status = 200, body = PostListResponse)))]
pub async fn list_posts(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    q: Option<Query<ListPostsQuery>>,
) -> Result<Json<PostListResponse>, ApiError> {
    auth::validate_bearer(&ctx.cfg, bearer)?;
    let q = q.map(|Query(v)| v);
    let status = match q.as_ref().and_then(|v| v.status.as_deref()) {
        Some(s) => Some(parse_status(s)?),
        None => None,
    };

    let store = ctx.document_store();
    let uc = ListPosts {
        store: store.as_ref(),
    };
    let posts = uc
        .execute(
            status,
            q.as_ref().and_then(|v| v.limit),
            q.as_ref().and_then(|v| v.offset),
        )
        .await?;
    Ok(Json(PostListResponse {
        items: posts.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(post, path = "/api/posts", tag = "Posts", request_body = CreatePostRequest,
    responses(
        (status = 200, body = CreatePostResponse),
        (status = 409, description = "A slug is already taken", body = super::ErrorBody),
        (status = 422, description = "Validation failed", body = super::ErrorBody)
    ))]
pub async fn create_post(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<CreatePostResponse>, ApiError> {
    let author = auth::validate_bearer(&ctx.cfg, bearer)?;
    let input = CreatePostInput {
        languages: req
            .languages
            .into_iter()
            .map(|(lang, block)| (lang, block.into()))
            .collect(),
        category: req.category,
        tags: req.tags,
        keywords: req.keywords,
        event_tags: req.event_tags,
        currency_tags: req.currency_tags,
        related_post_ids: req.related_post_ids,
        author_ids: req.author_ids,
    };

    let store = ctx.document_store();
    let uc = CreatePost {
        store: store.as_ref(),
    };
    let id = uc.execute(input, author).await?;
    Ok(Json(CreatePostResponse { id }))
}

#[utoipa::path(get, path = "/api/posts/{id}", tag = "Posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses((status = 200, body = PostResponse), (status = 404)))]
pub async fn get_post(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> Result<Json<PostResponse>, ApiError> {
    auth::validate_bearer(&ctx.cfg, bearer)?;
    let store = ctx.document_store();
    let uc = GetPost {
        store: store.as_ref(),
    };
    let post = uc.execute(id).await?.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(post.into()))
}

#[utoipa::path(patch, path = "/api/posts/{id}", tag = "Posts", request_body = UpdatePostRequest,
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, body = PostResponse),
        (status = 404),
        (status = 409, description = "A slug is already taken", body = super::ErrorBody),
        (status = 422, description = "Validation failed", body = super::ErrorBody)
    ))]
pub async fn update_post(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    auth::validate_bearer(&ctx.cfg, bearer)?;
    let input = UpdatePostInput {
        languages: req.languages.map(|langs| {
            langs
                .into_iter()
                .map(|(lang, block)| (lang, block.into()))
                .collect()
        }),
        category: match req.category {
            DoubleOption::NotProvided => None,
            DoubleOption::Null => Some(None),
            DoubleOption::Some(v) => Some(Some(v)),
        },
        tags: req.tags,
        keywords: req.keywords,
        event_tags: req.event_tags,
        currency_tags: req.currency_tags,
        related_post_ids: req.related_post_ids,
        author_ids: req.author_ids,
    };

    let store = ctx.document_store();
    UpdatePost {
        store: store.as_ref(),
    }
    .execute(id, input)
    .await?;
    let post = GetPost {
        store: store.as_ref(),
    }
    .execute(id)
    .await?
    .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(post.into()))
}

#[utoipa::path(delete, path = "/api/posts/{id}", tag = "Posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses((status = 204), (status = 404)))]
pub async fn delete_post(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    auth::validate_bearer(&ctx.cfg, bearer)?;
    let store = ctx.document_store();
    DeletePost {
        store: store.as_ref(),
    }
    .execute(id)
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(post, path = "/api/posts/{id}/publish", tag = "Posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, body = PostResponse),
        (status = 404),
        (status = 422, description = "No publishable language", body = super::ErrorBody)
    ))]
pub async fn publish_post(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> Result<Json<PostResponse>, ApiError> {
    auth::validate_bearer(&ctx.cfg, bearer)?;
    let store = ctx.document_store();
    PublishPost {
        store: store.as_ref(),
    }
    .execute(id)
    .await?;
    let post = GetPost {
        store: store.as_ref(),
    }
    .execute(id)
    .await?
    .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(post.into()))
}

#[utoipa::path(post, path = "/api/posts/{id}/unpublish", tag = "Posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses((status = 200, body = PostResponse), (status = 404)))]
pub async fn unpublish_post(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> Result<Json<PostResponse>, ApiError> {
    auth::validate_bearer(&ctx.cfg, bearer)?;
    let store = ctx.document_store();
    UnpublishPost {
        store: store.as_ref(),
    }
    .execute(id)
    .await?;
    let post = GetPost {
        store: store.as_ref(),
    }
    .execute(id)
    .await?
    .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(post.into()))
}

#[utoipa::path(post, path = "/api/posts/{id}/duplicate", tag = "Posts",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, body = CreatePostResponse),
        (status = 404),
        (status = 409, description = "No free copy slug", body = super::ErrorBody)
    ))]
pub async fn duplicate_post(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> Result<Json<CreatePostResponse>, ApiError> {
    let author = auth::validate_bearer(&ctx.cfg, bearer)?;
    let store = ctx.document_store();
    let copy_id = DuplicatePost {
        store: store.as_ref(),
    }
    .execute(id, author)
    .await?;
    Ok(Json(CreatePostResponse { id: copy_id }))
}

#[derive(Debug, Deserialize)]
pub struct SlugCheckQuery {
    pub lang: String,
    pub slug: String,
    pub exclude: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlugCheckResponse {
    pub available: bool,
}

#[utoipa::path(get, path = "/api/posts/slug-availability", tag = "Posts",
    params(
        ("lang" = String, Query, description = "Language code"),
        ("slug" = String, Query, description = "Candidate slug"),
        ("exclude" = Option<Uuid>, Query, description = "Post whose own claim is ignored")
    ),
    responses((status = 200, body = SlugCheckResponse)))]
pub async fn check_slug(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Query(q): Query<SlugCheckQuery>,
) -> Result<Json<SlugCheckResponse>, ApiError> {
    auth::validate_bearer(&ctx.cfg, bearer)?;
    let store = ctx.document_store();
    let available = CheckSlugAvailability {
        store: store.as_ref(),
    }
    .execute(&q.lang, &q.slug, q.exclude)
    .await?;
    Ok(Json(SlugCheckResponse { available }))
}

#[derive(Debug, Deserialize)]
pub struct RelatedQuery {
    pub limit: Option<usize>,
    /// Comma-separated post ids the reader has already seen.
    pub read: Option<String>,
}

const DEFAULT_RELATED_LIMIT: usize = 4;

#[utoipa::path(get, path = "/api/posts/{id}/related", tag = "Posts",
    params(
        ("id" = Uuid, Path, description = "Post ID"),
        ("limit" = Option<usize>, Query, description = "Max results"),
        ("read" = Option<String>, Query, description = "Comma-separated post ids already read")
    ),
    responses((status = 200, body = PostListResponse), (status = 404)))]
pub async fn related_posts(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    q: Option<Query<RelatedQuery>>,
) -> Result<Json<PostListResponse>, ApiError> {
    auth::validate_bearer(&ctx.cfg, bearer)?;
    let q = q.map(|Query(v)| v);
    let read_ids: HashSet<Uuid> = q
        .as_ref()
        .and_then(|v| v.read.as_deref())
        .map(|s| {
            s.split(',')
                .filter_map(|part| Uuid::parse_str(part.trim()).ok())
                .collect()
        })
        .unwrap_or_default();
    let limit = q
        .as_ref()
        .and_then(|v| v.limit)
        .unwrap_or(DEFAULT_RELATED_LIMIT);

    let store = ctx.document_store();
    let posts = GetRelatedPosts {
        store: store.as_ref(),
    }
    .execute(id, &read_ids, limit)
    .await?;
    Ok(Json(PostListResponse {
        items: posts.into_iter().map(Into::into).collect(),
    }))
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/slug-availability", get(check_slug))
        .route(
            "/posts/:id",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/posts/:id/publish", post(publish_post))
        .route("/posts/:id/unpublish", post(unpublish_post))
        .route("/posts/:id/duplicate", post(duplicate_post))
        .route("/posts/:id/related", get(related_posts))
        .with_state(ctx)
}

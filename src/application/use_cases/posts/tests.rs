use std::collections::{BTreeMap, HashSet};

use serde_json::json;
use uuid::Uuid;

use crate::application::ports::document_store::{DocumentStore, Query};
use crate::application::use_cases::posts::LanguageContentInput;
use crate::application::use_cases::posts::check_slug::CheckSlugAvailability;
use crate::application::use_cases::posts::create_post::{CreatePost, CreatePostInput};
use crate::application::use_cases::posts::delete_post::DeletePost;
use crate::application::use_cases::posts::duplicate_post::DuplicatePost;
use crate::application::use_cases::posts::get_post::GetPost;
use crate::application::use_cases::posts::list_posts::ListPosts;
use crate::application::use_cases::posts::publish_post::PublishPost;
use crate::application::use_cases::posts::unpublish_post::UnpublishPost;
use crate::application::use_cases::posts::update_post::{UpdatePost, UpdatePostInput};
use crate::domain::posts::error::BlogError;
use crate::domain::posts::post::{Author, Post, PostStatus, SlugIndexEntry};
use crate::domain::posts::slug::slug_key;
use crate::domain::posts::{POSTS_COLLECTION, SLUG_INDEX_COLLECTION};
use crate::infrastructure::db::memory_store::MemoryDocumentStore;

fn author() -> Author {
    Author {
        id: "uid-1".into(),
        name: "Ada".into(),
        email: "ada@example.com".into(),
    }
}

fn lang_input(title: &str, slug: &str) -> LanguageContentInput {
    LanguageContentInput {
        title: title.into(),
        slug: slug.into(),
        excerpt: format!("{} excerpt", title),
        content_html: format!("<p>{}</p>", title),
        seo_title: None,
        seo_description: None,
        cover_image: None,
    }
}

fn create_input(langs: &[(&str, &str)]) -> CreatePostInput {
    CreatePostInput {
        languages: langs
            .iter()
            .map(|(lang, slug)| (lang.to_string(), lang_input("Title", slug)))
            .collect(),
        ..Default::default()
    }
}

async fn create(store: &MemoryDocumentStore, langs: &[(&str, &str)]) -> Uuid {
    CreatePost { store }
        .execute(create_input(langs), author())
        .await
        .unwrap()
}

async fn fetch_post(store: &MemoryDocumentStore, id: Uuid) -> Post {
    GetPost { store }.execute(id).await.unwrap().unwrap()
}

async fn index_entry(
    store: &MemoryDocumentStore,
    lang: &str,
    slug: &str,
) -> Option<SlugIndexEntry> {
    store
        .get(SLUG_INDEX_COLLECTION, &slug_key(lang, slug))
        .await
        .unwrap()
        .map(|v| serde_json::from_value(v).unwrap())
}

fn languages_update(langs: &[(&str, &str)]) -> UpdatePostInput {
    UpdatePostInput {
        languages: Some(
            langs
                .iter()
                .map(|(lang, slug)| (lang.to_string(), lang_input("Title", slug)))
                .collect(),
        ),
        ..Default::default()
    }
}

/// Checks the global invariant both ways: every entry points at a post
/// carrying that slug, and every non-empty post slug has its entry.
async fn assert_index_consistent(store: &MemoryDocumentStore) {
    let posts: Vec<Post> = store
        .query(POSTS_COLLECTION, &Query::default())
        .await
        .unwrap()
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap())
        .collect();
    let entries: Vec<SlugIndexEntry> = store
        .query(SLUG_INDEX_COLLECTION, &Query::default())
        .await
        .unwrap()
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap())
        .collect();

    for entry in &entries {
        let owner = posts
            .iter()
            .find(|p| p.id == entry.post_id)
            .unwrap_or_else(|| panic!("orphan entry {}_{}", entry.lang, entry.slug));
        assert_eq!(owner.languages[&entry.lang].slug, entry.slug);
    }
    for post in &posts {
        for (lang, slug) in post.owned_slugs() {
            let entry = entries
                .iter()
                .find(|e| e.lang == lang && e.slug == slug)
                .unwrap_or_else(|| panic!("missing entry for {}_{}", lang, slug));
            assert_eq!(entry.post_id, post.id);
        }
    }
    let mut seen = HashSet::new();
    for entry in &entries {
        assert!(
            seen.insert((entry.lang.clone(), entry.slug.clone())),
            "duplicate entry {}_{}",
            entry.lang,
            entry.slug
        );
    }
}

fn blog_err(err: &anyhow::Error) -> &BlogError {
    err.downcast_ref::<BlogError>().expect("typed blog error")
}

#[tokio::test]
async fn create_claims_every_declared_slug() {
    let store = MemoryDocumentStore::new();
    let id = create(&store, &[("en", "breaking-news"), ("es", "noticias")]).await;

    let en = index_entry(&store, "en", "breaking-news").await.unwrap();
    assert_eq!(en.post_id, id);
    let es = index_entry(&store, "es", "noticias").await.unwrap();
    assert_eq!(es.post_id, id);
    assert_index_consistent(&store).await;
}

#[tokio::test]
async fn create_sanitizes_slugs() {
    let store = MemoryDocumentStore::new();
    let id = create(&store, &[("en", "Breaking News!")]).await;
    let post = fetch_post(&store, id).await;
    assert_eq!(post.languages["en"].slug, "breaking-news");
    assert!(index_entry(&store, "en", "breaking-news").await.is_some());
}

#[tokio::test]
async fn create_conflict_writes_nothing() {
    let store = MemoryDocumentStore::new();
    create(&store, &[("en", "breaking-news")]).await;

    let err = CreatePost { store: &store }
        .execute(
            create_input(&[("en", "breaking-news"), ("fr", "fresh-slug")]),
            author(),
        )
        .await
        .unwrap_err();
    match blog_err(&err) {
        BlogError::SlugTaken { lang, slug } => {
            assert_eq!(lang, "en");
            assert_eq!(slug, "breaking-news");
        }
        other => panic!("unexpected error {:?}", other),
    }

    // the losing create left neither a post nor any entry behind
    let posts = store.query(POSTS_COLLECTION, &Query::default()).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert!(index_entry(&store, "fr", "fresh-slug").await.is_none());
    assert_index_consistent(&store).await;
}

#[tokio::test]
async fn concurrent_creates_one_winner() {
    let store = MemoryDocumentStore::new();
    let uc_a = CreatePost { store: &store };
    let uc_b = CreatePost { store: &store };
    let a = uc_a.execute(create_input(&[("en", "breaking-news")]), author());
    let b = uc_b.execute(create_input(&[("en", "breaking-news")]), author());
    let (ra, rb) = tokio::join!(a, b);

    let winners: Vec<Uuid> = [&ra, &rb].iter().filter_map(|r| r.as_ref().ok().copied()).collect();
    assert_eq!(winners.len(), 1, "exactly one create must win");
    let loser = if ra.is_ok() { rb } else { ra };
    assert!(matches!(
        blog_err(&loser.unwrap_err()),
        BlogError::SlugTaken { .. }
    ));

    let entry = index_entry(&store, "en", "breaking-news").await.unwrap();
    assert_eq!(entry.post_id, winners[0]);
    assert_index_consistent(&store).await;
}

#[tokio::test]
async fn validation_rejects_empty_language_map() {
    let store = MemoryDocumentStore::new();
    let err = CreatePost { store: &store }
        .execute(CreatePostInput::default(), author())
        .await
        .unwrap_err();
    assert!(matches!(blog_err(&err), BlogError::Validation(_)));
}

#[tokio::test]
async fn validation_rejects_shared_slug_across_languages() {
    let store = MemoryDocumentStore::new();
    let err = CreatePost { store: &store }
        .execute(create_input(&[("en", "same"), ("es", "same")]), author())
        .await
        .unwrap_err();
    assert!(matches!(blog_err(&err), BlogError::Validation(_)));
}

#[tokio::test]
async fn slug_change_releases_old_and_claims_new() {
    let store = MemoryDocumentStore::new();
    let id = create(&store, &[("en", "old-slug")]).await;

    UpdatePost { store: &store }
        .execute(id, languages_update(&[("en", "new-slug")]))
        .await
        .unwrap();

    let check = CheckSlugAvailability { store: &store };
    assert!(check.execute("en", "old-slug", None).await.unwrap());
    assert!(!check.execute("en", "new-slug", None).await.unwrap());
    // self-ownership reads as available for edit flows
    assert!(check.execute("en", "new-slug", Some(id)).await.unwrap());
    assert_index_consistent(&store).await;
}

#[tokio::test]
async fn update_to_taken_slug_changes_nothing() {
    let store = MemoryDocumentStore::new();
    let holder = create(&store, &[("en", "taken")]).await;
    let editor = create(&store, &[("en", "mine")]).await;
    let before = store
        .get(POSTS_COLLECTION, &editor.to_string())
        .await
        .unwrap()
        .unwrap();

    let err = UpdatePost { store: &store }
        .execute(editor, languages_update(&[("en", "taken")]))
        .await
        .unwrap_err();
    assert!(matches!(blog_err(&err), BlogError::SlugTaken { .. }));

    let after = store
        .get(POSTS_COLLECTION, &editor.to_string())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(before, after, "failed update must not touch the post");
    assert_eq!(
        index_entry(&store, "en", "taken").await.unwrap().post_id,
        holder
    );
    assert_eq!(
        index_entry(&store, "en", "mine").await.unwrap().post_id,
        editor
    );
    assert_index_consistent(&store).await;
}

#[tokio::test]
async fn keeping_the_same_slug_is_a_noop_for_the_index() {
    let store = MemoryDocumentStore::new();
    let id = create(&store, &[("en", "stable")]).await;
    let claimed_at = index_entry(&store, "en", "stable").await.unwrap().claimed_at;

    UpdatePost { store: &store }
        .execute(id, languages_update(&[("en", "stable")]))
        .await
        .unwrap();

    let entry = index_entry(&store, "en", "stable").await.unwrap();
    assert_eq!(entry.post_id, id);
    assert_eq!(entry.claimed_at, claimed_at);
}

#[tokio::test]
async fn removing_a_language_releases_only_its_entry() {
    let store = MemoryDocumentStore::new();
    let id = create(&store, &[("en", "alpha"), ("es", "beta")]).await;

    UpdatePost { store: &store }
        .execute(id, languages_update(&[("en", "alpha")]))
        .await
        .unwrap();

    assert!(index_entry(&store, "es", "beta").await.is_none());
    let en = index_entry(&store, "en", "alpha").await.unwrap();
    assert_eq!(en.post_id, id);
    let post = fetch_post(&store, id).await;
    assert!(!post.languages.contains_key("es"));
    assert_index_consistent(&store).await;
}

#[tokio::test]
async fn removing_all_languages_is_rejected() {
    let store = MemoryDocumentStore::new();
    let id = create(&store, &[("en", "alpha")]).await;
    let err = UpdatePost { store: &store }
        .execute(
            id,
            UpdatePostInput {
                languages: Some(BTreeMap::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(blog_err(&err), BlogError::LastLanguageRemoval));
    assert!(index_entry(&store, "en", "alpha").await.is_some());
}

#[tokio::test]
async fn update_of_missing_post_fails() {
    let store = MemoryDocumentStore::new();
    let err = UpdatePost { store: &store }
        .execute(Uuid::new_v4(), languages_update(&[("en", "x")]))
        .await
        .unwrap_err();
    assert!(matches!(blog_err(&err), BlogError::PostNotFound { .. }));
}

#[tokio::test]
async fn taxonomy_only_update_leaves_index_alone() {
    let store = MemoryDocumentStore::new();
    let id = create(&store, &[("en", "alpha")]).await;

    UpdatePost { store: &store }
        .execute(
            id,
            UpdatePostInput {
                category: Some(Some("macro".into())),
                tags: Some(vec!["usd".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let post = fetch_post(&store, id).await;
    assert_eq!(post.category.as_deref(), Some("macro"));
    assert_eq!(post.insight_keys, vec!["category:macro".to_string()]);
    assert_eq!(
        index_entry(&store, "en", "alpha").await.unwrap().post_id,
        id
    );
}

#[tokio::test]
async fn delete_releases_every_entry_with_the_post() {
    let store = MemoryDocumentStore::new();
    let id = create(&store, &[("en", "alpha"), ("es", "beta")]).await;

    DeletePost { store: &store }.execute(id).await.unwrap();

    assert!(store.get(POSTS_COLLECTION, &id.to_string()).await.unwrap().is_none());
    assert!(index_entry(&store, "en", "alpha").await.is_none());
    assert!(index_entry(&store, "es", "beta").await.is_none());
    assert_index_consistent(&store).await;

    let err = DeletePost { store: &store }.execute(id).await.unwrap_err();
    assert!(matches!(blog_err(&err), BlogError::PostNotFound { .. }));
}

#[tokio::test]
async fn publish_timestamp_is_idempotent() {
    let store = MemoryDocumentStore::new();
    let id = create(&store, &[("en", "alpha")]).await;

    PublishPost { store: &store }.execute(id).await.unwrap();
    let first = fetch_post(&store, id).await;
    assert_eq!(first.status, PostStatus::Published);
    let published_at = first.published_at.expect("publish sets timestamp");
    assert!(!first.languages["en"].search_tokens.is_empty());

    PublishPost { store: &store }.execute(id).await.unwrap();
    let second = fetch_post(&store, id).await;
    assert_eq!(second.published_at, Some(published_at));
}

#[tokio::test]
async fn publish_requires_complete_language() {
    let store = MemoryDocumentStore::new();
    let mut input = create_input(&[("en", "alpha")]);
    input.languages.get_mut("en").unwrap().content_html = String::new();
    let id = CreatePost { store: &store }
        .execute(input, author())
        .await
        .unwrap();

    let err = PublishPost { store: &store }.execute(id).await.unwrap_err();
    assert!(matches!(blog_err(&err), BlogError::Validation(_)));
    let post = fetch_post(&store, id).await;
    assert_eq!(post.status, PostStatus::Draft);
    assert!(post.published_at.is_none());
}

#[tokio::test]
async fn unpublish_keeps_publish_timestamp() {
    let store = MemoryDocumentStore::new();
    let id = create(&store, &[("en", "alpha")]).await;
    PublishPost { store: &store }.execute(id).await.unwrap();
    let published_at = fetch_post(&store, id).await.published_at;

    UnpublishPost { store: &store }.execute(id).await.unwrap();
    let post = fetch_post(&store, id).await;
    assert_eq!(post.status, PostStatus::Unpublished);
    assert_eq!(post.published_at, published_at);
}

#[tokio::test]
async fn duplicate_appends_copy_suffix_and_strips_state() {
    let store = MemoryDocumentStore::new();
    let source = create(&store, &[("en", "my-article")]).await;
    store
        .update(
            POSTS_COLLECTION,
            &source.to_string(),
            json!({"viewCount": 7, "relatedPostIds": [Uuid::new_v4()]}),
        )
        .await
        .unwrap();
    PublishPost { store: &store }.execute(source).await.unwrap();

    let copy_id = DuplicatePost { store: &store }
        .execute(source, author())
        .await
        .unwrap();
    let copy = fetch_post(&store, copy_id).await;
    assert_eq!(copy.languages["en"].slug, "my-article-copy");
    assert_eq!(copy.status, PostStatus::Draft);
    assert!(copy.published_at.is_none());
    assert_eq!(copy.view_count, 0);
    assert!(copy.related_post_ids.is_empty());
    assert_index_consistent(&store).await;
}

#[tokio::test]
async fn duplicate_increments_suffix_when_copy_is_taken() {
    let store = MemoryDocumentStore::new();
    let source = create(&store, &[("en", "my-article")]).await;
    create(&store, &[("en", "my-article-copy")]).await;

    let copy_id = DuplicatePost { store: &store }
        .execute(source, author())
        .await
        .unwrap();
    assert_eq!(
        fetch_post(&store, copy_id).await.languages["en"].slug,
        "my-article-copy-1"
    );
    assert_index_consistent(&store).await;
}

#[tokio::test]
async fn duplicate_gives_up_after_the_suffix_bound() {
    let store = MemoryDocumentStore::new();
    let source = create(&store, &[("en", "hot")]).await;

    // occupy the whole candidate window with foreign claims
    let foreign = Uuid::new_v4();
    let mut slugs = vec!["hot-copy".to_string()];
    slugs.extend((1..=100).map(|n| format!("hot-copy-{}", n)));
    for slug in &slugs {
        store
            .set(
                SLUG_INDEX_COLLECTION,
                &slug_key("en", slug),
                json!({
                    "postId": foreign,
                    "lang": "en",
                    "slug": slug,
                    "claimedAt": chrono::Utc::now(),
                }),
            )
            .await
            .unwrap();
    }

    let err = DuplicatePost { store: &store }
        .execute(source, author())
        .await
        .unwrap_err();
    assert!(matches!(
        blog_err(&err),
        BlogError::SlugAllocationExhausted { .. }
    ));
}

#[tokio::test]
async fn duplicate_of_missing_post_fails() {
    let store = MemoryDocumentStore::new();
    let err = DuplicatePost { store: &store }
        .execute(Uuid::new_v4(), author())
        .await
        .unwrap_err();
    assert!(matches!(blog_err(&err), BlogError::PostNotFound { .. }));
}

#[tokio::test]
async fn list_filters_by_status() {
    let store = MemoryDocumentStore::new();
    let published = create(&store, &[("en", "a")]).await;
    PublishPost { store: &store }.execute(published).await.unwrap();
    create(&store, &[("en", "b")]).await;

    let only_published = ListPosts { store: &store }
        .execute(Some(PostStatus::Published), None, None)
        .await
        .unwrap();
    assert_eq!(only_published.len(), 1);
    assert_eq!(only_published[0].id, published);

    let all = ListPosts { store: &store }.execute(None, None, None).await.unwrap();
    assert_eq!(all.len(), 2);
}

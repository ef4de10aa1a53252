pub mod error;
pub mod post;
pub mod slug;

/// Canonical post documents.
pub const POSTS_COLLECTION: &str = "blogPosts";
/// Secondary index mapping `"<lang>_<slug>"` to the owning post.
pub const SLUG_INDEX_COLLECTION: &str = "blogSlugIndex";

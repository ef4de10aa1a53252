use uuid::Uuid;

/// Failure modes of the post mutation operations. Carried through `anyhow`
/// and downcast at the HTTP boundary for status mapping.
#[derive(thiserror::Error, Debug)]
pub enum BlogError {
    #[error("slug '{slug}' is already taken for language '{lang}'")]
    SlugTaken { lang: String, slug: String },

    #[error("post {id} not found")]
    PostNotFound { id: Uuid },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("could not allocate a free copy slug for '{base}' in language '{lang}'")]
    SlugAllocationExhausted { lang: String, base: String },

    #[error("a post must keep at least one language")]
    LastLanguageRemoval,
}

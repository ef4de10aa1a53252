use uuid::Uuid;

use crate::application::ports::document_store::DocumentStore;
use crate::application::services::slug::is_slug_available;
use crate::domain::posts::slug::sanitize_slug;

pub struct CheckSlugAvailability<'a, S: DocumentStore + ?Sized> {
    pub store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> CheckSlugAvailability<'a, S> {
    /// Best-effort pre-check for editor UIs. The mutating transaction
    /// re-verifies, so a `true` here can still lose a race.
    pub async fn execute(
        &self,
        lang: &str,
        slug: &str,
        exclude_post_id: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let normalized = sanitize_slug(slug);
        if normalized.is_empty() {
            // an empty slug claims nothing
            return Ok(true);
        }
        is_slug_available(self.store, lang, &normalized, exclude_post_id).await
    }
}

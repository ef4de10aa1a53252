pub mod check_slug;
pub mod create_post;
pub mod delete_post;
pub mod duplicate_post;
pub mod get_post;
pub mod list_posts;
pub mod publish_post;
pub mod related_posts;
pub mod unpublish_post;
pub mod update_post;

use std::collections::BTreeMap;

use crate::application::services::indexing;
use crate::domain::posts::error::BlogError;
use crate::domain::posts::post::{CoverImage, LanguageContent};
use crate::domain::posts::slug::sanitize_slug;

/// Author-editable fields of one language block. Slugs are normalized and
/// search tokens derived when the block is turned into domain content.
#[derive(Debug, Clone)]
pub struct LanguageContentInput {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content_html: String,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub cover_image: Option<CoverImage>,
}

pub(crate) fn build_languages(
    inputs: &BTreeMap<String, LanguageContentInput>,
) -> anyhow::Result<BTreeMap<String, LanguageContent>> {
    let mut languages = BTreeMap::new();
    for (lang, input) in inputs {
        let mut lc = LanguageContent {
            title: input.title.clone(),
            slug: sanitize_slug(&input.slug),
            excerpt: input.excerpt.clone(),
            content_html: input.content_html.clone(),
            seo_title: input.seo_title.clone(),
            seo_description: input.seo_description.clone(),
            cover_image: input.cover_image.clone(),
            search_tokens: Vec::new(),
        };
        lc.search_tokens = indexing::search_tokens(&lc);
        languages.insert(lang.clone(), lc);
    }
    validate_distinct_slugs(&languages)?;
    Ok(languages)
}

/// Two language blocks of one post may not share a slug value; the index
/// keys would stay distinct, but self-ownership checks on update would
/// become ambiguous.
fn validate_distinct_slugs(
    languages: &BTreeMap<String, LanguageContent>,
) -> anyhow::Result<()> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for (lang, lc) in languages {
        if lc.slug.is_empty() {
            continue;
        }
        if let Some(other) = seen.insert(lc.slug.as_str(), lang.as_str()) {
            return Err(BlogError::Validation(format!(
                "languages '{}' and '{}' share slug '{}'",
                other, lang, lc.slug
            ))
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;

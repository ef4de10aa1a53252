//! Derived-field computation: per-language search tokens and the post's
//! insight keys. Both are recomputed whenever post content is written and
//! again on publish; they are never authored directly.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::posts::post::{LanguageContent, Post};

static TOKEN_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

const MIN_TOKEN_LEN: usize = 2;

/// Lowercased, deduplicated token set from title, excerpt and SEO fields.
pub fn search_tokens(lc: &LanguageContent) -> Vec<String> {
    let mut tokens = BTreeSet::new();
    let sources = [
        lc.title.as_str(),
        lc.excerpt.as_str(),
        lc.seo_title.as_deref().unwrap_or(""),
        lc.seo_description.as_deref().unwrap_or(""),
    ];
    for source in sources {
        for token in TOKEN_SPLIT.split(&source.to_lowercase()) {
            if token.len() >= MIN_TOKEN_LEN {
                tokens.insert(token.to_string());
            }
        }
    }
    tokens.into_iter().collect()
}

/// Keys linking a post to taxonomy dimensions, used by the related-post
/// scorer and the session-clock insight panel.
pub fn insight_keys(post: &Post) -> Vec<String> {
    let mut keys = BTreeSet::new();
    if let Some(category) = &post.category {
        keys.insert(format!("category:{}", category.to_lowercase()));
    }
    for tag in &post.event_tags {
        keys.insert(format!("event:{}", tag.to_lowercase()));
    }
    for tag in &post.currency_tags {
        keys.insert(format!("currency:{}", tag.to_lowercase()));
    }
    keys.into_iter().collect()
}

//! Related-post relevance scoring: weighted taxonomy overlap with a
//! recency decay, view-count tie-breaking, and unread-first ordering.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::posts::post::Post;

const CATEGORY_WEIGHT: f64 = 3.0;
const EVENT_TAG_WEIGHT: f64 = 2.5;
const CURRENCY_TAG_WEIGHT: f64 = 2.0;
const TAG_WEIGHT: f64 = 1.5;
const KEYWORD_WEIGHT: f64 = 1.0;
const EXPLICIT_LINK_WEIGHT: f64 = 4.0;
const RECENCY_WEIGHT: f64 = 1.5;
const RECENCY_WINDOW_DAYS: f64 = 30.0;

fn overlap(a: &[String], b: &[String]) -> usize {
    let set: HashSet<&str> = a.iter().map(String::as_str).collect();
    b.iter().filter(|v| set.contains(v.as_str())).count()
}

/// Relevance of `candidate` with respect to `subject` at time `now`.
pub fn relevance_score(subject: &Post, candidate: &Post, now: DateTime<Utc>) -> f64 {
    let mut score = 0.0;

    if subject.category.is_some() && subject.category == candidate.category {
        score += CATEGORY_WEIGHT;
    }
    score += EVENT_TAG_WEIGHT * overlap(&subject.event_tags, &candidate.event_tags) as f64;
    score += CURRENCY_TAG_WEIGHT * overlap(&subject.currency_tags, &candidate.currency_tags) as f64;
    score += TAG_WEIGHT * overlap(&subject.tags, &candidate.tags) as f64;
    score += KEYWORD_WEIGHT * overlap(&subject.keywords, &candidate.keywords) as f64;
    if subject.related_post_ids.contains(&candidate.id) {
        score += EXPLICIT_LINK_WEIGHT;
    }

    if let Some(published_at) = candidate.published_at {
        let age_days = (now - published_at).num_hours() as f64 / 24.0;
        let freshness = ((RECENCY_WINDOW_DAYS - age_days) / RECENCY_WINDOW_DAYS).clamp(0.0, 1.0);
        score += RECENCY_WEIGHT * freshness;
    }

    score
}

/// Orders candidates for the "related posts" rail: unread before read, then
/// relevance, then view count as the engagement tie-break. The subject
/// itself is excluded.
pub fn rank_related(
    subject: &Post,
    candidates: &[Post],
    read_ids: &HashSet<Uuid>,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<Uuid> {
    let mut scored: Vec<(bool, f64, i64, Uuid)> = candidates
        .iter()
        .filter(|c| c.id != subject.id)
        .map(|c| {
            (
                read_ids.contains(&c.id),
                relevance_score(subject, c, now),
                c.view_count,
                c.id,
            )
        })
        .collect();

    scored.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then(b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
            .then(b.2.cmp(&a.2))
    });

    scored.into_iter().take(limit).map(|(_, _, _, id)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::posts::post::{LanguageContent, PostStatus};
    use std::collections::BTreeMap;

    fn post(category: Option<&str>, tags: &[&str], views: i64) -> Post {
        let now = Utc::now();
        let mut languages = BTreeMap::new();
        languages.insert(
            "en".to_string(),
            LanguageContent {
                title: "t".into(),
                slug: format!("s-{}", Uuid::new_v4()),
                excerpt: String::new(),
                content_html: "<p>x</p>".into(),
                seo_title: None,
                seo_description: None,
                cover_image: None,
                search_tokens: vec![],
            },
        );
        Post {
            id: Uuid::new_v4(),
            status: PostStatus::Published,
            languages,
            category: category.map(str::to_string),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            keywords: vec![],
            event_tags: vec![],
            currency_tags: vec![],
            related_post_ids: vec![],
            author_ids: vec![],
            author: None,
            insight_keys: vec![],
            view_count: views,
            created_at: now,
            updated_at: now,
            published_at: Some(now),
        }
    }

    #[test]
    fn category_match_outranks_single_tag_match() {
        let subject = post(Some("macro"), &["usd"], 0);
        let same_category = post(Some("macro"), &[], 0);
        let same_tag = post(None, &["usd"], 0);
        let now = Utc::now();
        assert!(
            relevance_score(&subject, &same_category, now)
                > relevance_score(&subject, &same_tag, now)
        );
    }

    #[test]
    fn unread_candidates_come_first() {
        let subject = post(Some("macro"), &[], 0);
        let read = post(Some("macro"), &[], 100);
        let unread = post(None, &[], 0);
        let mut read_ids = HashSet::new();
        read_ids.insert(read.id);
        let ranked = rank_related(
            &subject,
            &[read.clone(), unread.clone()],
            &read_ids,
            Utc::now(),
            10,
        );
        assert_eq!(ranked, vec![unread.id, read.id]);
    }

    #[test]
    fn view_count_breaks_ties() {
        let subject = post(Some("macro"), &[], 0);
        let quiet = post(Some("macro"), &[], 1);
        let popular = post(Some("macro"), &[], 500);
        let ranked = rank_related(
            &subject,
            &[quiet.clone(), popular.clone()],
            &HashSet::new(),
            Utc::now(),
            10,
        );
        assert_eq!(ranked[0], popular.id);
    }
}

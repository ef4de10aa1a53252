//! Slug allocation protocol.
//!
//! Posts carry one URL slug per language; the `blogSlugIndex` collection
//! mirrors every non-empty `(lang, slug)` pair as a document keyed
//! `"<lang>_<slug>"` pointing at the owning post. All mutations of that
//! index happen inside store transactions, and because the store requires
//! every read of a transaction to precede its first write, the protocol is
//! structured in two explicit phases: collect all index reads into memory,
//! then derive and stage all writes from the collected results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::application::ports::document_store::{DocumentStore, StoreTransaction, TransactionBody};
use crate::domain::posts::error::BlogError;
use crate::domain::posts::post::{LanguageContent, Post, SlugIndexEntry};
use crate::domain::posts::slug::slug_key;
use crate::domain::posts::SLUG_INDEX_COLLECTION;

/// Bound on the `-copy-N` suffix search of post duplication.
pub const MAX_COPY_ATTEMPTS: u32 = 100;

/// Best-effort availability probe against the index. An entry owned by
/// `exclude_post_id` counts as available so that a post editing itself is
/// not blocked by its own claim. The authoritative check happens inside
/// the mutating transaction; this one can race.
pub async fn is_slug_available<S: DocumentStore + ?Sized>(
    store: &S,
    lang: &str,
    slug: &str,
    exclude_post_id: Option<Uuid>,
) -> anyhow::Result<bool> {
    let existing = store
        .get(SLUG_INDEX_COLLECTION, &slug_key(lang, slug))
        .await?;
    match existing {
        None => Ok(true),
        Some(value) => {
            let entry: SlugIndexEntry = serde_json::from_value(value)?;
            Ok(exclude_post_id == Some(entry.post_id))
        }
    }
}

/// Finds a free `<base>-copy` / `<base>-copy-N` slug for a duplicated post.
/// The probes are non-transactional; the claiming transaction re-verifies
/// every candidate it writes, so a lost race aborts there instead of
/// corrupting the index.
pub async fn next_copy_slug<S: DocumentStore + ?Sized>(
    store: &S,
    lang: &str,
    base: &str,
) -> anyhow::Result<String> {
    let first = format!("{}-copy", base);
    if is_slug_available(store, lang, &first, None).await? {
        return Ok(first);
    }
    for n in 1..=MAX_COPY_ATTEMPTS {
        let candidate = format!("{}-copy-{}", base, n);
        if is_slug_available(store, lang, &candidate, None).await? {
            return Ok(candidate);
        }
    }
    Err(BlogError::SlugAllocationExhausted {
        lang: lang.to_string(),
        base: base.to_string(),
    }
    .into())
}

fn entry_doc(post_id: Uuid, lang: &str, slug: &str, claimed_at: DateTime<Utc>) -> Value {
    serde_json::to_value(SlugIndexEntry {
        post_id,
        lang: lang.to_string(),
        slug: slug.to_string(),
        claimed_at,
    })
    .expect("slug index entry serializes")
}

/// A language whose slug value changes: the old entry (if any) is released
/// and the new one claimed.
#[derive(Debug, Clone)]
pub struct SlugChange {
    pub lang: String,
    pub old_slug: Option<String>,
    pub new_slug: String,
}

/// An entry released with no replacement: the language block was removed,
/// or its slug was cleared.
#[derive(Debug, Clone)]
pub struct SlugRelease {
    pub lang: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default)]
pub struct SlugPlan {
    pub changes: Vec<SlugChange>,
    pub releases: Vec<SlugRelease>,
}

impl SlugPlan {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.releases.is_empty()
    }
}

/// Diffs the current post languages against the replacement map. Pure; the
/// caller runs it inside the transaction after reading the post so the plan
/// reflects the state the transaction will commit against.
pub fn plan_slug_changes(
    current: &Post,
    new_languages: &BTreeMap<String, LanguageContent>,
) -> SlugPlan {
    let mut plan = SlugPlan::default();

    for (lang, lc) in new_languages {
        let old_slug = current
            .languages
            .get(lang)
            .map(|cur| cur.slug.as_str())
            .filter(|s| !s.is_empty());
        if lc.slug.is_empty() {
            if let Some(old) = old_slug {
                plan.releases.push(SlugRelease {
                    lang: lang.clone(),
                    slug: old.to_string(),
                });
            }
        } else if old_slug != Some(lc.slug.as_str()) {
            plan.changes.push(SlugChange {
                lang: lang.clone(),
                old_slug: old_slug.map(str::to_string),
                new_slug: lc.slug.clone(),
            });
        }
    }

    for (lang, lc) in &current.languages {
        if !new_languages.contains_key(lang) && !lc.slug.is_empty() {
            plan.releases.push(SlugRelease {
                lang: lang.clone(),
                slug: lc.slug.clone(),
            });
        }
    }

    plan
}

/// Result of a Phase-1 read of one claim target.
#[derive(Debug)]
pub struct TargetEntry {
    pub lang: String,
    pub slug: String,
    pub existing: Option<SlugIndexEntry>,
}

/// Phase 1: read the index entry for every slug the plan claims. Must run
/// before any write is staged on the transaction.
pub async fn read_claim_targets(
    tx: &mut dyn StoreTransaction,
    changes: &[SlugChange],
) -> anyhow::Result<Vec<TargetEntry>> {
    let mut targets = Vec::with_capacity(changes.len());
    for change in changes {
        let key = slug_key(&change.lang, &change.new_slug);
        let existing = match tx.get(SLUG_INDEX_COLLECTION, &key).await? {
            Some(value) => Some(serde_json::from_value(value)?),
            None => None,
        };
        targets.push(TargetEntry {
            lang: change.lang.clone(),
            slug: change.new_slug.clone(),
            existing,
        });
    }
    Ok(targets)
}

/// Phase 2: verify every claim target is free or self-owned, then stage the
/// releases and claims. A foreign owner aborts the whole transaction with
/// `SlugTaken`; nothing staged before the abort becomes durable.
///
/// Released entries are deleted without an individual read: the transaction
/// already read the post document, which is the authority on what the post
/// owns.
pub fn apply_slug_plan(
    tx: &mut dyn StoreTransaction,
    post_id: Uuid,
    plan: &SlugPlan,
    targets: &[TargetEntry],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    for target in targets {
        if let Some(entry) = &target.existing {
            if entry.post_id != post_id {
                return Err(BlogError::SlugTaken {
                    lang: target.lang.clone(),
                    slug: target.slug.clone(),
                }
                .into());
            }
        }
    }

    for change in &plan.changes {
        if let Some(old) = &change.old_slug {
            tx.delete(SLUG_INDEX_COLLECTION, &slug_key(&change.lang, old));
        }
        tx.set(
            SLUG_INDEX_COLLECTION,
            &slug_key(&change.lang, &change.new_slug),
            entry_doc(post_id, &change.lang, &change.new_slug, now),
        );
    }
    for release in &plan.releases {
        tx.delete(SLUG_INDEX_COLLECTION, &slug_key(&release.lang, &release.slug));
    }
    Ok(())
}

/// Transaction body shared by post creation and duplication: claim every
/// declared slug, then write the new post document. Phase 1 reads all
/// targets; any existing entry aborts with `SlugTaken` (a freshly minted
/// post id cannot own anything yet).
pub struct ClaimSlugsAndWritePost {
    pub post_id: Uuid,
    pub post_doc: Value,
    pub claims: Vec<(String, String)>,
    pub now: DateTime<Utc>,
}

#[async_trait::async_trait]
impl TransactionBody for ClaimSlugsAndWritePost {
    async fn run(&self, tx: &mut dyn StoreTransaction) -> anyhow::Result<()> {
        let mut occupied: Option<(String, String)> = None;
        for (lang, slug) in &self.claims {
            let key = slug_key(lang, slug);
            if tx.get(SLUG_INDEX_COLLECTION, &key).await?.is_some() && occupied.is_none() {
                occupied = Some((lang.clone(), slug.clone()));
            }
        }
        if let Some((lang, slug)) = occupied {
            return Err(BlogError::SlugTaken { lang, slug }.into());
        }

        for (lang, slug) in &self.claims {
            tx.set(
                SLUG_INDEX_COLLECTION,
                &slug_key(lang, slug),
                entry_doc(self.post_id, lang, slug, self.now),
            );
        }
        tx.set(
            crate::domain::posts::POSTS_COLLECTION,
            &self.post_id.to_string(),
            self.post_doc.clone(),
        );
        Ok(())
    }
}

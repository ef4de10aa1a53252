use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());

/// Composite key of a slug index entry.
pub fn slug_key(lang: &str, slug: &str) -> String {
    format!("{}_{}", lang, slug)
}

/// Normalize a raw slug: lowercase, non-alphanumerics collapsed to single
/// dashes, leading/trailing dashes trimmed. An input with no usable
/// characters normalizes to the empty string (no index entry is claimed).
pub fn sanitize_slug(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let dashed = NON_SLUG_CHARS.replace_all(&lowered, "-");
    let collapsed = DASH_RUNS.replace_all(&dashed, "-");
    collapsed.trim_matches('-').to_string()
}

use crate::feed::Episode;
use chrono::DateTime;

const MAX_SLUG_LEN: usize = 100;
const NO_DATE: &str = "no-date";
const UNTITLED: &str = "untitled";

/// Derive the filesystem key for an episode: `{YYYY-MM-DD}-{slug}`.
///
/// Pure function of (title, published); identical inputs always yield the
/// same identity, which is what makes resumption across runs work. Two
/// different raw titles that slugify identically will collide; that is an
/// accepted tradeoff.
pub fn derive_identity(episode: &Episode) -> String {
    let date = normalize_date(episode.published.as_deref());
    let slug = slugify(episode.title.as_deref().unwrap_or(UNTITLED));
    format!("{}-{}", date, slug)
}

/// Parse an RFC-822-style feed date into `YYYY-MM-DD`, or `no-date` when
/// the field is absent or unparseable.
fn normalize_date(published: Option<&str>) -> String {
    published
        .and_then(|raw| DateTime::parse_from_rfc2822(raw).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| NO_DATE.to_string())
}

/// Lower-case the title, collapse every run of non-alphanumeric characters
/// to a single `-`, trim the ends, and cap the length.
fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut gap = false;

    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if gap && !slug.is_empty() {
                slug.push('-');
            }
            gap = false;
            slug.push(c);
        } else {
            gap = true;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}

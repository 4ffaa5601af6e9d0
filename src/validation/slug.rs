use once_cell::sync::Lazy;
use regex::Regex;

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\-\s]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Derives a URL-safe slug from a display name.
///
/// Lower-cases, drops everything outside `[a-z0-9-]` and whitespace, then
/// joins the remaining words with `-`. Collisions are a separate concern,
/// handled by the `unique` rule on the slug field.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let kept = DISALLOWED.replace_all(&lowered, "");
    WHITESPACE.replace_all(kept.trim(), "-").into_owned()
}

//! Heading slugs.

/// Prefix that keeps generated heading ids apart from ids in user HTML.
pub const HEADING_ID_PREFIX: &str = "heading-";

/// Slugify heading text: lowercase, drop everything but ASCII word
/// characters, whitespace and hyphens, then turn each run of whitespace and
/// hyphens into a single hyphen.
///
/// Non-ASCII letters are dropped, so `Café` becomes `caf`; deep links made
/// against other renderers of the same documents keep working.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for ch in text.to_lowercase().chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_hyphen {
                slug.push('-');
                pending_hyphen = false;
            }
            slug.push(ch);
        }
    }
    if pending_hyphen {
        slug.push('-');
    }
    slug
}

/// The element id for a heading with this text, or `None` if the text has
/// nothing to slug.
pub fn heading_id(text: &str) -> Option<String> {
    let slug = slugify(text);
    if slug.trim_matches('-').is_empty() {
        None
    } else {
        Some(format!("{HEADING_ID_PREFIX}{slug}"))
    }
}

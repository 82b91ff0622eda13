//! Identity and naming rules for mirrored artifacts.
//!
//! Pure functions mapping remote identifiers to stable local names: directory
//! pages, human-titled file slugs, alias entries, and human-readable sizes.
//! No state, no filesystem access.

/// Maximum length of a file slug before truncation.
const SLUG_MAX_CHARS: usize = 200;

/// Local filename for a directory page.
///
/// Collision-free by construction: directory identifiers are unique in the
/// source graph.
#[must_use]
pub fn page_filename(dir_id: &str) -> String {
    format!("docs_rep_{dir_id}.html")
}

/// Derives a filesystem-safe slug from a human file title.
///
/// Characters outside letters/digits/underscore/space/hyphen/period are
/// stripped, whitespace runs collapse to a single space, and titles longer
/// than 200 characters are truncated to 197 plus `...`.
#[must_use]
pub fn file_slug(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '-' | '.'))
        .collect();
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() > SLUG_MAX_CHARS {
        let truncated: String = collapsed.chars().take(SLUG_MAX_CHARS - 3).collect();
        format!("{truncated}...")
    } else {
        collapsed
    }
}

/// Appends the real extension discovered after download, unless the slug
/// already carries it.
///
/// `ext` includes the leading dot (`.pdf`); an empty extension is a no-op.
#[must_use]
pub fn ensure_extension(slug: &str, ext: &str) -> String {
    if ext.is_empty() || slug.ends_with(ext) {
        slug.to_string()
    } else {
        format!("{slug}{ext}")
    }
}

/// Formats a byte count the way the mapping files record it.
///
/// Truncating integer division, no rounding: `octets` below 1 Ki, `Ko` below
/// 1 Mi, `Mo` above.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KI: u64 = 1024;
    const MI: u64 = 1024 * 1024;

    if bytes < KI {
        format!("{bytes} octets")
    } else if bytes < MI {
        format!("{} Ko", bytes / KI)
    } else {
        format!("{} Mo", bytes / MI)
    }
}

//! Heading anchor generation.

/// Convert heading text to a slug suitable for use as an HTML id.
///
/// Lowercases, turns whitespace into hyphens, keeps Unicode letters and
/// digits, drops punctuation, collapses hyphen runs and trims hyphens from
/// both ends. Text made only of punctuation yields an empty slug.
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut pending_hyphen = false;

    for c in s.chars() {
        if c.is_whitespace() || c == '-' {
            pending_hyphen = !slug.is_empty();
        } else if c.is_alphanumeric() {
            if pending_hyphen {
                slug.push('-');
                pending_hyphen = false;
            }
            slug.extend(c.to_lowercase());
        }
    }

    slug
}

//! Helpers for scanning text that already contains generated markup.
//!
//! Document text is escaped by the block stage, so every raw `<` left in
//! the content starts a tag the pipeline generated itself.

use super::placeholder::{parse_token, skip_token};

/// Tags that delimit blocks. Inline matching never crosses one of these.
const BLOCK_TAGS: &[&str] = &[
    "blockquote",
    "div",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "li",
    "ol",
    "pre",
    "table",
    "tbody",
    "td",
    "th",
    "thead",
    "tr",
    "ul",
];

/// A piece of partially converted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    /// Block markup, block placeholders and paragraph breaks, copied as is.
    Markup(&'a str),
    /// A run of inline text between block boundaries.
    Text(&'a str),
}

/// Byte offset just past the tag starting at `pos`.
pub(crate) fn skip_tag(text: &str, pos: usize) -> usize {
    text[pos..].find('>').map_or(text.len(), |end| pos + end + 1)
}

/// Name of the tag starting at `pos`, without a leading `/`.
pub(crate) fn tag_name(text: &str, pos: usize) -> &str {
    let rest = text[pos..].strip_prefix('<').unwrap_or("");
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    let len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    &rest[..len]
}

fn is_block_tag(name: &str) -> bool {
    BLOCK_TAGS.contains(&name)
}

/// Whether a line starts with block-level markup.
pub(crate) fn starts_with_block_tag(line: &str) -> bool {
    line.starts_with('<') && is_block_tag(tag_name(line, 0))
}

/// Remove every tag, keeping text and placeholders.
pub(crate) fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let end = skip_tag(rest, pos);
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

/// Split content into inline text runs and the block markup separating them.
///
/// Boundaries are block tags, block placeholders and blank lines.
pub(crate) fn segments(text: &str) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let boundary_end = match bytes[i] {
            b'<' if is_block_tag(tag_name(text, i)) => Some(skip_tag(text, i)),
            0 => match parse_token(&text[i..]) {
                Some(token) if token.kind.is_block() => Some(i + token.len),
                _ => {
                    i = skip_token(text, i);
                    continue;
                }
            },
            b'\n' if bytes.get(i + 1) == Some(&b'\n') => Some(i + 1),
            _ => None,
        };

        match boundary_end {
            Some(end) => {
                if start < i {
                    out.push(Segment::Text(&text[start..i]));
                }
                out.push(Segment::Markup(&text[i..end]));
                start = end;
                i = end;
            }
            None => i += 1,
        }
    }

    if start < text.len() {
        out.push(Segment::Text(&text[start..]));
    }
    out
}

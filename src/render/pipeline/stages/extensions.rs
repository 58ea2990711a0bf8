//! Extension syntax and paragraph wrapping.
//!
//! Handles footnotes, `==highlight==`, `^superscript^` and `~subscript~`,
//! then wraps loose text into paragraphs.

use crate::render::pipeline::markup::{skip_tag, starts_with_block_tag};
use crate::render::pipeline::placeholder::{is_block_token_line, parse_token, skip_token};
use crate::render::pipeline::{PipelineContext, ProcessingDocument, Stage};

/// Stage that converts extension syntax and wraps paragraphs.
pub struct ExtensionStage;

impl Stage for ExtensionStage {
    fn name(&self) -> &'static str {
        "extensions"
    }

    fn process(&self, doc: &mut ProcessingDocument, _ctx: &mut PipelineContext) {
        let converted: Vec<String> = doc.content.split('\n').map(convert_line).collect();
        doc.content = wrap_paragraphs(&converted.join("\n"));
    }
}

fn convert_line(line: &str) -> String {
    match footnote_definition(line) {
        Some((id, text)) => format!(
            r##"<div class="footnote" id="fn{id}"><sup>{id}</sup> {} <a href="#fnref{id}">↩</a></div>"##,
            convert_spans(text)
        ),
        None => convert_spans(line),
    }
}

fn convert_spans(text: &str) -> String {
    let text = footnote_references(text);
    let text = convert_pairs(&text, PairRule::HIGHLIGHT);
    let text = convert_pairs(&text, PairRule::SUPERSCRIPT);
    convert_pairs(&text, PairRule::SUBSCRIPT)
}

// ============================================================================
// Footnotes
// ============================================================================

fn is_footnote_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(|c: char| c.is_whitespace() || c == '[' || c == ']')
}

/// Parse `[^id]` at the start of `text`, returning the id and the rest.
fn footnote_label(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("[^")?;
    let end = rest.find(']')?;
    let id = &rest[..end];
    is_footnote_id(id).then(|| (id, &rest[end + 1..]))
}

/// A `[^id]: text` definition line.
fn footnote_definition(line: &str) -> Option<(&str, &str)> {
    let (id, rest) = footnote_label(line)?;
    let text = rest.strip_prefix(':')?;
    Some((id, text.trim()))
}

fn footnote_references(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("[^") {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        match footnote_label(candidate) {
            Some((id, after)) if !after.starts_with(':') => {
                out.push_str(&format!(
                    r##"<sup><a href="#fn{id}" id="fnref{id}">{id}</a></sup>"##
                ));
                rest = after;
            }
            _ => {
                out.push_str("[^");
                rest = &candidate[2..];
            }
        }
    }
    out.push_str(rest);
    out
}

// ============================================================================
// Paired markers
// ============================================================================

/// A marker that wraps content in a tag when it appears in pairs.
struct PairRule {
    marker: u8,
    /// Exact run length of the marker.
    len: usize,
    tag: &'static str,
    /// Tight content may not contain whitespace.
    tight: bool,
}

impl PairRule {
    const HIGHLIGHT: PairRule = PairRule {
        marker: b'=',
        len: 2,
        tag: "mark",
        tight: false,
    };
    const SUPERSCRIPT: PairRule = PairRule {
        marker: b'^',
        len: 1,
        tag: "sup",
        tight: true,
    };
    // A single tilde only, so strikethrough runs never match
    const SUBSCRIPT: PairRule = PairRule {
        marker: b'~',
        len: 1,
        tag: "sub",
        tight: true,
    };
}

enum Close {
    At(usize),
    /// No candidate here, but a later opener may still match.
    Rejected,
    /// No marker run of the right length remains in the text.
    Exhausted,
}

fn run_at(bytes: &[u8], pos: usize, marker: u8) -> usize {
    bytes[pos..].iter().take_while(|&&b| b == marker).count()
}

fn find_close(text: &str, start: usize, rule: &PairRule) -> Close {
    let bytes = text.as_bytes();
    let mut j = start;
    while j < bytes.len() {
        let b = bytes[j];
        if rule.tight && (b.is_ascii_whitespace() || b == b'<') {
            return Close::Rejected;
        }
        match b {
            b'<' => j = skip_tag(text, j),
            0 => j = skip_token(text, j),
            _ if b == rule.marker => {
                let run = run_at(bytes, j, rule.marker);
                if run == rule.len {
                    let after_space = bytes[j - 1].is_ascii_whitespace();
                    return if j > start && !after_space {
                        Close::At(j)
                    } else {
                        Close::Rejected
                    };
                }
                if rule.tight {
                    return Close::Rejected;
                }
                j += run;
            }
            _ => j += 1,
        }
    }
    Close::Exhausted
}

fn convert_pairs(text: &str, rule: PairRule) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' => i = skip_tag(text, i),
            0 => i = skip_token(text, i),
            b if b == rule.marker => {
                let run = run_at(bytes, i, rule.marker);
                let opens = run == rule.len
                    && bytes
                        .get(i + run)
                        .is_some_and(|next| !next.is_ascii_whitespace());
                if !opens {
                    i += run;
                    continue;
                }
                match find_close(text, i + run, &rule) {
                    Close::At(close) => {
                        out.push_str(&text[last..i]);
                        out.push_str(&format!(
                            "<{tag}>{}</{tag}>",
                            &text[i + run..close],
                            tag = rule.tag
                        ));
                        i = close + run;
                        last = i;
                    }
                    Close::Rejected => i += run,
                    Close::Exhausted => break,
                }
            }
            _ => i += 1,
        }
    }

    out.push_str(&text[last..]);
    out
}

// ============================================================================
// Paragraphs
// ============================================================================

fn is_block_line(line: &str) -> bool {
    is_block_token_line(line) || starts_with_block_tag(line)
}

fn flush_paragraph(paragraph: &mut Vec<&str>, blocks: &mut Vec<String>) {
    if !paragraph.is_empty() {
        blocks.push(format!("<p>{}</p>", paragraph.join("<br>")));
        paragraph.clear();
    }
}

/// Split a line around block placeholders, so display math written inside
/// a sentence ends the paragraph instead of nesting in it.
fn split_block_tokens(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != 0 {
            i += 1;
            continue;
        }
        match parse_token(&line[i..]) {
            Some(token) if token.kind.is_block() => {
                pieces.push(line[start..i].trim());
                pieces.push(&line[i..i + token.len]);
                i += token.len;
                start = i;
            }
            _ => i = skip_token(line, i),
        }
    }
    pieces.push(line[start..].trim());
    pieces.retain(|piece| !piece.is_empty());
    pieces
}

/// Wrap runs of loose lines in `<p>`, joining their lines with `<br>`.
pub(crate) fn wrap_paragraphs(text: &str) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    for line in text.split('\n').map(str::trim) {
        if line.is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            continue;
        }
        if is_block_line(line) {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(line.to_string());
            continue;
        }
        for piece in split_block_tokens(line) {
            if is_block_line(piece) {
                flush_paragraph(&mut paragraph, &mut blocks);
                blocks.push(piece.to_string());
            } else {
                paragraph.push(piece);
            }
        }
    }
    flush_paragraph(&mut paragraph, &mut blocks);

    blocks.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_footnote_reference() {
        assert_eq!(
            convert_spans("claim[^1] here"),
            r##"claim<sup><a href="#fn1" id="fnref1">1</a></sup> here"##
        );
        assert_eq!(convert_spans("[^ x]"), "[^ x]");
        assert_eq!(convert_spans("[^]"), "[^]");
    }

    #[test]
    fn test_footnote_definition() {
        assert_eq!(
            convert_line("[^note]: The ==source== text"),
            r##"<div class="footnote" id="fnnote"><sup>note</sup> The <mark>source</mark> text <a href="#fnrefnote">↩</a></div>"##
        );
    }

    #[test]
    fn test_highlight() {
        assert_eq!(convert_spans("a ==b c== d"), "a <mark>b c</mark> d");
        assert_eq!(convert_spans("a == b == c"), "a == b == c");
        assert_eq!(convert_spans("x === y"), "x === y");
        assert_eq!(convert_spans("==open"), "==open");
    }

    #[test]
    fn test_superscript() {
        assert_eq!(convert_spans("x^2^ + y^10^"), "x<sup>2</sup> + y<sup>10</sup>");
        assert_eq!(convert_spans("a ^b c^"), "a ^b c^");
    }

    #[test]
    fn test_subscript_ignores_strikethrough() {
        assert_eq!(convert_spans("H~2~O"), "H<sub>2</sub>O");
        assert_eq!(convert_spans("<del>x</del> ~~y~~"), "<del>x</del> ~~y~~");
        assert_eq!(convert_spans("a~b~~c~"), "a~b~~c~");
    }

    #[test]
    fn test_markers_inside_tags_are_ignored() {
        assert_eq!(
            convert_spans(r#"<img alt="x^2^" src="a==b==">"#),
            r#"<img alt="x^2^" src="a==b==">"#
        );
    }

    #[test]
    fn test_wrap_paragraphs() {
        assert_eq!(wrap_paragraphs("one\ntwo\n\nthree"), "<p>one<br>two</p>\n<p>three</p>");
        assert_eq!(
            wrap_paragraphs("<h1 id=\"a\">A</h1>\ntext\n<hr>"),
            "<h1 id=\"a\">A</h1>\n<p>text</p>\n<hr>"
        );
        assert_eq!(wrap_paragraphs(""), "");
        assert_eq!(wrap_paragraphs("\n\n"), "");
    }

    #[test]
    fn test_inline_markup_lines_are_wrapped() {
        assert_eq!(
            wrap_paragraphs("<strong>bold</strong> start"),
            "<p><strong>bold</strong> start</p>"
        );
    }

    #[test]
    fn test_display_math_inside_a_line_splits_the_paragraph() {
        assert_eq!(
            wrap_paragraphs("before\ntext \u{0}D0\u{0} more"),
            "<p>before<br>text</p>\n\u{0}D0\u{0}\n<p>more</p>"
        );
        assert_eq!(
            wrap_paragraphs("inline \u{0}M0\u{0} stays"),
            "<p>inline \u{0}M0\u{0} stays</p>"
        );
        assert_eq!(
            wrap_paragraphs("<li>a \u{0}D0\u{0}</li>"),
            "<li>a \u{0}D0\u{0}</li>"
        );
    }

    #[test]
    fn test_block_placeholder_is_not_wrapped() {
        assert_eq!(wrap_paragraphs("\u{0}F0\u{0}"), "\u{0}F0\u{0}");
        assert_eq!(
            wrap_paragraphs("see \u{0}C0\u{0}"),
            "<p>see \u{0}C0\u{0}</p>"
        );
    }
}

//! Inline code and math protection stage.

use std::collections::HashSet;

use crate::render::escape::escape_html;
use crate::render::pipeline::placeholder::{PlaceholderKind, PlaceholderTable, skip_token};
use crate::render::pipeline::{PipelineContext, ProcessingDocument, Stage};

/// Stage that replaces code spans, then math spans, with placeholders.
///
/// Math is masked here rather than in the final stage so that emphasis and
/// extension rules never see TeX source, while code spans are protected
/// first so a `$` inside code is never taken as a math delimiter.
pub struct InlineCodeStage;

impl Stage for InlineCodeStage {
    fn name(&self) -> &'static str {
        "inline_code"
    }

    fn process(&self, doc: &mut ProcessingDocument, ctx: &mut PipelineContext) {
        let text = protect_code_spans(&doc.content, &mut ctx.placeholders);
        doc.content = protect_math(&text, &mut ctx.placeholders);
    }
}

// ============================================================================
// Code spans
// ============================================================================

fn run_length(bytes: &[u8], pos: usize, ch: u8) -> usize {
    bytes[pos..].iter().take_while(|&&b| b == ch).count()
}

/// Find a backtick run of exactly `len` at or after `from`.
fn find_closing_run(bytes: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        if bytes[j] == b'`' {
            let run = run_length(bytes, j, b'`');
            if run == len {
                return Some(j);
            }
            j += run;
        } else {
            j += 1;
        }
    }
    None
}

fn strip_code_padding(code: &str) -> &str {
    let padded = code.len() >= 2 && code.starts_with(' ') && code.ends_with(' ');
    if padded && !code.bytes().all(|b| b == b' ') {
        &code[1..code.len() - 1]
    } else {
        code
    }
}

fn protect_line(line: &str, table: &mut PlaceholderTable) -> String {
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    // Run lengths with no closer left on this line
    let mut unmatched: HashSet<usize> = HashSet::new();
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => {
                let len = run_length(bytes, i, b'`');
                let close = if unmatched.contains(&len) {
                    None
                } else {
                    find_closing_run(bytes, i + len, len)
                };
                match close {
                    Some(end) => {
                        let code = strip_code_padding(&line[i + len..end]);
                        out.push_str(&line[last..i]);
                        let html = format!("<code>{}</code>", escape_html(code));
                        out.push_str(&table.insert(PlaceholderKind::InlineCode, html, code));
                        i = end + len;
                        last = i;
                    }
                    None => {
                        unmatched.insert(len);
                        i += len;
                    }
                }
            }
            _ => i += 1,
        }
    }

    out.push_str(&line[last..]);
    out
}

/// Replace backtick code spans with inline code placeholders.
///
/// Spans never cross a line break.
pub(crate) fn protect_code_spans(text: &str, table: &mut PlaceholderTable) -> String {
    text.split('\n')
        .map(|line| protect_line(line, table))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Math spans
// ============================================================================

/// Position of the `$` closing an inline math span opened at `open`.
///
/// The opener must be followed by a non-space character; the first
/// unescaped `$` on the line closes the span if it follows a non-space
/// character and is not followed by a digit.
fn inline_math_end(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open + 1)?.is_ascii_whitespace() {
        return None;
    }
    let mut j = open + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\n' => return None,
            b'\\' => j += 2,
            b'$' => {
                let after_space = bytes[j - 1].is_ascii_whitespace();
                let before_digit = bytes.get(j + 1).is_some_and(u8::is_ascii_digit);
                return (!after_space && !before_digit).then_some(j);
            }
            _ => j += 1,
        }
    }
    None
}

fn insert_math(kind: PlaceholderKind, body: &str, table: &mut PlaceholderTable) -> String {
    // Code spans inside math fall back to their source text
    let source = table.plain_text(body);
    table.insert(kind, escape_html(&source), source)
}

/// Replace `$$…$$` and `$…$` spans with math placeholders.
pub(crate) fn protect_math(text: &str, table: &mut PlaceholderTable) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut display_exhausted = false;
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            0 => i = skip_token(text, i),
            b'$' if bytes.get(i + 1) == Some(&b'$') => {
                let close = if display_exhausted {
                    None
                } else {
                    let found = text[i + 2..].find("$$");
                    display_exhausted = found.is_none();
                    found.map(|rel| i + 2 + rel)
                };
                let body = close.map(|end| &text[i + 2..end]);
                match (close, body) {
                    (Some(end), Some(body))
                        if !body.trim().is_empty() && !body.contains("\n\n") =>
                    {
                        out.push_str(&text[last..i]);
                        out.push_str(&insert_math(PlaceholderKind::DisplayMath, body.trim(), table));
                        i = end + 2;
                        last = i;
                    }
                    _ => i += 2,
                }
            }
            b'$' => match inline_math_end(text, i) {
                Some(end) => {
                    out.push_str(&text[last..i]);
                    out.push_str(&insert_math(
                        PlaceholderKind::InlineMath,
                        &text[i + 1..end],
                        table,
                    ));
                    i = end + 1;
                    last = i;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }

    if last < text.len() {
        out.push_str(&text[last..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::pipeline::placeholder::parse_token;
    use pretty_assertions::assert_eq;

    fn code_spans(text: &str) -> (String, PlaceholderTable) {
        let mut table = PlaceholderTable::new();
        let out = protect_code_spans(text, &mut table);
        (out, table)
    }

    fn math(text: &str) -> (String, PlaceholderTable) {
        let mut table = PlaceholderTable::new();
        let out = protect_math(text, &mut table);
        (out, table)
    }

    #[test]
    fn test_single_backtick_span() {
        let (out, table) = code_spans("use `<b>` here");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().html, "<code>&lt;b&gt;</code>");
        assert!(out.starts_with("use \u{0}C0\u{0}"));
        assert!(out.ends_with(" here"));
    }

    #[test]
    fn test_double_backtick_span_contains_single() {
        let (_, table) = code_spans("``a ` b``");
        assert_eq!(table.get(0).unwrap().text, "a ` b");
    }

    #[test]
    fn test_padding_stripped_once() {
        let (_, table) = code_spans("`` `tick` ``");
        assert_eq!(table.get(0).unwrap().text, "`tick`");
        let (_, table) = code_spans("` `");
        assert_eq!(table.get(0).unwrap().text, " ");
    }

    #[test]
    fn test_unmatched_backtick_is_literal() {
        let (out, table) = code_spans("a ` b");
        assert_eq!(out, "a ` b");
        assert!(table.is_empty());
    }

    #[test]
    fn test_span_does_not_cross_lines() {
        let (out, table) = code_spans("`a\nb`");
        assert_eq!(out, "`a\nb`");
        assert!(table.is_empty());
    }

    #[test]
    fn test_escaped_backtick_is_not_an_opener() {
        let (out, table) = code_spans(r"\`not code`");
        assert_eq!(out, r"\`not code`");
        assert!(table.is_empty());
    }

    #[test]
    fn test_inline_math() {
        let (out, table) = math("Energy $E=mc^2$ holds");
        assert_eq!(table.len(), 1);
        let entry = table.get(0).unwrap();
        assert_eq!(entry.kind, PlaceholderKind::InlineMath);
        assert_eq!(entry.text, "E=mc^2");
        assert!(parse_token(&out["Energy ".len()..]).is_some());
    }

    #[test]
    fn test_prices_are_not_math() {
        let (out, table) = math("costs $5 and $6 today");
        assert_eq!(out, "costs $5 and $6 today");
        assert!(table.is_empty());

        let (_, table) = math("from $x$5");
        assert!(table.is_empty());
    }

    #[test]
    fn test_display_math_spans_lines() {
        let (out, table) = math("$$\n\\int_0^1 x\\,dx\n$$");
        assert_eq!(table.get(0).unwrap().kind, PlaceholderKind::DisplayMath);
        assert_eq!(table.get(0).unwrap().text, "\\int_0^1 x\\,dx");
        assert_eq!(out.len(), "\u{0}D0\u{0}".len());
    }

    #[test]
    fn test_display_math_stops_at_blank_line() {
        let (out, table) = math("$$a\n\nb$$");
        assert!(table.is_empty());
        assert_eq!(out, "$$a\n\nb$$");
    }

    #[test]
    fn test_escaped_dollar_is_literal() {
        let (out, table) = math(r"\$a$");
        assert!(table.is_empty());
        assert_eq!(out, r"\$a$");
    }

    #[test]
    fn test_math_escapes_content() {
        let (_, table) = math("$a<b$");
        assert_eq!(table.get(0).unwrap().html, "a&lt;b");
    }

    #[test]
    fn test_stage_protects_code_before_math() {
        let mut doc = ProcessingDocument::new("`$100` and $x$");
        let mut ctx = PipelineContext::new();
        InlineCodeStage.process(&mut doc, &mut ctx);
        assert_eq!(ctx.placeholders.len(), 2);
        assert_eq!(ctx.placeholders.get(0).unwrap().kind, PlaceholderKind::InlineCode);
        assert_eq!(ctx.placeholders.get(1).unwrap().kind, PlaceholderKind::InlineMath);
    }
}

//! Fenced code block protection stage.
//!
//! Extracts fenced code blocks and diagram blocks before any other stage
//! runs, replacing each with a single-line placeholder so their contents
//! are never re-interpreted as markdown.

use crate::render::escape::{escape_attr, escape_html};
use crate::render::pipeline::placeholder::{PlaceholderKind, PlaceholderTable};
use crate::render::pipeline::{PipelineContext, ProcessingDocument, Stage};

/// Stage that replaces fenced blocks with placeholders.
///
/// A fence opens with three or more backticks or tildes and closes with a
/// line of the same character at least as long as the opener, so a
/// four-backtick fence may contain literal three-backtick lines. A fence
/// that is never closed runs to the end of the document.
pub struct FenceStage;

impl Stage for FenceStage {
    fn name(&self) -> &'static str {
        "fence"
    }

    fn process(&self, doc: &mut ProcessingDocument, ctx: &mut PipelineContext) {
        doc.content = protect_fences(&doc.content, &mut ctx.placeholders);
    }
}

#[derive(Debug, PartialEq, Eq)]
struct FenceOpen<'a> {
    marker: u8,
    len: usize,
    indent: usize,
    info: &'a str,
}

fn leading_spaces(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ').count()
}

fn parse_opening(line: &str) -> Option<FenceOpen<'_>> {
    let indent = leading_spaces(line);
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let marker = *rest.as_bytes().first()?;
    if marker != b'`' && marker != b'~' {
        return None;
    }
    let len = rest.bytes().take_while(|&b| b == marker).count();
    if len < 3 {
        return None;
    }
    let info = rest[len..].trim();
    // Backtick fences cannot carry backticks in their info string
    if marker == b'`' && info.contains('`') {
        return None;
    }
    Some(FenceOpen {
        marker,
        len,
        indent,
        info,
    })
}

fn is_closing(line: &str, open: &FenceOpen<'_>) -> bool {
    if leading_spaces(line) > 3 {
        return false;
    }
    let trimmed = line.trim();
    trimmed.len() >= open.len && trimmed.bytes().all(|b| b == open.marker)
}

/// Remove up to `indent` leading spaces from a content line.
fn strip_indent(line: &str, indent: usize) -> &str {
    &line[leading_spaces(line).min(indent)..]
}

pub(crate) fn protect_fences(text: &str, table: &mut PlaceholderTable) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let Some(open) = parse_opening(lines[i]) else {
            out.push(lines[i].to_string());
            i += 1;
            continue;
        };

        let mut body: Vec<&str> = Vec::new();
        let mut j = i + 1;
        while j < lines.len() && !is_closing(lines[j], &open) {
            body.push(strip_indent(lines[j], open.indent));
            j += 1;
        }
        if j == lines.len() {
            tracing::trace!(line = i + 1, "unterminated fence closed at end of document");
        }

        let code = body.join("\n");
        let lang = open.info.split_whitespace().next().unwrap_or("");
        let html = render_block(lang, &code);
        out.push(table.insert(PlaceholderKind::CodeBlock, html, code));

        // Skip the closing fence line (past the end when unterminated)
        i = j + 1;
    }

    out.join("\n")
}

/// Render a fenced block's final HTML based on its language tag.
fn render_block(lang: &str, code: &str) -> String {
    if lang.eq_ignore_ascii_case("mermaid") {
        format!(r#"<div class="mermaid">{}</div>"#, escape_html(code))
    } else if lang.eq_ignore_ascii_case("plantuml") {
        format!(
            r#"<div class="plantuml" data-code="{}">[PlantUML Diagram]</div>"#,
            escape_attr(code)
        )
    } else if lang.is_empty() {
        format!("<pre><code>{}</code></pre>", escape_html(code))
    } else {
        format!(
            r#"<pre><code class="language-{}">{}</code></pre>"#,
            escape_html(lang),
            escape_html(code)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::pipeline::placeholder::is_block_token_line;
    use pretty_assertions::assert_eq;

    fn protect(text: &str) -> (String, PlaceholderTable) {
        let mut table = PlaceholderTable::new();
        let out = protect_fences(text, &mut table);
        (out, table)
    }

    #[test]
    fn test_parse_opening() {
        let open = parse_opening("```rust").unwrap();
        assert_eq!(open.len, 3);
        assert_eq!(open.info, "rust");
        assert!(parse_opening("``not a fence").is_none());
        assert!(parse_opening("    ```indented too far").is_none());
        assert!(parse_opening("```a`b").is_none());
        assert_eq!(parse_opening("~~~~").unwrap().len, 4);
    }

    #[test]
    fn test_code_block_with_language() {
        let (out, table) = protect("```rust\nfn main() {}\n```");
        assert!(is_block_token_line(&out));
        assert_eq!(
            table.get(0).unwrap().html,
            r#"<pre><code class="language-rust">fn main() {}</code></pre>"#
        );
    }

    #[test]
    fn test_code_block_without_language() {
        let (_, table) = protect("~~~\nplain code\n~~~");
        assert_eq!(table.get(0).unwrap().html, "<pre><code>plain code</code></pre>");
    }

    #[test]
    fn test_code_block_escapes_content() {
        let (_, table) = protect("```html\n<b>&</b>\n```");
        assert_eq!(
            table.get(0).unwrap().html,
            r#"<pre><code class="language-html">&lt;b&gt;&amp;&lt;/b&gt;</code></pre>"#
        );
    }

    #[test]
    fn test_longer_fence_contains_shorter() {
        let (out, table) = protect("````markdown\n```\ninner\n```\n````\nafter");
        assert_eq!(out.lines().count(), 2);
        assert!(out.ends_with("\nafter"));
        assert_eq!(table.get(0).unwrap().text, "```\ninner\n```");
    }

    #[test]
    fn test_tilde_fence_ignores_backtick_closer() {
        let (out, table) = protect("~~~\n```\n~~~");
        assert!(is_block_token_line(&out));
        assert_eq!(table.get(0).unwrap().text, "```");
    }

    #[test]
    fn test_mermaid_block() {
        let (_, table) = protect("```Mermaid\ngraph TD\nA-->B\n```");
        assert_eq!(
            table.get(0).unwrap().html,
            r#"<div class="mermaid">graph TD
A--&gt;B</div>"#
        );
    }

    #[test]
    fn test_plantuml_block() {
        let (_, table) = protect("```plantuml\nAlice -> Bob: \"hi\"\nBob -> Alice\n```");
        assert_eq!(
            table.get(0).unwrap().html,
            r#"<div class="plantuml" data-code="Alice -&gt; Bob: &quot;hi&quot;&#10;Bob -&gt; Alice">[PlantUML Diagram]</div>"#
        );
    }

    #[test]
    fn test_unterminated_fence_runs_to_end() {
        let (out, table) = protect("before\n```\nnever closed\n# not a heading");
        assert_eq!(out.lines().count(), 2);
        assert_eq!(table.get(0).unwrap().text, "never closed\n# not a heading");
    }

    #[test]
    fn test_surrounding_lines_preserved() {
        let (out, _) = protect("a\n\n```\nx\n```\n\nb");
        let lines: Vec<&str> = out.split('\n').collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "a");
        assert_eq!(lines[1], "");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "b");
    }

    #[test]
    fn test_indented_fence_strips_indent() {
        let (_, table) = protect("  ```\n  indented\n    deeper\n  ```");
        assert_eq!(table.get(0).unwrap().text, "indented\n  deeper");
    }
}

//! Block structure conversion stage.
//!
//! Works line by line over the protected text. Headings, rules, block
//! quotes, lists and tables become block HTML; every other line is
//! HTML-escaped and left for the inline and extension stages.

use std::sync::LazyLock;

use regex::Regex;

use crate::render::Heading;
use crate::render::escape::{escape_html, unescape_html};
use crate::render::pipeline::markup::strip_tags;
use crate::render::pipeline::placeholder::{PlaceholderTable, is_block_token_line};
use crate::render::pipeline::{PipelineContext, ProcessingDocument, Stage};
use crate::render::slug::slugify;

use super::inline::render_inline;

/// Stage that converts block-level markdown constructs.
pub struct BlockStage;

impl Stage for BlockStage {
    fn name(&self) -> &'static str {
        "blocks"
    }

    fn process(&self, doc: &mut ProcessingDocument, ctx: &mut PipelineContext) {
        doc.content = convert_blocks(&doc.content, ctx);
    }
}

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#{1,6})(?:[ \t]+(.*?))?(?:[ \t]+#+)?[ \t]*$").unwrap()
});

/// Task items are checked before bullets; their syntax is a superset.
static TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*+][ \t]+\[([ xX])\](?:[ \t]+(.*))?$").unwrap());

static ORDERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,9})[.)](?:[ \t]+(.*))?$").unwrap());

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*+](?:[ \t]+(.*))?$").unwrap());

/// Columns a tab advances list indentation by.
const TAB_WIDTH: usize = 4;

/// Indentation columns per nesting level.
const INDENT_PER_LEVEL: usize = 2;

fn convert_blocks(text: &str, ctx: &mut PipelineContext) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut lists = ListStack::default();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if trimmed.is_empty() {
            lists.close_all(&mut out);
            out.push(String::new());
            i += 1;
            continue;
        }

        if is_thematic_break(trimmed) {
            lists.close_all(&mut out);
            out.push("<hr>".to_string());
            i += 1;
            continue;
        }

        if let Some(item) = parse_list_item(line) {
            lists.push_item(item, &mut out);
            i += 1;
            continue;
        }

        lists.close_all(&mut out);

        if is_block_token_line(trimmed) {
            out.push(trimmed.to_string());
            i += 1;
        } else if let Some(html) = convert_heading(trimmed, ctx) {
            out.push(html);
            i += 1;
        } else if quote_content(line).is_some() {
            let start = i;
            while i < lines.len() && quote_content(lines[i]).is_some() {
                i += 1;
            }
            out.push(render_blockquote(&lines[start..i]));
        } else if is_table_line(line) {
            let start = i;
            while i < lines.len() && is_table_line(lines[i]) {
                i += 1;
            }
            convert_table(&lines[start..i], &mut out);
        } else {
            out.push(escape_html(trimmed));
            i += 1;
        }
    }

    lists.close_all(&mut out);
    out.join("\n")
}

// ============================================================================
// Headings, rules and block quotes
// ============================================================================

/// The visible text of a heading, with inline markers, tags and entities
/// removed and code spans reduced to their contents.
fn heading_text(escaped: &str, table: &PlaceholderTable) -> String {
    let rendered = render_inline(escaped, true, table);
    table.plain_text(&unescape_html(&strip_tags(&rendered)))
}

fn convert_heading(line: &str, ctx: &mut PipelineContext) -> Option<String> {
    let caps = HEADING_RE.captures(line)?;
    let level = caps[1].len();
    let content = caps.get(2).map_or("", |m| m.as_str());

    let text = heading_text(&escape_html(content), &ctx.placeholders);
    let id = slugify(&text);
    let html = format!(
        r#"<h{level} id="{}">{}</h{level}>"#,
        escape_html(&id),
        escape_html(content)
    );

    ctx.headings.push(Heading {
        level: level as u8,
        text,
        id,
    });
    Some(html)
}

fn is_thematic_break(trimmed: &str) -> bool {
    let Some(marker) = trimmed.chars().next() else {
        return false;
    };
    if !matches!(marker, '-' | '*' | '_') {
        return false;
    }
    let mut count = 0;
    for c in trimmed.chars() {
        if c == marker {
            count += 1;
        } else if c != ' ' && c != '\t' {
            return false;
        }
    }
    count >= 3
}

/// Content of a block quote line, with the marker and one space removed.
fn quote_content(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

fn render_blockquote(lines: &[&str]) -> String {
    let parts: Vec<String> = lines
        .iter()
        .filter_map(|line| quote_content(line))
        .map(|content| escape_html(content.trim_end()))
        .collect();
    format!("<blockquote>{}</blockquote>", parts.join("<br>"))
}

// ============================================================================
// Lists
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Unordered,
}

#[derive(Debug)]
struct ListItem {
    kind: ListKind,
    depth: usize,
    /// Starting number, for ordered items.
    start: Option<u64>,
    /// Finished item content.
    html: String,
}

#[derive(Debug)]
struct ListFrame {
    kind: ListKind,
    depth: usize,
    /// Whether the open `<li>` contains a nested list.
    has_children: bool,
}

fn indent_columns(line: &str) -> (usize, &str) {
    let mut columns = 0;
    for (pos, c) in line.char_indices() {
        match c {
            ' ' => columns += 1,
            '\t' => columns += TAB_WIDTH,
            _ => return (columns, &line[pos..]),
        }
    }
    (columns, "")
}

fn parse_list_item(line: &str) -> Option<ListItem> {
    let (columns, rest) = indent_columns(line);
    let rest = rest.trim_end();
    let depth = columns / INDENT_PER_LEVEL;

    if let Some(caps) = TASK_RE.captures(rest) {
        let checked = &caps[1] != " ";
        let text = caps.get(2).map_or("", |m| m.as_str());
        let checkbox = if checked {
            r#"<input type="checkbox" disabled checked>"#
        } else {
            r#"<input type="checkbox" disabled>"#
        };
        return Some(ListItem {
            kind: ListKind::Unordered,
            depth,
            start: None,
            html: format!("{checkbox} {}", escape_html(text)),
        });
    }

    if let Some(caps) = ORDERED_RE.captures(rest) {
        let text = caps.get(2).map_or("", |m| m.as_str());
        return Some(ListItem {
            kind: ListKind::Ordered,
            depth,
            start: caps[1].parse().ok(),
            html: escape_html(text),
        });
    }

    BULLET_RE.captures(rest).map(|caps| ListItem {
        kind: ListKind::Unordered,
        depth,
        start: None,
        html: escape_html(caps.get(1).map_or("", |m| m.as_str())),
    })
}

/// Stack of open lists. Depths strictly increase from bottom to top.
#[derive(Debug, Default)]
struct ListStack {
    frames: Vec<ListFrame>,
}

impl ListStack {
    fn push_item(&mut self, item: ListItem, out: &mut Vec<String>) {
        while self.frames.last().is_some_and(|top| top.depth > item.depth) {
            self.close_top(out);
        }

        match self.frames.last() {
            Some(top) if top.depth == item.depth && top.kind == item.kind => {
                self.close_item(out);
            }
            Some(top) if top.depth == item.depth => {
                self.close_top(out);
                self.open(&item, out);
            }
            _ => self.open(&item, out),
        }

        out.push(format!("<li>{}", item.html));
    }

    fn open(&mut self, item: &ListItem, out: &mut Vec<String>) {
        if let Some(parent) = self.frames.last_mut() {
            parent.has_children = true;
        }
        let tag = match (item.kind, item.start) {
            (ListKind::Unordered, _) => "<ul>".to_string(),
            (ListKind::Ordered, Some(start)) if start != 1 => format!(r#"<ol start="{start}">"#),
            (ListKind::Ordered, _) => "<ol>".to_string(),
        };
        out.push(tag);
        self.frames.push(ListFrame {
            kind: item.kind,
            depth: item.depth,
            has_children: false,
        });
    }

    /// End the open `<li>` of the top frame.
    fn close_item(&mut self, out: &mut Vec<String>) {
        let Some(top) = self.frames.last_mut() else {
            return;
        };
        if top.has_children {
            out.push("</li>".to_string());
        } else if let Some(last) = out.last_mut() {
            last.push_str("</li>");
        }
        top.has_children = false;
    }

    fn close_top(&mut self, out: &mut Vec<String>) {
        self.close_item(out);
        if let Some(frame) = self.frames.pop() {
            out.push(match frame.kind {
                ListKind::Ordered => "</ol>".to_string(),
                ListKind::Unordered => "</ul>".to_string(),
            });
        }
    }

    fn close_all(&mut self, out: &mut Vec<String>) {
        while !self.frames.is_empty() {
            self.close_top(out);
        }
    }
}

// ============================================================================
// Tables
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    None,
    Left,
    Center,
    Right,
}

impl Align {
    fn style(self) -> &'static str {
        match self {
            Align::None => "",
            Align::Left => r#" style="text-align: left""#,
            Align::Center => r#" style="text-align: center""#,
            Align::Right => r#" style="text-align: right""#,
        }
    }
}

fn is_table_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// Split a table row into trimmed cells. `\|` is a literal pipe.
fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    cells.into_iter().map(|c| c.trim().to_string()).collect()
}

fn separator_alignment(cell: &str) -> Option<Align> {
    let valid = !cell.is_empty()
        && cell.contains('-')
        && cell.chars().all(|c| c == '-' || c == ':' || c.is_whitespace());
    if !valid {
        return None;
    }
    Some(match (cell.starts_with(':'), cell.ends_with(':')) {
        (true, true) => Align::Center,
        (true, false) => Align::Left,
        (false, true) => Align::Right,
        (false, false) => Align::None,
    })
}

fn parse_separator(line: &str) -> Option<Vec<Align>> {
    split_cells(line)
        .iter()
        .map(|cell| separator_alignment(cell))
        .collect()
}

fn render_row(cells: &[String], aligns: &[Align], tag: &str) -> String {
    let mut row = String::from("<tr>");
    for (col, align) in aligns.iter().enumerate() {
        let cell = cells.get(col).map_or("", String::as_str);
        row.push_str(&format!(
            "<{tag}{}>{}</{tag}>",
            align.style(),
            escape_html(cell)
        ));
    }
    row.push_str("</tr>");
    row
}

/// Convert a group of pipe lines, or emit them as text when no separator
/// row follows a header row.
fn convert_table(lines: &[&str], out: &mut Vec<String>) {
    let separator = lines
        .iter()
        .enumerate()
        .skip(1)
        .find_map(|(idx, line)| parse_separator(line).map(|aligns| (idx, aligns)));

    let Some((sep_idx, aligns)) = separator else {
        out.extend(lines.iter().map(|line| escape_html(line.trim())));
        return;
    };

    out.push("<table>".to_string());
    out.push("<thead>".to_string());
    for line in &lines[..sep_idx] {
        out.push(render_row(&split_cells(line), &aligns, "th"));
    }
    out.push("</thead>".to_string());

    let body = &lines[sep_idx + 1..];
    if !body.is_empty() {
        out.push("<tbody>".to_string());
        for line in body {
            out.push(render_row(&split_cells(line), &aligns, "td"));
        }
        out.push("</tbody>".to_string());
    }
    out.push("</table>".to_string());
}

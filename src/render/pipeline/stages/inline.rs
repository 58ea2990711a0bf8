//! Inline conversion stage: emphasis, strikethrough, links and images.
//!
//! Text is tokenized into literal runs and delimiter runs, then delimiter
//! runs are paired with a delimiter stack. Pairing is linear in the number
//! of delimiter runs, so long runs of `*` or `_` cannot cause blowup.

use std::collections::HashMap;

use crate::render::escape::escape_html;
use crate::render::pipeline::markup::{Segment, segments, skip_tag};
use crate::render::pipeline::placeholder::{PlaceholderTable, skip_token, substitute};
use crate::render::pipeline::{PipelineContext, ProcessingDocument, Stage};

/// Stage that converts inline markup within block text runs.
pub struct InlineStage;

impl Stage for InlineStage {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn process(&self, doc: &mut ProcessingDocument, ctx: &mut PipelineContext) {
        let mut out = String::with_capacity(doc.content.len());
        for segment in segments(&doc.content) {
            match segment {
                Segment::Markup(markup) => out.push_str(markup),
                Segment::Text(text) => {
                    out.push_str(&render_inline(text, true, &ctx.placeholders));
                }
            }
        }
        doc.content = out;
    }
}

/// Render inline markup in an escaped text run.
///
/// Links are not recognised when `allow_links` is false, which is how link
/// text is rendered (links cannot nest).
pub(crate) fn render_inline(text: &str, allow_links: bool, table: &PlaceholderTable) -> String {
    let mut nodes = Tokenizer::new(text, allow_links, table).run();
    process_emphasis(&mut nodes);
    render_nodes(&nodes)
}

// ============================================================================
// Tokenizing
// ============================================================================

#[derive(Debug)]
enum Node {
    Text(String),
    Delim(Delim),
}

/// A run of `*`, `_` or `~~`.
#[derive(Debug)]
struct Delim {
    ch: u8,
    /// Run length as written.
    orig: usize,
    /// Characters not yet consumed by a match.
    remaining: usize,
    can_open: bool,
    can_close: bool,
    /// Tags emitted after the literal remainder, outermost first.
    opens: Vec<&'static str>,
    /// Tags emitted before the literal remainder, innermost first.
    closes: Vec<&'static str>,
}

/// The pieces of `[label](destination)`.
struct LinkParts<'a> {
    label: &'a str,
    url: &'a str,
    title: Option<&'a str>,
    /// Byte offset just past the closing parenthesis.
    end: usize,
}

struct Tokenizer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    table: &'a PlaceholderTable,
    allow_links: bool,
    brackets: HashMap<usize, usize>,
    parens: HashMap<usize, usize>,
    nodes: Vec<Node>,
    last: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str, allow_links: bool, table: &'a PlaceholderTable) -> Self {
        let (brackets, parens) = match_pairs(text);
        Self {
            text,
            bytes: text.as_bytes(),
            table,
            allow_links,
            brackets,
            parens,
            nodes: Vec::new(),
            last: 0,
        }
    }

    fn run(mut self) -> Vec<Node> {
        let mut i = 0;
        while i < self.bytes.len() {
            let b = self.bytes[i];
            match b {
                b'\\' => i = self.backslash(i),
                b'<' => i = skip_tag(self.text, i),
                0 => i = skip_token(self.text, i),
                b'!' if self.bytes.get(i + 1) == Some(&b'[') => {
                    match self.link_parts(i + 1) {
                        Some(parts) => {
                            let html = self.image_html(&parts);
                            i = self.emit(i, parts.end, html);
                        }
                        None => i += 1,
                    }
                }
                b'[' if self.allow_links => match self.link_parts(i) {
                    Some(parts) => {
                        let html = self.link_html(&parts);
                        i = self.emit(i, parts.end, html);
                    }
                    None => i += 1,
                },
                b'&' if self.allow_links && self.text[i..].starts_with("&lt;") => {
                    match self.autolink(i) {
                        Some((html, end)) => i = self.emit(i, end, html),
                        None => i += 4,
                    }
                }
                b'*' | b'_' | b'~' => {
                    let run = self.bytes[i..].iter().take_while(|&&c| c == b).count();
                    if b != b'~' || run == 2 {
                        self.flush(i);
                        let (can_open, can_close) = flanking(self.text, i, run, b);
                        self.nodes.push(Node::Delim(Delim {
                            ch: b,
                            orig: run,
                            remaining: run,
                            can_open,
                            can_close,
                            opens: Vec::new(),
                            closes: Vec::new(),
                        }));
                        self.last = i + run;
                    }
                    i += run;
                }
                _ => i += 1,
            }
        }
        self.flush(self.bytes.len());
        self.nodes
    }

    fn flush(&mut self, end: usize) {
        if self.last < end {
            self.nodes
                .push(Node::Text(self.text[self.last..end].to_string()));
        }
        self.last = end;
    }

    /// Replace `text[start..end]` with finished HTML and return `end`.
    fn emit(&mut self, start: usize, end: usize, html: String) -> usize {
        self.flush(start);
        self.nodes.push(Node::Text(html));
        self.last = end;
        end
    }

    /// Handle a backslash at `pos` and return the next scan position.
    fn backslash(&mut self, pos: usize) -> usize {
        match self.bytes.get(pos + 1) {
            // Escaped `&`, `<`, `>` and quotes are already entities
            Some(b'&') => {
                self.flush(pos);
                self.last = pos + 1;
                pos + 2
            }
            Some(&next) if next.is_ascii_punctuation() && next != b'<' => {
                self.emit(pos, pos + 2, format!("&#{next};"))
            }
            _ => pos + 1,
        }
    }

    fn link_parts(&self, open: usize) -> Option<LinkParts<'a>> {
        let close = *self.brackets.get(&open)?;
        if self.bytes.get(close + 1) != Some(&b'(') {
            return None;
        }
        let paren_close = *self.parens.get(&(close + 1))?;
        let (url, title) = parse_destination(&self.text[close + 2..paren_close])?;
        Some(LinkParts {
            label: &self.text[open + 1..close],
            url,
            title,
            end: paren_close + 1,
        })
    }

    /// Replace placeholders with their escaped source text, for attributes.
    fn plain(&self, text: &str) -> String {
        substitute(text, |token| {
            self.table.get(token.index).map(|p| escape_html(&p.text))
        })
    }

    fn title_attr(&self, title: Option<&str>) -> String {
        title.map_or_else(String::new, |t| format!(r#" title="{}""#, self.plain(t)))
    }

    fn link_html(&self, parts: &LinkParts<'_>) -> String {
        format!(
            r#"<a href="{}"{}>{}</a>"#,
            sanitize_url(&self.plain(parts.url)),
            self.title_attr(parts.title),
            render_inline(parts.label, false, self.table)
        )
    }

    fn image_html(&self, parts: &LinkParts<'_>) -> String {
        format!(
            r#"<img src="{}" alt="{}"{}>"#,
            sanitize_url(&self.plain(parts.url)),
            self.plain(parts.label),
            self.title_attr(parts.title)
        )
    }

    /// `&lt;scheme:…&gt;` autolink starting at `pos`.
    fn autolink(&self, pos: usize) -> Option<(String, usize)> {
        let start = pos + "&lt;".len();
        let rest = &self.text[start..];
        let word = &rest[..rest.find(char::is_whitespace).unwrap_or(rest.len())];
        let len = word.find("&gt;")?;
        let uri = &word[..len];
        if !is_absolute_uri(uri) || uri.contains(['<', '\0']) {
            return None;
        }
        let html = format!(
            r#"<a href="{}">{}</a>"#,
            sanitize_url(uri),
            literal_link_text(uri)
        );
        Some((html, start + len + "&gt;".len()))
    }
}

/// Encode characters the extension stage treats as markers, so the
/// visible text of an autolink stays identical to its target.
fn literal_link_text(uri: &str) -> String {
    let mut out = String::with_capacity(uri.len());
    for c in uri.chars() {
        match c {
            '~' => out.push_str("&#126;"),
            '^' => out.push_str("&#94;"),
            '=' => out.push_str("&#61;"),
            '[' => out.push_str("&#91;"),
            _ => out.push(c),
        }
    }
    out
}

/// Match brackets and parentheses, skipping escapes, tags and placeholders.
fn match_pairs(text: &str) -> (HashMap<usize, usize>, HashMap<usize, usize>) {
    let bytes = text.as_bytes();
    let mut brackets = HashMap::new();
    let mut parens = HashMap::new();
    let mut open_brackets = Vec::new();
    let mut open_parens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'<' => {
                i = skip_tag(text, i);
                continue;
            }
            0 => {
                i = skip_token(text, i);
                continue;
            }
            b'[' => open_brackets.push(i),
            b']' => {
                if let Some(open) = open_brackets.pop() {
                    brackets.insert(open, i);
                }
            }
            b'(' => open_parens.push(i),
            b')' => {
                if let Some(open) = open_parens.pop() {
                    parens.insert(open, i);
                }
            }
            _ => {}
        }
        i += 1;
    }

    (brackets, parens)
}

fn strip_wrapped<'s>(s: &'s str, open: &str, close: &str) -> Option<&'s str> {
    s.strip_prefix(open)?.strip_suffix(close)
}

/// Split a link destination into URL and optional title.
///
/// The text is already escaped, so quotes appear as entities.
fn parse_destination(dest: &str) -> Option<(&str, Option<&str>)> {
    let dest = dest.trim();
    let (url, rest) = match dest.strip_prefix("&lt;") {
        Some(inner) => {
            let end = inner.find("&gt;")?;
            (&inner[..end], &inner[end + "&gt;".len()..])
        }
        None => {
            let end = dest.find(char::is_whitespace).unwrap_or(dest.len());
            (&dest[..end], &dest[end..])
        }
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return Some((url, None));
    }
    let title = strip_wrapped(rest, "&quot;", "&quot;")
        .or_else(|| strip_wrapped(rest, "&#39;", "&#39;"))
        .or_else(|| strip_wrapped(rest, "(", ")"))?;
    Some((url, Some(title)))
}

fn is_absolute_uri(s: &str) -> bool {
    let Some((scheme, rest)) = s.split_once(':') else {
        return false;
    };
    (2..=32).contains(&scheme.len())
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        && !rest.is_empty()
}

/// Neutralize script-capable URL schemes.
pub(crate) fn sanitize_url(url: &str) -> String {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    let blocked = match normalized.split_once(':') {
        Some(("javascript" | "vbscript", _)) => true,
        Some(("data", _)) => !normalized.starts_with("data:image/"),
        _ => false,
    };
    if blocked {
        tracing::trace!(url, "blocked unsafe link scheme");
        "#".to_string()
    } else {
        url.to_string()
    }
}

fn is_punctuation(c: char) -> bool {
    c != '\0' && !c.is_alphanumeric() && !c.is_whitespace()
}

/// Whether a delimiter run can open and close emphasis.
fn flanking(text: &str, start: usize, run: usize, ch: u8) -> (bool, bool) {
    let prev = text[..start].chars().next_back();
    let next = text[start + run..].chars().next();
    let prev_space = prev.is_none_or(char::is_whitespace);
    let next_space = next.is_none_or(char::is_whitespace);
    let prev_punct = prev.is_some_and(is_punctuation);
    let next_punct = next.is_some_and(is_punctuation);

    let left = !next_space && (!next_punct || prev_space || prev_punct);
    let right = !prev_space && (!prev_punct || next_space || next_punct);

    if ch == b'_' {
        (left && (!right || prev_punct), right && (!left || next_punct))
    } else {
        (left, right)
    }
}

// ============================================================================
// Emphasis
// ============================================================================

fn delim(node: &Node) -> Option<&Delim> {
    match node {
        Node::Delim(d) => Some(d),
        Node::Text(_) => None,
    }
}

fn opener_matches(node: &Node, closer: &Delim) -> bool {
    let Some(opener) = delim(node) else {
        return false;
    };
    if opener.ch != closer.ch || !opener.can_open || opener.remaining == 0 {
        return false;
    }
    // A run that can both open and close only pairs when the lengths
    // are not a multiple of three apart
    let both = opener.can_close || closer.can_open;
    let sum = opener.orig + closer.orig;
    !(closer.ch != b'~'
        && both
        && sum % 3 == 0
        && !(opener.orig % 3 == 0 && closer.orig % 3 == 0))
}

/// Pair an opener and closer, returning what remains of each.
fn apply_match(nodes: &mut [Node], opener: usize, closer: usize) -> (usize, usize) {
    let (ch, open_left, close_left) = match (delim(&nodes[opener]), delim(&nodes[closer])) {
        (Some(o), Some(c)) => (c.ch, o.remaining, c.remaining),
        _ => return (0, 0),
    };

    let (used, open_tag, close_tag) = if ch == b'~' {
        (2, "<del>", "</del>")
    } else if open_left >= 3 && close_left >= 3 {
        (3, "<strong><em>", "</em></strong>")
    } else if open_left >= 2 && close_left >= 2 {
        (2, "<strong>", "</strong>")
    } else {
        (1, "<em>", "</em>")
    };

    if let Node::Delim(o) = &mut nodes[opener] {
        o.remaining -= used;
        o.opens.insert(0, open_tag);
    }
    if let Node::Delim(c) = &mut nodes[closer] {
        c.remaining -= used;
        c.closes.push(close_tag);
    }
    (open_left - used, close_left - used)
}

fn process_emphasis(nodes: &mut [Node]) {
    // Indices of nodes that may still open
    let mut stack: Vec<usize> = Vec::new();
    // Lowest stack position worth searching, per closer class
    let mut bottoms: HashMap<(u8, usize, bool), usize> = HashMap::new();

    for idx in 0..nodes.len() {
        let Some(closer) = delim(&nodes[idx]) else {
            continue;
        };

        if closer.can_close {
            let key = (closer.ch, closer.orig % 3, closer.can_open);
            loop {
                let Some(closer) = delim(&nodes[idx]) else {
                    break;
                };
                let bottom = bottoms.get(&key).copied().unwrap_or(0).min(stack.len());
                let found = (bottom..stack.len())
                    .rev()
                    .find(|&k| opener_matches(&nodes[stack[k]], closer));
                let Some(k) = found else {
                    bottoms.insert(key, stack.len());
                    break;
                };

                let opener = stack[k];
                stack.truncate(k + 1);
                let (open_left, close_left) = apply_match(nodes, opener, idx);
                if open_left == 0 {
                    stack.pop();
                }
                for bottom in bottoms.values_mut() {
                    *bottom = (*bottom).min(stack.len());
                }
                if close_left == 0 {
                    break;
                }
            }
        }

        if let Some(d) = delim(&nodes[idx])
            && d.can_open
            && d.remaining > 0
        {
            stack.push(idx);
        }
    }
}

fn render_nodes(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Delim(d) => {
                d.closes.iter().for_each(|tag| out.push_str(tag));
                out.extend(std::iter::repeat_n(d.ch as char, d.remaining));
                d.opens.iter().for_each(|tag| out.push_str(tag));
            }
        }
    }
    out
}

//! Placeholder tokens for content that later stages must not touch.
//!
//! A token is `NUL <kind> <index> NUL`. Input NUL characters are replaced
//! before the pipeline runs, so a token can never collide with document
//! text or with generated markup.

/// Delimiter used on both ends of a token.
pub const SENTINEL: char = '\u{0}';
const SENTINEL_BYTE: u8 = 0;

/// What a placeholder stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// A fenced code or diagram block.
    CodeBlock,
    /// An inline code span.
    InlineCode,
    /// A `$$…$$` math span.
    DisplayMath,
    /// A `$…$` math span.
    InlineMath,
}

impl PlaceholderKind {
    fn tag(self) -> char {
        match self {
            PlaceholderKind::CodeBlock => 'F',
            PlaceholderKind::InlineCode => 'C',
            PlaceholderKind::DisplayMath => 'D',
            PlaceholderKind::InlineMath => 'M',
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'F' => Some(PlaceholderKind::CodeBlock),
            b'C' => Some(PlaceholderKind::InlineCode),
            b'D' => Some(PlaceholderKind::DisplayMath),
            b'M' => Some(PlaceholderKind::InlineMath),
            _ => None,
        }
    }

    /// Whether the placeholder stands for block-level content.
    pub fn is_block(self) -> bool {
        matches!(
            self,
            PlaceholderKind::CodeBlock | PlaceholderKind::DisplayMath
        )
    }

    /// Whether the placeholder holds math that the final stage converts.
    pub fn is_math(self) -> bool {
        matches!(
            self,
            PlaceholderKind::DisplayMath | PlaceholderKind::InlineMath
        )
    }
}

/// Content held behind a placeholder.
#[derive(Debug, Clone)]
pub struct Protected {
    pub kind: PlaceholderKind,
    /// Finished (escaped) HTML for this entry.
    pub html: String,
    /// Original source text, used where plain text is needed (heading ids, alt text).
    pub text: String,
}

/// A token located at the start of a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: PlaceholderKind,
    pub index: usize,
    /// Length of the token in bytes.
    pub len: usize,
}

/// Per-conversion table of protected content.
///
/// Indices grow monotonically within one conversion; a fresh table is
/// created for every call.
#[derive(Debug, Default)]
pub struct PlaceholderTable {
    entries: Vec<Protected>,
}

impl PlaceholderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store content and return the token that stands in for it.
    pub fn insert(
        &mut self,
        kind: PlaceholderKind,
        html: String,
        text: impl Into<String>,
    ) -> String {
        let index = self.entries.len();
        self.entries.push(Protected {
            kind,
            html,
            text: text.into(),
        });
        format!("{SENTINEL}{}{index}{SENTINEL}", kind.tag())
    }

    pub fn get(&self, index: usize) -> Option<&Protected> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every token in `text` with the original source it stands for.
    pub fn plain_text(&self, text: &str) -> String {
        substitute(text, |token| self.get(token.index).map(|p| p.text.clone()))
    }
}

/// Parse a token at the start of `s`.
pub fn parse_token(s: &str) -> Option<Token> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&SENTINEL_BYTE) {
        return None;
    }
    let kind = PlaceholderKind::from_tag(*bytes.get(1)?)?;
    let digits = bytes[2..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || bytes.get(2 + digits) != Some(&SENTINEL_BYTE) {
        return None;
    }
    let index = s[2..2 + digits].parse().ok()?;
    Some(Token {
        kind,
        index,
        len: digits + 3,
    })
}

/// Whether `line` consists of exactly one block-level token.
pub fn is_block_token_line(line: &str) -> bool {
    parse_token(line).is_some_and(|t| t.kind.is_block() && t.len == line.len())
}

/// Rewrite every token in `text`, keeping tokens for which `f` returns `None`.
pub fn substitute(text: &str, mut f: impl FnMut(Token) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(SENTINEL) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match parse_token(tail) {
            Some(token) => {
                match f(token) {
                    Some(replacement) => out.push_str(&replacement),
                    None => out.push_str(&tail[..token.len]),
                }
                rest = &tail[token.len..];
            }
            None => {
                out.push(SENTINEL);
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Byte offset just past the token starting at `pos`, or `pos + 1` if none.
pub(crate) fn skip_token(text: &str, pos: usize) -> usize {
    parse_token(&text[pos..]).map_or(pos + 1, |t| pos + t.len)
}

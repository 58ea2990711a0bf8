use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::cache::content_hash;
use crate::render::Heading;

/// Front matter metadata parsed from a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontMatter {
    /// Page title (overrides the first heading and the file name)
    pub title: Option<String>,
    /// Page description, emitted as a meta tag
    pub description: Option<String>,
    /// Additional arbitrary metadata (available in templates as `page.*`)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

/// Result of parsing front matter from markdown content.
#[derive(Debug)]
pub struct ParsedContent {
    /// The parsed front matter (empty if none found)
    pub front_matter: FrontMatter,
    /// The markdown content without the front matter block
    pub content: String,
}

/// Parse front matter from markdown content.
///
/// Front matter is a YAML mapping delimited by `---` lines at the very
/// start of the file:
///
/// ```markdown
/// ---
/// title: My Page
/// ---
///
/// # Content starts here
/// ```
///
/// When the block is not a YAML mapping the content is returned unchanged,
/// so a document that merely opens with a horizontal rule still renders it.
pub fn parse_front_matter(content: &str) -> ParsedContent {
    let unchanged = || ParsedContent {
        front_matter: FrontMatter::default(),
        content: content.to_string(),
    };

    let Some(after_opening) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return unchanged();
    };

    // Find the closing delimiter line
    let mut offset = 0;
    let mut closing = None;
    for line in after_opening.split_inclusive('\n') {
        if line.trim_end() == "---" {
            closing = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }
    let Some((yaml_end, markdown_start)) = closing else {
        return unchanged();
    };

    let yaml_content = &after_opening[..yaml_end];
    let value: serde_yaml::Value = match serde_yaml::from_str(yaml_content) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("failed to parse front matter: {e}");
            return unchanged();
        }
    };
    if !value.is_mapping() {
        return unchanged();
    }

    let front_matter = serde_yaml::from_value(value).unwrap_or_else(|e| {
        tracing::warn!("ignoring malformed front matter fields: {e}");
        FrontMatter::default()
    });

    ParsedContent {
        front_matter,
        content: after_opening[markdown_start..]
            .trim_start_matches(['\r', '\n'])
            .to_string(),
    }
}

/// A markdown document read for conversion.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Where the document was read from; `None` for standard input
    pub path: Option<PathBuf>,
    /// Front matter metadata
    pub front_matter: FrontMatter,
    /// The markdown to convert
    pub markdown: String,
    /// Hash of the raw source, front matter included
    pub content_hash: String,
}

impl SourceDocument {
    /// Build a document from raw content, optionally stripping front matter.
    pub fn new(path: Option<PathBuf>, raw: &str, strip_front_matter: bool) -> Self {
        let (front_matter, markdown) = if strip_front_matter {
            let parsed = parse_front_matter(raw);
            (parsed.front_matter, parsed.content)
        } else {
            (FrontMatter::default(), raw.to_string())
        };

        Self {
            path,
            front_matter,
            markdown,
            content_hash: content_hash(raw),
        }
    }

    /// The document title: front matter, then the first level-one heading,
    /// then the file name.
    pub fn title(&self, headings: &[Heading]) -> Option<String> {
        self.front_matter
            .title
            .clone()
            .or_else(|| {
                headings
                    .iter()
                    .find(|h| h.level == 1)
                    .map(|h| h.text.clone())
            })
            .or_else(|| {
                self.path
                    .as_deref()
                    .and_then(Path::file_stem)
                    .map(|stem| title_case(&stem.to_string_lossy()))
            })
    }
}

/// Convert a file stem like "getting-started" into "Getting Started".
fn title_case(s: &str) -> String {
    s.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

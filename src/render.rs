//! Markdown to HTML conversion engine.
//!
//! The engine is a pure function over strings: every call builds its own
//! pipeline context, so conversions never share state and can run in
//! parallel. Malformed markdown never fails; it degrades to literal text.

pub mod escape;
pub mod pipeline;
pub mod slug;

use std::sync::LazyLock;

use serde::Serialize;

use pipeline::{Pipeline, PipelineContext, ProcessingDocument};

/// A heading found while converting, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    /// The heading level (1-6)
    pub level: u8,
    /// The heading text, with code spans reduced to their contents
    pub text: String,
    /// The anchor id emitted on the heading element
    pub id: String,
}

/// The result of converting one document.
#[derive(Debug, Clone, Serialize)]
pub struct Rendered {
    /// The HTML fragment
    pub html: String,
    /// Headings in document order, for building a table of contents
    pub headings: Vec<Heading>,
}

/// The conversion engine.
///
/// Holds the stage pipeline; all per-conversion state lives in a fresh
/// context, so one engine can be shared across threads.
pub struct MarkdownEngine {
    pipeline: Pipeline,
}

impl MarkdownEngine {
    /// Create an engine with the default stages.
    pub fn new() -> Self {
        Self {
            pipeline: Pipeline::default_pipeline(),
        }
    }

    /// Convert markdown into an HTML fragment and its heading outline.
    pub fn render(&self, markdown: &str) -> Rendered {
        let mut doc = ProcessingDocument::new(markdown);
        let mut ctx = PipelineContext::new();
        self.pipeline.run(&mut doc, &mut ctx);

        tracing::debug!(
            input_bytes = markdown.len(),
            output_bytes = doc.content.len(),
            headings = ctx.headings.len(),
            placeholders = ctx.placeholders.len(),
            "converted markdown"
        );

        Rendered {
            html: doc.content,
            headings: ctx.headings,
        }
    }

    /// Convert markdown into an HTML fragment.
    pub fn convert(&self, markdown: &str) -> String {
        self.render(markdown).html
    }
}

impl Default for MarkdownEngine {
    fn default() -> Self {
        Self::new()
    }
}

static ENGINE: LazyLock<MarkdownEngine> = LazyLock::new(MarkdownEngine::new);

/// Convert markdown into an HTML fragment (no `<html>` or `<body>` wrapper).
///
/// ```
/// assert_eq!(markpane::convert_to_html("**hi**"), "<p><strong>hi</strong></p>");
/// ```
pub fn convert_to_html(markdown: &str) -> String {
    ENGINE.convert(markdown)
}

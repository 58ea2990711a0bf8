//! Pipeline context for sharing state across stages.

use super::placeholder::PlaceholderTable;
use crate::render::Heading;

/// Per-conversion state shared by the stages of one pipeline run.
///
/// A new context is created for every conversion, so nothing here leaks
/// between calls and concurrent conversions never share counters.
#[derive(Debug, Default)]
pub struct PipelineContext {
    /// Content protected from later stages, keyed by placeholder token.
    pub placeholders: PlaceholderTable,

    /// Headings in document order, collected by the block stage.
    pub headings: Vec<Heading>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }
}

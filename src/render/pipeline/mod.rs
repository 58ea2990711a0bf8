//! Conversion pipeline for markdown documents.
//!
//! The pipeline transforms one document through a series of stages:
//! 1. Fence protection (code and diagram blocks become placeholders)
//! 2. Inline code protection (code spans and math spans become placeholders)
//! 3. Block conversion (headings, rules, quotes, lists, tables)
//! 4. Inline conversion (emphasis, strikethrough, links, images)
//! 5. Extension conversion (footnotes, highlight, super/subscript, paragraphs)
//! 6. Restoration (code placeholders replaced by their HTML)
//! 7. Math conversion (math placeholders replaced last)
//!
//! Stages run strictly in order and never fail: malformed markup is left
//! as literal text.

mod context;
mod document;
pub(crate) mod markup;
pub(crate) mod placeholder;
mod stages;

pub use context::PipelineContext;
pub use document::ProcessingDocument;

use stages::{
    BlockStage, ExtensionStage, FenceStage, InlineCodeStage, InlineStage, MathStage,
    RestoreStage,
};

/// A stage in the conversion pipeline.
///
/// Each stage receives the document and rewrites its content in place.
/// The `ctx` carries the per-conversion placeholder table and heading list.
pub trait Stage: Send + Sync {
    /// Unique name for this stage.
    fn name(&self) -> &'static str;

    /// Process the document through this stage.
    fn process(&self, doc: &mut ProcessingDocument, ctx: &mut PipelineContext);
}

/// The document conversion pipeline.
///
/// The default pipeline is:
/// fence → inline_code → blocks → inline → extensions → restore → math.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Create an empty pipeline with no stages.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Create the default pipeline with the standard stages.
    pub fn default_pipeline() -> Self {
        let mut pipeline = Self::new();
        pipeline.add_stage(FenceStage);
        pipeline.add_stage(InlineCodeStage);
        pipeline.add_stage(BlockStage);
        pipeline.add_stage(InlineStage);
        pipeline.add_stage(ExtensionStage);
        pipeline.add_stage(RestoreStage);
        pipeline.add_stage(MathStage);
        pipeline
    }

    /// Add a stage to the end of the pipeline.
    pub fn add_stage<S: Stage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Run every stage on the document, in order.
    pub fn run(&self, doc: &mut ProcessingDocument, ctx: &mut PipelineContext) {
        for stage in &self.stages {
            let _span = tracing::trace_span!("stage", name = stage.name()).entered();
            stage.process(doc, ctx);
            doc.completed.push(stage.name());
            tracing::trace!(
                bytes = doc.content.len(),
                placeholders = ctx.placeholders.len(),
                "stage complete"
            );
        }
    }

    /// Get the names of all stages in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::default_pipeline()
    }
}

//! Code placeholder restoration stage.

use crate::render::pipeline::placeholder::substitute;
use crate::render::pipeline::{PipelineContext, ProcessingDocument, Stage};

/// Stage that substitutes fenced block and inline code placeholders with
/// their finished HTML. Math placeholders are left for the final stage.
pub struct RestoreStage;

impl Stage for RestoreStage {
    fn name(&self) -> &'static str {
        "restore"
    }

    fn process(&self, doc: &mut ProcessingDocument, ctx: &mut PipelineContext) {
        let table = &ctx.placeholders;
        doc.content = substitute(&doc.content, |token| {
            if token.kind.is_math() {
                return None;
            }
            table.get(token.index).map(|entry| entry.html.clone())
        });
    }
}

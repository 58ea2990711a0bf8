//! Math conversion, the last stage of the pipeline.

use crate::render::pipeline::placeholder::{PlaceholderKind, substitute};
use crate::render::pipeline::{PipelineContext, ProcessingDocument, Stage};

/// Stage that wraps math placeholders in the elements a math typesetter
/// picks up on the client.
pub struct MathStage;

impl Stage for MathStage {
    fn name(&self) -> &'static str {
        "math"
    }

    fn process(&self, doc: &mut ProcessingDocument, ctx: &mut PipelineContext) {
        let table = &ctx.placeholders;
        doc.content = substitute(&doc.content, |token| {
            let entry = table.get(token.index)?;
            match token.kind {
                PlaceholderKind::DisplayMath => {
                    Some(format!(r#"<div class="math-block">{}</div>"#, entry.html))
                }
                PlaceholderKind::InlineMath => {
                    Some(format!(r#"<span class="math-inline">{}</span>"#, entry.html))
                }
                _ => None,
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_math() {
        let mut ctx = PipelineContext::new();
        let block = ctx
            .placeholders
            .insert(PlaceholderKind::DisplayMath, "a^2".into(), "a^2");
        let inline = ctx
            .placeholders
            .insert(PlaceholderKind::InlineMath, "x&lt;y".into(), "x<y");

        let mut doc = ProcessingDocument::new("");
        doc.content = format!("{block}\n<p>{inline}</p>");
        MathStage.process(&mut doc, &mut ctx);

        assert_eq!(
            doc.content,
            "<div class=\"math-block\">a^2</div>\n<p><span class=\"math-inline\">x&lt;y</span></p>"
        );
    }
}

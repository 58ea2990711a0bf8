//! Command implementations for the `markpane` binary.

pub mod convert;
pub mod init;
pub mod watch;

use markpane::preview::{DocumentShell, PageContext, SourceDocument};
use markpane::render::Rendered;

/// What a conversion writes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// The bare HTML fragment
    Fragment,
    /// The fragment embedded in the document shell
    Standalone,
    /// `{ "html": ..., "headings": [...] }`
    Json,
}

/// Format a converted document for writing.
pub fn format_output(
    format: OutputFormat,
    doc: &SourceDocument,
    rendered: Rendered,
    shell: &DocumentShell,
) -> Result<String, anyhow::Error> {
    let mut text = match format {
        OutputFormat::Fragment => rendered.html,
        OutputFormat::Json => serde_json::to_string_pretty(&rendered)?,
        OutputFormat::Standalone => {
            let context = PageContext::new(doc, rendered, shell.config());
            shell.render_page(&context)?
        }
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}

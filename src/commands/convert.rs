use std::path::Path;

use anyhow::Context;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use markpane::MarkdownEngine;
use markpane::config::MarkpaneConfig;
use markpane::preview::{DocumentShell, SourceDocument};

use super::{OutputFormat, format_output};
use crate::ConvertArgs;

pub async fn run(args: &ConvertArgs) -> Result<(), anyhow::Error> {
    let config = MarkpaneConfig::load_from_arg(args.config_file.as_deref())?;

    let from_stdin = args.input == Path::new("-");
    let raw = if from_stdin {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("failed to read standard input")?;
        raw
    } else {
        tokio::fs::read_to_string(&args.input)
            .await
            .with_context(|| format!("failed to read {}", args.input.display()))?
    };

    let path = (!from_stdin).then(|| args.input.clone());
    let doc = SourceDocument::new(path, &raw, config.front_matter);

    let rendered = MarkdownEngine::new().render(&doc.markdown);
    tracing::info!(
        headings = rendered.headings.len(),
        bytes = rendered.html.len(),
        "converted {}",
        args.input.display()
    );

    let format = if args.json {
        OutputFormat::Json
    } else if args.standalone {
        OutputFormat::Standalone
    } else {
        OutputFormat::Fragment
    };
    let shell = DocumentShell::new(config.shell)?;
    let text = format_output(format, &doc, rendered, &shell)?;

    match &args.output {
        Some(output) => {
            tokio::fs::write(output, text)
                .await
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Wrote {}", output.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(text.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

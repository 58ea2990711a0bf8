use std::path::{Path, PathBuf};

use anyhow::Context;

use markpane::MarkdownEngine;
use markpane::config::{MarkpaneConfig, resolve_config_path};
use markpane::preview::{
    DocumentShell, FileWatcher, InvalidationScope, RenderCache, SourceDocument, WatchEvent,
    WatchPaths, invalidation_scope,
};

use super::{OutputFormat, format_output};
use crate::WatchArgs;

/// State carried between conversions while watching.
struct Session {
    input: PathBuf,
    output: PathBuf,
    format: OutputFormat,
    config_arg: Option<PathBuf>,
    config: MarkpaneConfig,
    shell: DocumentShell,
    engine: MarkdownEngine,
    cache: RenderCache,
}

impl Session {
    /// Convert the input and write the output if the content changed.
    fn convert(&mut self) -> Result<bool, anyhow::Error> {
        let raw = std::fs::read_to_string(&self.input)
            .with_context(|| format!("failed to read {}", self.input.display()))?;
        let doc = SourceDocument::new(Some(self.input.clone()), &raw, self.config.front_matter);

        let (rendered, fresh) = self
            .cache
            .get_or_render(&self.engine, &self.input, &doc);
        if !fresh {
            return Ok(false);
        }

        let text = format_output(self.format, &doc, rendered.clone(), &self.shell)?;
        std::fs::write(&self.output, text)
            .with_context(|| format!("failed to write {}", self.output.display()))?;
        Ok(true)
    }

    /// Reload the config and shell, keeping the current ones on failure.
    fn reload_config(&mut self) -> Result<(), anyhow::Error> {
        let config = MarkpaneConfig::load_from_arg(self.config_arg.as_deref())?;
        self.shell = DocumentShell::new(config.shell.clone())?;
        self.config = config;
        // Front matter handling or the shell may have changed
        self.cache.clear();
        Ok(())
    }

    fn handle(&mut self, scope: InvalidationScope) {
        match scope {
            InvalidationScope::None => {}
            InvalidationScope::Full => {
                if let Err(e) = self.reload_config() {
                    tracing::warn!("keeping previous config: {e:#}");
                    return;
                }
                println!("Config changed, reloaded");
                self.convert_and_report();
            }
            InvalidationScope::Sources(_) => self.convert_and_report(),
        }
    }

    fn convert_and_report(&mut self) {
        match self.convert() {
            Ok(true) => println!("Converted {}", display_name(&self.input)),
            Ok(false) => tracing::info!("{} unchanged", display_name(&self.input)),
            Err(e) => eprintln!("Conversion error: {e:#}"),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub async fn run(args: &WatchArgs) -> Result<(), anyhow::Error> {
    let config_path = resolve_config_path(args.config_file.as_deref())?;
    let config = MarkpaneConfig::load_from_arg(args.config_file.as_deref())?;

    // Canonicalize the path to ensure consistent matching with file events
    let input = args
        .input
        .canonicalize()
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    let config_path = config_path.map(|p| p.canonicalize().unwrap_or(p));

    let format = if args.fragment {
        OutputFormat::Fragment
    } else {
        OutputFormat::Standalone
    };

    let mut session = Session {
        input: input.clone(),
        output: args.output.clone(),
        format,
        config_arg: config_path.clone(),
        shell: DocumentShell::new(config.shell.clone())?,
        config,
        engine: MarkdownEngine::new(),
        cache: RenderCache::new(),
    };

    session.convert()?;
    println!(
        "Converted {} to {}",
        display_name(&input),
        args.output.display()
    );

    let watch_paths = WatchPaths {
        sources: vec![input],
        config_path,
    };
    let watcher = FileWatcher::new(&session.config.watch, &watch_paths)?;
    println!("Watching for changes... (press Ctrl+C to stop)");

    let watch_loop = tokio::task::spawn_blocking(move || {
        while let Some(event) = watcher.recv() {
            match event {
                WatchEvent::FilesChanged(changes) => {
                    tracing::debug!(?changes, "files changed");
                    session.handle(invalidation_scope(&changes));
                }
                WatchEvent::Error(e) => {
                    eprintln!("Watch error: {e}");
                }
            }
        }
    });

    tokio::select! {
        result = watch_loop => {
            result.context("watch loop failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nStopped watching");
        }
    }

    Ok(())
}

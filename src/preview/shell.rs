//! The HTML document shell wrapped around converted fragments.

use std::collections::HashMap;

use serde::Serialize;
use tera::{Context, Tera};

use crate::config::ShellConfig;
use crate::render::{Heading, Rendered};

use super::document::SourceDocument;

const PAGE_TEMPLATE_NAME: &str = "page.html";
const PAGE_TEMPLATE: &str = include_str!("../../templates/page.html");

#[derive(thiserror::Error, Debug)]
pub enum ShellError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

/// Context passed to the page template.
#[derive(Debug, Serialize)]
pub struct PageContext {
    pub page: PageInfo,
    /// The converted HTML fragment, inserted unescaped
    pub content: String,
    /// Headings for the table of contents; empty when the toc is off
    pub toc: Vec<Heading>,
}

/// Information about the current page.
#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub title: String,
    pub description: Option<String>,
    /// Custom front matter fields (flattened to top level, e.g., `page.author`)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl PageContext {
    /// Assemble the page context for a converted document.
    pub fn new(doc: &SourceDocument, rendered: Rendered, shell: &ShellConfig) -> Self {
        let title = doc
            .title(&rendered.headings)
            .unwrap_or_else(|| shell.title.clone());
        let toc = if shell.toc {
            rendered.headings
        } else {
            Vec::new()
        };

        Self {
            page: PageInfo {
                title,
                description: doc.front_matter.description.clone(),
                extra: doc.front_matter.extra.clone(),
            },
            content: rendered.html,
            toc,
        }
    }
}

/// Renders standalone HTML pages.
pub struct DocumentShell {
    tera: Tera,
    shell: ShellConfig,
}

impl DocumentShell {
    /// Create a shell using the built-in page template.
    pub fn new(shell: ShellConfig) -> Result<Self, ShellError> {
        let mut tera = Tera::default();
        tera.add_raw_template(PAGE_TEMPLATE_NAME, PAGE_TEMPLATE)?;
        Ok(Self { tera, shell })
    }

    /// Render a full HTML page around the given context.
    pub fn render_page(&self, context: &PageContext) -> Result<String, ShellError> {
        let mut tera_context = Context::new();
        tera_context.insert("page", &context.page);
        tera_context.insert("content", &context.content);
        tera_context.insert("toc", &context.toc);
        tera_context.insert("shell", &self.shell);
        tera_context.insert("version", env!("CARGO_PKG_VERSION"));

        Ok(self.tera.render(PAGE_TEMPLATE_NAME, &tera_context)?)
    }

    pub fn config(&self) -> &ShellConfig {
        &self.shell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MarkpaneConfig, Theme, default_yaml};
    use crate::render::MarkdownEngine;

    fn shell_config() -> ShellConfig {
        let config: MarkpaneConfig = serde_yaml::from_str(default_yaml()).unwrap();
        config.shell
    }

    fn page(markdown: &str, shell: &ShellConfig) -> PageContext {
        let doc = SourceDocument::new(None, markdown, true);
        let rendered = MarkdownEngine::new().render(&doc.markdown);
        PageContext::new(&doc, rendered, shell)
    }

    #[test]
    fn test_page_embeds_fragment_unescaped() {
        let config = shell_config();
        let shell = DocumentShell::new(config.clone()).unwrap();
        let html = shell.render_page(&page("# Hello\n\n**bold**", &config)).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<h1 id="hello">Hello</h1>"#));
        assert!(html.contains("<p><strong>bold</strong></p>"));
        assert!(html.contains("<title>Hello</title>"));
    }

    #[test]
    fn test_title_is_escaped() {
        let config = shell_config();
        let shell = DocumentShell::new(config.clone()).unwrap();
        let html = shell
            .render_page(&page("---\ntitle: \"a <b> c\"\n---\ntext", &config))
            .unwrap();
        assert!(html.contains("<title>a &lt;b&gt; c</title>"));
    }

    #[test]
    fn test_falls_back_to_configured_title() {
        let config = shell_config();
        let context = page("no headings here", &config);
        assert_eq!(context.page.title, "Untitled");
    }

    #[test]
    fn test_libraries_follow_config() {
        let mut config = shell_config();
        let shell = DocumentShell::new(config.clone()).unwrap();
        let html = shell.render_page(&page("text", &config)).unwrap();
        assert!(html.contains("katex.min.js"));
        assert!(html.contains("hljs.highlightAll()"));
        assert!(html.contains("mermaid.initialize"));
        assert!(html.contains("plantumlEncoder.encode"));

        config.math.enabled = false;
        config.mermaid.enabled = false;
        config.plantuml.enabled = false;
        let shell = DocumentShell::new(config.clone()).unwrap();
        let html = shell.render_page(&page("text", &config)).unwrap();
        assert!(!html.contains("katex"));
        assert!(!html.contains("mermaid.initialize"));
        assert!(!html.contains("plantumlEncoder"));
    }

    #[test]
    fn test_toc_only_when_enabled() {
        let mut config = shell_config();
        let markdown = "# One\n\n## Two";

        let shell = DocumentShell::new(config.clone()).unwrap();
        let html = shell.render_page(&page(markdown, &config)).unwrap();
        assert!(!html.contains(r#"<nav class="toc">"#));

        config.toc = true;
        let shell = DocumentShell::new(config.clone()).unwrap();
        let html = shell.render_page(&page(markdown, &config)).unwrap();
        assert!(html.contains(r#"<nav class="toc">"#));
        assert!(html.contains(r##"<li class="toc-h2"><a href="#two">Two</a></li>"##));
    }

    #[test]
    fn test_theme_attribute() {
        let mut config = shell_config();
        config.theme = Theme::Dark;
        let shell = DocumentShell::new(config.clone()).unwrap();
        let html = shell.render_page(&page("x", &config)).unwrap();
        assert!(html.contains(r#"<html lang="en" data-theme="dark">"#));
    }
}

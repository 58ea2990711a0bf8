//! Configuration types for markpane.

use serde::{Deserialize, Serialize};

/// The top-level configuration, as layered from the embedded defaults,
/// `markpane.yaml` and the environment.
///
/// Every key has a value in the embedded defaults, so user files only need
/// to name what they change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkpaneConfig {
    /// Strip a leading YAML front matter block before converting.
    pub front_matter: bool,
    /// The document shell used for standalone output.
    pub shell: ShellConfig,
    /// File watching for the `watch` command.
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Color scheme of the document shell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    /// Follow the viewer's `prefers-color-scheme`
    #[default]
    Auto,
}

/// Configuration for the HTML document shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Page title when the document provides none
    pub title: String,
    #[serde(default)]
    pub theme: Theme,
    /// Render a table of contents from the document headings
    #[serde(default)]
    pub toc: bool,
    /// Extra stylesheets, linked after the built-in styles
    #[serde(default)]
    pub stylesheets: Vec<String>,
    /// Client-side syntax highlighting of `language-*` code blocks
    pub highlight: LibraryConfig,
    /// Client-side typesetting of `math-inline` and `math-block` elements
    pub math: LibraryConfig,
    /// Client-side rendering of `mermaid` diagram blocks
    pub mermaid: LibraryConfig,
    /// Rendering of `plantuml` diagram blocks through a PlantUML server
    pub plantuml: PlantumlConfig,
}

/// A client-side library the shell may load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub enabled: bool,
    pub stylesheet: Option<String>,
    pub script: Option<String>,
}

/// PlantUML rendering: an encoder script plus the server that draws SVGs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantumlConfig {
    pub enabled: bool,
    pub script: Option<String>,
    pub server: Option<String>,
}

/// Configuration for file watching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Use polling-based watcher instead of native file system events.
    /// Useful for network filesystems, Docker volumes, or other situations
    /// where native events are unreliable.
    #[serde(default)]
    pub poll: bool,
    /// Poll interval in milliseconds (only used if poll=true).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Debounce timeout in milliseconds.
    /// Changes within this window are batched together.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll: false,
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

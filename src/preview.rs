//! Previewing documents: front matter, the HTML document shell, render
//! caching and file watching. The conversion engine itself knows nothing
//! about any of these.

mod cache;
mod document;
mod shell;
mod watch;

pub use cache::{ChangeKind, InvalidationScope, RenderCache, content_hash, invalidation_scope};
pub use document::{FrontMatter, ParsedContent, SourceDocument, parse_front_matter};
pub use shell::{DocumentShell, PageContext, ShellError};
pub use watch::{FileWatcher, PathClassifier, WatchError, WatchEvent, WatchPaths};

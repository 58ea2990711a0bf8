//! Render cache for watch mode.
//!
//! Tracks a content hash per source file so that saving a file without
//! changing it (or touching it) does not re-render it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::document::SourceDocument;
use crate::render::{MarkdownEngine, Rendered};

// =============================================================================
// Change detection types
// =============================================================================

/// What kind of change was detected in the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// The watched markdown file was modified, created or deleted.
    Source { path: PathBuf, deleted: bool },
    /// The config file changed.
    Config,
}

/// What needs redoing based on a batch of changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationScope {
    /// Nothing relevant changed.
    None,
    /// Re-read and re-render these sources.
    Sources(Vec<PathBuf>),
    /// Reload config and re-render everything.
    Full,
}

/// Determine the invalidation scope for a batch of changes.
///
/// Deleted sources are skipped since there is nothing left to render;
/// the previous output stays in place.
pub fn invalidation_scope(changes: &[ChangeKind]) -> InvalidationScope {
    let mut sources: Vec<PathBuf> = Vec::new();

    for change in changes {
        match change {
            ChangeKind::Config => return InvalidationScope::Full,
            ChangeKind::Source { deleted: true, .. } => {}
            ChangeKind::Source { path, .. } => {
                if !sources.contains(path) {
                    sources.push(path.clone());
                }
            }
        }
    }

    if sources.is_empty() {
        InvalidationScope::None
    } else {
        InvalidationScope::Sources(sources)
    }
}

// =============================================================================
// Render cache
// =============================================================================

/// Hex-encoded SHA-256 of the given content.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug)]
struct CachedRender {
    hash: String,
    rendered: Rendered,
}

/// Rendered output keyed by source path and the hash of the raw source.
#[derive(Debug, Default)]
pub struct RenderCache {
    entries: HashMap<PathBuf, CachedRender>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached render for `path` if the document's raw source is
    /// unchanged, otherwise render it and cache the result.
    ///
    /// The raw source includes any front matter, so a metadata-only edit
    /// still counts as a change. The flag is `true` when a fresh render
    /// happened.
    pub fn get_or_render(
        &mut self,
        engine: &MarkdownEngine,
        path: &Path,
        doc: &SourceDocument,
    ) -> (&Rendered, bool) {
        let fresh = self
            .entries
            .get(path)
            .is_none_or(|cached| cached.hash != doc.content_hash);

        if fresh {
            let rendered = engine.render(&doc.markdown);
            let hash = doc.content_hash.clone();
            self.entries
                .insert(path.to_path_buf(), CachedRender { hash, rendered });
        } else {
            tracing::debug!(path = %path.display(), "content unchanged, skipping render");
        }

        // Present in both branches
        let entry = &self.entries[path];
        (&entry.rendered, fresh)
    }

    /// Drop every cached render.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_config_change_is_full() {
        let changes = vec![
            ChangeKind::Source {
                path: PathBuf::from("a.md"),
                deleted: false,
            },
            ChangeKind::Config,
        ];
        assert_eq!(invalidation_scope(&changes), InvalidationScope::Full);
    }

    #[test]
    fn test_source_changes_are_deduplicated() {
        let change = ChangeKind::Source {
            path: PathBuf::from("a.md"),
            deleted: false,
        };
        assert_eq!(
            invalidation_scope(&[change.clone(), change]),
            InvalidationScope::Sources(vec![PathBuf::from("a.md")])
        );
    }

    #[test]
    fn test_deleted_source_needs_nothing() {
        let changes = vec![ChangeKind::Source {
            path: PathBuf::from("a.md"),
            deleted: true,
        }];
        assert_eq!(invalidation_scope(&changes), InvalidationScope::None);
        assert_eq!(invalidation_scope(&[]), InvalidationScope::None);
    }

    #[test]
    fn test_cache_skips_unchanged_content() {
        let engine = MarkdownEngine::new();
        let mut cache = RenderCache::new();
        let path = Path::new("doc.md");

        let doc = SourceDocument::new(None, "# Title", true);
        let (rendered, fresh) = cache.get_or_render(&engine, path, &doc);
        assert!(fresh);
        assert_eq!(rendered.headings.len(), 1);

        let (_, fresh) = cache.get_or_render(&engine, path, &doc);
        assert!(!fresh);

        let doc = SourceDocument::new(None, "# Other", true);
        let (rendered, fresh) = cache.get_or_render(&engine, path, &doc);
        assert!(fresh);
        assert_eq!(rendered.headings[0].id, "other");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_front_matter_edit_is_a_change() {
        let engine = MarkdownEngine::new();
        let mut cache = RenderCache::new();
        let path = Path::new("doc.md");

        let old = SourceDocument::new(None, "---\ntitle: Old\n---\nbody", true);
        let new = SourceDocument::new(None, "---\ntitle: New\n---\nbody", true);
        assert_eq!(old.markdown, new.markdown);

        let (_, fresh) = cache.get_or_render(&engine, path, &old);
        assert!(fresh);
        let (_, fresh) = cache.get_or_render(&engine, path, &new);
        assert!(fresh);
    }

    #[test]
    fn test_cache_clear() {
        let engine = MarkdownEngine::new();
        let mut cache = RenderCache::new();
        cache.get_or_render(&engine, Path::new("a.md"), &SourceDocument::new(None, "a", true));
        cache.get_or_render(&engine, Path::new("b.md"), &SourceDocument::new(None, "b", true));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}

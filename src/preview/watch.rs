//! File watching for automatic re-conversion.
//!
//! Uses `notify-debouncer-full` to watch the source files and the config
//! file for changes.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{
    Config as NotifyConfig, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher,
};
use notify_debouncer_full::{
    DebounceEventResult, Debouncer, RecommendedCache, new_debouncer, new_debouncer_opt,
};

use super::cache::ChangeKind;
use crate::config::WatchConfig;

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("nothing to watch: {0} has no parent directory")]
    NoParent(PathBuf),
}

// =============================================================================
// Watch events
// =============================================================================

/// Events sent from the file watcher.
#[derive(Debug)]
pub enum WatchEvent {
    /// Files changed, re-conversion may be needed.
    FilesChanged(Vec<ChangeKind>),
    /// Watcher error occurred.
    Error(String),
}

// =============================================================================
// Path classification
// =============================================================================

/// Paths to watch for changes. All paths should be absolute.
#[derive(Debug, Clone)]
pub struct WatchPaths {
    /// Markdown files being converted.
    pub sources: Vec<PathBuf>,
    /// Config file path, if one is in use.
    pub config_path: Option<PathBuf>,
}

impl WatchPaths {
    /// Directories to register with the watcher.
    ///
    /// Editors often save by writing a temporary file and renaming it over
    /// the original, which drops a watch placed on the file itself, so the
    /// parent directories are watched instead.
    fn directories(&self) -> Result<Vec<PathBuf>, WatchError> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        for path in self.sources.iter().chain(self.config_path.iter()) {
            let parent = path
                .parent()
                .ok_or_else(|| WatchError::NoParent(path.clone()))?;
            if !dirs.iter().any(|d| d == parent) {
                dirs.push(parent.to_path_buf());
            }
        }
        Ok(dirs)
    }
}

/// Classifies file paths into change types.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    sources: Vec<PathBuf>,
    config_path: Option<PathBuf>,
}

impl PathClassifier {
    /// Create a new path classifier.
    pub fn new(paths: &WatchPaths) -> Self {
        Self {
            sources: paths.sources.clone(),
            config_path: paths.config_path.clone(),
        }
    }

    /// Classify a changed path into a ChangeKind.
    ///
    /// Sibling files in the watched directories are ignored.
    pub fn classify(&self, path: &Path, deleted: bool) -> Option<ChangeKind> {
        if self.config_path.as_deref() == Some(path) {
            return Some(ChangeKind::Config);
        }

        self.sources
            .iter()
            .any(|source| source == path)
            .then(|| ChangeKind::Source {
                path: path.to_path_buf(),
                deleted,
            })
    }
}

// =============================================================================
// File watcher
// =============================================================================

/// A file watcher that can use either native or polling backend.
pub enum FileWatcher {
    /// Native file system watcher (recommended for local editing).
    Native {
        _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
    /// Polling-based watcher (for network filesystems, Docker, etc.).
    Polling {
        _debouncer: Debouncer<PollWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
}

impl FileWatcher {
    /// Create a new file watcher.
    pub fn new(config: &WatchConfig, paths: &WatchPaths) -> Result<Self, WatchError> {
        let debounce_timeout = Duration::from_millis(config.debounce_ms);
        let directories = paths.directories()?;

        let (tx, rx) = mpsc::channel();

        let classifier = PathClassifier::new(paths);
        let callback = move |result: DebounceEventResult| match result {
            Ok(events) => {
                let mut changes: Vec<ChangeKind> = Vec::new();
                for event in events.iter().filter(|e| is_relevant_event(&e.kind)) {
                    let deleted = matches!(event.kind, EventKind::Remove(_));
                    // Renames report both the old and the new path
                    for change in event
                        .paths
                        .iter()
                        .filter_map(|p| classifier.classify(p, deleted))
                    {
                        if !changes.contains(&change) {
                            changes.push(change);
                        }
                    }
                }

                if !changes.is_empty() {
                    let _ = tx.send(WatchEvent::FilesChanged(changes));
                }
            }
            Err(errors) => {
                for e in errors {
                    let _ = tx.send(WatchEvent::Error(e.to_string()));
                }
            }
        };

        if config.poll {
            let poll_interval = Duration::from_millis(config.poll_interval_ms);
            let notify_config = NotifyConfig::default().with_poll_interval(poll_interval);

            let mut debouncer = new_debouncer_opt::<_, PollWatcher, RecommendedCache>(
                debounce_timeout,
                None,
                callback,
                RecommendedCache::default(),
                notify_config,
            )
            .map_err(WatchError::Notify)?;

            watch_directories(&mut debouncer, &directories)?;

            Ok(FileWatcher::Polling {
                _debouncer: debouncer,
                rx,
            })
        } else {
            let mut debouncer =
                new_debouncer(debounce_timeout, None, callback).map_err(WatchError::Notify)?;

            watch_directories(&mut debouncer, &directories)?;

            Ok(FileWatcher::Native {
                _debouncer: debouncer,
                rx,
            })
        }
    }

    /// Receive the next watch event (blocking).
    pub fn recv(&self) -> Option<WatchEvent> {
        match self {
            FileWatcher::Native { rx, .. } => rx.recv().ok(),
            FileWatcher::Polling { rx, .. } => rx.recv().ok(),
        }
    }
}

fn watch_directories<W: Watcher, C: notify_debouncer_full::FileIdCache>(
    debouncer: &mut Debouncer<W, C>,
    directories: &[PathBuf],
) -> Result<(), WatchError> {
    for dir in directories {
        tracing::debug!(dir = %dir.display(), "watching");
        debouncer.watch(dir, RecursiveMode::NonRecursive)?;
    }
    Ok(())
}

/// Check if an event kind is relevant for re-conversion.
fn is_relevant_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind};

    fn paths() -> WatchPaths {
        WatchPaths {
            sources: vec![PathBuf::from("/docs/guide.md")],
            config_path: Some(PathBuf::from("/project/markpane.yaml")),
        }
    }

    #[test]
    fn test_classify_source_and_config() {
        let classifier = PathClassifier::new(&paths());
        assert_eq!(
            classifier.classify(Path::new("/docs/guide.md"), false),
            Some(ChangeKind::Source {
                path: PathBuf::from("/docs/guide.md"),
                deleted: false,
            })
        );
        assert_eq!(
            classifier.classify(Path::new("/project/markpane.yaml"), false),
            Some(ChangeKind::Config)
        );
    }

    #[test]
    fn test_classify_ignores_siblings() {
        let classifier = PathClassifier::new(&paths());
        assert_eq!(classifier.classify(Path::new("/docs/other.md"), false), None);
        assert_eq!(
            classifier.classify(Path::new("/docs/.guide.md.swp"), false),
            None
        );
    }

    #[test]
    fn test_directories_are_deduplicated() {
        let paths = WatchPaths {
            sources: vec![PathBuf::from("/docs/a.md"), PathBuf::from("/docs/b.md")],
            config_path: Some(PathBuf::from("/docs/markpane.yaml")),
        };
        assert_eq!(paths.directories().unwrap(), vec![PathBuf::from("/docs")]);
    }

    #[test]
    fn test_relevant_events() {
        assert!(is_relevant_event(&EventKind::Create(CreateKind::File)));
        assert!(is_relevant_event(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
        assert!(!is_relevant_event(&EventKind::Access(AccessKind::Read)));
        assert!(!is_relevant_event(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Permissions
        ))));
    }
}

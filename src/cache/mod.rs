//! File content cache with change-triggered invalidation
//!
//! A read-through cache mapping an absolute filesystem path to its text
//! contents. Entries are evicted when the underlying file changes (push
//! invalidation), never by time-to-live. There is no size bound or LRU
//! policy: the cache holds at most one entry per distinct file ever
//! requested, so growth is bounded by the files it serves.

use anyhow::anyhow;
use dashmap::{DashMap, DashSet};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::Error;

/// Callback invoked when a watched file changes
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Filesystem-change notification primitive
///
/// Abstracted behind a trait so the cache can be driven deterministically
/// in tests by a fake notifier.
pub trait ChangeNotifier: Send + Sync {
    /// Register `on_change` to fire whenever the file at `path` is
    /// modified, renamed or deleted
    fn subscribe(&self, path: &Path, on_change: ChangeCallback) -> anyhow::Result<()>;
}

/// Read-through file cache keyed by absolute path
///
/// The cache exclusively owns the stored text; callers receive shared
/// read-only views. Concurrent readers are supported without cross-request
/// locking: a race where two requests miss simultaneously and both
/// read-and-store the same path is harmless, since the values are identical
/// and the write is idempotent.
pub struct FileCache {
    entries: Arc<DashMap<PathBuf, Arc<str>>>,
    watched: DashSet<PathBuf>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl FileCache {
    /// Create a cache that invalidates through the given notifier
    pub fn new(notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            watched: DashSet::new(),
            notifier,
        }
    }

    /// Return the text contents of `path`, from cache when possible
    ///
    /// On a miss the whole file is read, stored under the path, and a watch
    /// is registered so any future change to that exact path evicts the
    /// entry. On a hit the stored text is returned without touching disk.
    pub fn get_text(&self, path: &Path) -> Result<Arc<str>, Error> {
        if let Some(entry) = self.entries.get(path) {
            tracing::trace!("cache hit: {}", path.display());
            return Ok(Arc::clone(entry.value()));
        }

        tracing::debug!("cache miss, reading: {}", path.display());
        let text: Arc<str> = Arc::from(read_text_from_file(path)?);
        self.store(path, Arc::clone(&text));
        Ok(text)
    }

    /// Peek at a cached entry without reading from disk on a miss
    ///
    /// Used by the template resolver, which stores a transformed payload
    /// under the template's path rather than the raw file text.
    pub fn lookup(&self, path: &Path) -> Option<Arc<str>> {
        self.entries.get(path).map(|e| Arc::clone(e.value()))
    }

    /// Store `text` under `path` with the same file-change invalidation as
    /// a read-through entry
    pub fn put(&self, path: &Path, text: Arc<str>) {
        self.store(path, text);
    }

    /// Remove the entry for `path`, if any
    pub fn invalidate(&self, path: &Path) {
        if self.entries.remove(path).is_some() {
            tracing::debug!("cache invalidated: {}", path.display());
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // An entry is never stored unwatched: if the watch cannot be
    // registered the text is served uncached, which only costs a re-read,
    // while an unwatched entry could go stale forever.
    fn store(&self, path: &Path, text: Arc<str>) {
        if let Err(e) = self.ensure_watch(path) {
            tracing::warn!("not caching {}, watch failed: {}", path.display(), e);
            return;
        }
        self.entries.insert(path.to_path_buf(), text);
    }

    // The watch survives eviction, so each path is subscribed at most once
    // for the lifetime of the cache.
    fn ensure_watch(&self, path: &Path) -> anyhow::Result<()> {
        if self.watched.contains(path) {
            return Ok(());
        }
        let entries = Arc::clone(&self.entries);
        let key = path.to_path_buf();
        self.notifier.subscribe(
            path,
            Arc::new(move || {
                if entries.remove(&key).is_some() {
                    tracing::debug!("cache invalidated: {}", key.display());
                }
            }),
        )?;
        self.watched.insert(path.to_path_buf());
        Ok(())
    }
}

/// Read the whole file as text, classifying I/O failures
pub fn read_text_from_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|e| Error::from_io(path, e))
}

/// `ChangeNotifier` backed by the platform filesystem watcher
///
/// Watches the parent directory of each subscribed file (non-recursively)
/// and dispatches events to the callback registered for the exact path.
/// Watching the directory instead of the file keeps notifications working
/// across delete-and-recreate, which editors commonly do on save.
pub struct NotifyWatcher {
    watcher: Mutex<RecommendedWatcher>,
    callbacks: Arc<DashMap<PathBuf, ChangeCallback>>,
    watched_dirs: DashSet<PathBuf>,
}

impl NotifyWatcher {
    /// Create a watcher with its event-dispatch handler
    pub fn new() -> anyhow::Result<Self> {
        let callbacks: Arc<DashMap<PathBuf, ChangeCallback>> = Arc::new(DashMap::new());
        let dispatch = Arc::clone(&callbacks);

        let watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        // Access events do not change file contents
                        if matches!(event.kind, EventKind::Access(_)) {
                            return;
                        }
                        for path in &event.paths {
                            if let Some(cb) = dispatch.get(path) {
                                (cb.value())();
                            }
                        }
                    }
                    Err(e) => tracing::error!("file watch error: {}", e),
                }
            })?;

        Ok(Self {
            watcher: Mutex::new(watcher),
            callbacks,
            watched_dirs: DashSet::new(),
        })
    }
}

impl ChangeNotifier for NotifyWatcher {
    fn subscribe(&self, path: &Path, on_change: ChangeCallback) -> anyhow::Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| anyhow!("path has no parent directory: {}", path.display()))?;

        if !self.watched_dirs.contains(dir) {
            let mut watcher = self
                .watcher
                .lock()
                .map_err(|_| anyhow!("watcher lock poisoned"))?;
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            drop(watcher);
            self.watched_dirs.insert(dir.to_path_buf());
            tracing::debug!("watching directory: {}", dir.display());
        }

        self.callbacks.insert(path.to_path_buf(), on_change);
        Ok(())
    }
}

use crate::wml::Document;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

/// Absolute canonical form of a path: symlinks resolved where the file
/// exists, otherwise anchored at the current directory.
pub fn normalize_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

/// A cached document plus the metadata the cache needs: mtime baseline
/// for external-change detection, last access for LRU ordering, and a
/// dirty flag for save-on-evict.
pub struct CachedDocument {
    pub path: PathBuf,
    pub document: Document,
    pub author: String,
    mtime: Option<SystemTime>,
    last_access: Instant,
    dirty: bool,
}

impl CachedDocument {
    pub fn new(path: impl AsRef<Path>, document: Document, author: &str) -> Self {
        let path = normalize_path(path.as_ref());
        let mtime = file_mtime(&path);
        Self {
            path,
            document,
            author: author.to_string(),
            mtime,
            last_access: Instant::now(),
            dirty: false,
        }
    }

    pub fn touch(&mut self) {
        self.last_access = Instant::now();
    }

    pub fn last_access(&self) -> Instant {
        self.last_access
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True when the on-disk mtime no longer matches the baseline taken
    /// at open (or at the last `update_mtime`). A missing file is not
    /// an external change.
    pub fn has_external_changes(&self) -> bool {
        match file_mtime(&self.path) {
            Some(current) => self.mtime != Some(current),
            None => false,
        }
    }

    pub fn update_mtime(&mut self) {
        self.mtime = file_mtime(&self.path);
    }
}

fn file_mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// LRU cache of open documents with session author memory.
pub struct DocumentCache {
    max_documents: usize,
    cache: HashMap<PathBuf, CachedDocument>,
    session_author: Option<String>,
}

impl DocumentCache {
    pub fn new(max_documents: usize) -> Self {
        Self {
            max_documents,
            cache: HashMap::new(),
            session_author: None,
        }
    }

    pub fn size(&self) -> usize {
        self.cache.len()
    }

    pub fn get(&mut self, path: &Path) -> Option<&mut CachedDocument> {
        let normalized = normalize_path(path);
        let cached = self.cache.get_mut(&normalized)?;
        cached.touch();
        Some(cached)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.cache.contains_key(&normalize_path(path))
    }

    /// Insert a document, evicting the least recently used entry first
    /// when the cache is full.
    pub fn put(&mut self, cached: CachedDocument) {
        if !self.cache.contains_key(&cached.path) && self.size() >= self.max_documents {
            self.evict_lru();
        }
        self.cache.insert(cached.path.clone(), cached);
    }

    pub fn remove(&mut self, path: &Path) -> Option<CachedDocument> {
        self.cache.remove(&normalize_path(path))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CachedDocument> {
        self.cache.values_mut()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.cache.keys().cloned().collect()
    }

    /// Evict the LRU entry. A dirty document is saved first; if that
    /// save fails the eviction is abandoned so no unsaved state is
    /// silently dropped.
    fn evict_lru(&mut self) {
        let Some(lru_path) = self
            .cache
            .values()
            .min_by_key(|c| c.last_access())
            .map(|c| c.path.clone())
        else {
            return;
        };

        let Some(lru) = self.cache.get_mut(&lru_path) else {
            return;
        };
        if lru.is_dirty() {
            if let Err(e) = lru.document.save() {
                log::warn!(
                    "failed to save {} during eviction, keeping it cached: {e}",
                    lru_path.display()
                );
                return;
            }
        }

        self.cache.remove(&lru_path);
    }

    /// Resolve the author for an operation, remembering it for the
    /// session: explicit name wins, then the remembered session author,
    /// then the OS username, then "Reviewer". The flag reports whether
    /// the result was a guessed default.
    pub fn resolve_author(&mut self, explicit: Option<&str>) -> (String, bool) {
        if let Some(author) = explicit {
            self.session_author = Some(author.to_string());
            return (author.to_string(), false);
        }
        if let Some(author) = &self.session_author {
            return (author.clone(), false);
        }
        let default = os_username().unwrap_or_else(|| "Reviewer".to_string());
        self.session_author = Some(default.clone());
        (default, true)
    }

    pub fn session_author(&self) -> Option<&str> {
        self.session_author.as_deref()
    }
}

fn os_username() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.is_empty())
}

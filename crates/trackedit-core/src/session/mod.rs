//! Session layer: open documents held in an LRU cache, external
//! modification detection by mtime, and per-session author defaults.

mod cache;

pub use cache::{normalize_path, CachedDocument, DocumentCache};

use crate::error::{EditError, Result};
use crate::wml::Document;
use std::path::Path;

/// One editing session over a set of documents. Every mutating call
/// goes through [`Session::edit`], which refuses to touch a document
/// whose file changed on disk since it was opened.
pub struct Session {
    cache: DocumentCache,
}

impl Session {
    pub fn new(max_documents: usize) -> Self {
        Self {
            cache: DocumentCache::new(max_documents),
        }
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Open a document (or touch it if already open). Returns the
    /// author the session resolved for it.
    pub fn open(&mut self, path: impl AsRef<Path>, author: Option<&str>) -> Result<String> {
        let path = path.as_ref();
        let (author, _is_default) = self.cache.resolve_author(author);

        if self.cache.get(path).is_some() {
            return Ok(author);
        }

        let document = Document::open(path, Some(&author))?;
        self.cache.put(CachedDocument::new(path, document, &author));
        log::info!("opened {}", path.display());
        Ok(author)
    }

    /// Run a mutation against an open document. The closure result is
    /// returned; the document is marked dirty on success.
    pub fn edit<T>(
        &mut self,
        path: impl AsRef<Path>,
        f: impl FnOnce(&mut Document) -> Result<T>,
    ) -> Result<T> {
        let cached = self.cached_mut(path.as_ref())?;
        if cached.has_external_changes() {
            return Err(EditError::ExternalModification {
                path: cached.path.clone(),
            });
        }
        let result = f(&mut cached.document)?;
        cached.mark_dirty();
        Ok(result)
    }

    /// Run a read-only query against an open document.
    pub fn read<T>(
        &mut self,
        path: impl AsRef<Path>,
        f: impl FnOnce(&Document) -> T,
    ) -> Result<T> {
        let cached = self.cached_mut(path.as_ref())?;
        Ok(f(&cached.document))
    }

    /// Save an open document, refusing when the file was modified
    /// externally (use `reload` or `force_save` to resolve).
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let cached = self.cached_mut(path.as_ref())?;
        if cached.has_external_changes() {
            return Err(EditError::ExternalModification {
                path: cached.path.clone(),
            });
        }
        cached.document.save()?;
        cached.update_mtime();
        cached.clear_dirty();
        Ok(())
    }

    /// Save regardless of external modification, overwriting the file
    /// and re-baselining its mtime.
    pub fn force_save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let cached = self.cached_mut(path.as_ref())?;
        cached.document.save()?;
        cached.update_mtime();
        cached.clear_dirty();
        Ok(())
    }

    /// Drop the cached state and re-read the document from disk,
    /// discarding unsaved edits.
    pub fn reload(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let author = {
            let cached = self.cached_mut(path)?;
            cached.author.clone()
        };
        self.cache.remove(path);
        let document = Document::open(path, Some(&author))?;
        self.cache.put(CachedDocument::new(path, document, &author));
        Ok(())
    }

    /// Close a document without saving. Unsaved edits are dropped.
    pub fn close(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match self.cache.remove(path) {
            Some(cached) => {
                if cached.is_dirty() {
                    log::warn!("closed {} with unsaved changes", cached.path.display());
                }
                Ok(())
            }
            None => Err(EditError::DocumentNotOpen {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Best-effort shutdown: save every dirty document, then drop the
    /// cache. One failed save does not stop the rest.
    pub fn shutdown(&mut self) {
        for cached in self.cache.iter_mut() {
            if cached.is_dirty() {
                match cached.document.save() {
                    Ok(()) => log::info!("saved dirty document {}", cached.path.display()),
                    Err(e) => log::error!("failed to save {}: {e}", cached.path.display()),
                }
            }
        }
        for path in self.cache.paths() {
            self.cache.remove(&path);
        }
    }

    fn cached_mut(&mut self, path: &Path) -> Result<&mut CachedDocument> {
        match self.cache.get(path) {
            Some(cached) => Ok(cached),
            None => Err(EditError::DocumentNotOpen {
                path: path.to_path_buf(),
            }),
        }
    }
}

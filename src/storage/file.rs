//! JSON-file backed storage, the desktop analogue of browser `localStorage`.
//!
//! DESIGN
//! ======
//! The whole store is one JSON object document. Every write rewrites the
//! document to a sibling temp file and renames it over the original, so a
//! crash mid-write leaves either the old or the new document on disk.
//!
//! TRADE-OFFS
//! ==========
//! Read-modify-write is serialized by an in-process mutex only. Two processes
//! writing the same file can lose each other's updates; the session record is
//! the only key in practice, so last writer wins.
//!
//! A document that does not parse is reported by `get` but replaced by the
//! next `set` or `remove`, so a damaged file never blocks login or logout.

#[cfg(test)]
#[path = "file_test.rs"]
mod tests;

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{DurableStorage, StorageError};

type Document = BTreeMap<String, String>;

#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Open storage at `path`. The file is created lazily on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Document, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Document::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_document(&self, doc: &Document) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(doc)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Document) -> bool) -> Result<(), StorageError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let (mut doc, recovered) = match self.read_document() {
            Ok(doc) => (doc, false),
            Err(StorageError::Format(e)) => {
                tracing::warn!(path = %self.path.display(), error = %e, "discarding unreadable storage document");
                (Document::new(), true)
            }
            Err(e) => return Err(e),
        };
        if apply(&mut doc) || recovered {
            self.write_document(&doc)?;
        }
        Ok(())
    }
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_document()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|doc| {
            doc.insert(key.to_owned(), value.to_owned());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|doc| doc.remove(key).is_some())
    }
}

//! Optional incremental-build cache: source path plus content hash to a
//! previously parsed [`Document`].
//!
//! A hit is only ever revalidated against the blake3 hash of the file's
//! current contents, never a modification time, so the idempotence guarantee
//! holds under filesystem timestamp noise. The cache is shared read/write
//! across the parser worker pool.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::post::Document;

#[derive(Debug, Default)]
pub struct Cache {
    entries: Mutex<HashMap<PathBuf, Entry>>,
}

#[derive(Debug)]
struct Entry {
    hash: blake3::Hash,
    document: Document,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached document for `path` if its content hash matches
    /// `contents`. A stale entry is treated as a miss.
    pub fn lookup(&self, path: &Path, contents: &str) -> Option<Document> {
        let hash = blake3::hash(contents.as_bytes());
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(path)
            .filter(|entry| entry.hash == hash)
            .map(|entry| entry.document.clone())
    }

    /// Records the parse result for `path`, replacing any stale entry.
    pub fn store(&self, path: &Path, contents: &str, document: &Document) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            path.to_owned(),
            Entry {
                hash: blake3::hash(contents.as_bytes()),
                document: document.clone(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

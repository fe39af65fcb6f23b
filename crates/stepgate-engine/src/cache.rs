//! Invocation-scoped memo of artifact reads.
//!
//! The first read of a path touches the filesystem and records the outcome,
//! success or [`ArtifactError`], keyed by path. Every later read of that path
//! returns the recorded outcome until [`ArtifactCache::clear`] is called. Text
//! decoding and JSON parsing are derived lazily from the cached bytes and are
//! memoized alongside them.
//!
//! The cache is single-writer state: methods take `&mut self` and nothing
//! here is synchronized.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use stepgate_types::ArtifactError;

type Outcome<T> = std::result::Result<T, ArtifactError>;

/// Read counters, mainly useful for asserting cache behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

struct CacheEntry {
    raw: Outcome<Arc<[u8]>>,
    text: OnceCell<Outcome<Arc<str>>>,
    json: OnceCell<Outcome<Arc<Value>>>,
}

impl CacheEntry {
    fn load(path: &Path) -> Self {
        let raw = std::fs::read(path)
            .map(Arc::from)
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => ArtifactError::NotFound {
                    path: display(path),
                },
                _ => ArtifactError::Unreadable {
                    path: display(path),
                    message: err.to_string(),
                },
            });
        Self {
            raw,
            text: OnceCell::new(),
            json: OnceCell::new(),
        }
    }

    fn text(&self, path: &Path) -> Outcome<Arc<str>> {
        self.text
            .get_or_init(|| {
                let bytes = self.raw.clone()?;
                std::str::from_utf8(&bytes)
                    .map(Arc::from)
                    .map_err(|_| ArtifactError::NotText {
                        path: display(path),
                    })
            })
            .clone()
    }

    fn json(&self, path: &Path) -> Outcome<Arc<Value>> {
        self.json
            .get_or_init(|| {
                let bytes = self.raw.clone()?;
                serde_json::from_slice::<Value>(&bytes)
                    .map(Arc::new)
                    .map_err(|err| ArtifactError::MalformedJson {
                        path: display(path),
                        message: err.to_string(),
                    })
            })
            .clone()
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Memoizes raw, text, and parsed-JSON views of files keyed by path.
#[derive(Default)]
pub struct ArtifactCache {
    entries: HashMap<PathBuf, CacheEntry>,
    stats: CacheStats,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, path: &Path) -> &CacheEntry {
        if self.entries.contains_key(path) {
            self.stats.hits += 1;
            tracing::debug!(path = %path.display(), "artifact cache hit");
        } else {
            self.stats.misses += 1;
            tracing::debug!(path = %path.display(), "artifact cache miss");
            self.entries.insert(path.to_path_buf(), CacheEntry::load(path));
        }
        &self.entries[path]
    }

    /// Raw file bytes.
    pub fn read_bytes(&mut self, path: &Path) -> Outcome<Arc<[u8]>> {
        self.entry(path).raw.clone()
    }

    /// File content as UTF-8 text.
    pub fn read(&mut self, path: &Path) -> Outcome<Arc<str>> {
        self.entry(path).text(path)
    }

    /// File content parsed as a JSON value of any shape.
    pub fn read_json(&mut self, path: &Path) -> Outcome<Arc<Value>> {
        self.entry(path).json(path)
    }

    /// Drop every cached outcome. The next read of any path hits storage.
    pub fn clear(&mut self) {
        tracing::debug!(entries = self.entries.len(), "artifact cache cleared");
        self.entries.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

//! Content-addressed OCR caching
//!
//! Transcriptions are keyed by the SHA-256 of the rendered image bytes, so a
//! page rendered twice is only sent to the OCR model once.

use immo_domain::traits::{OcrCache, OcrProvider};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Lowercase hex SHA-256 of `bytes`
pub fn content_key(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// OCR cache storing one UTF-8 text file per image
#[derive(Debug, Clone, Default)]
pub struct DirOcrCache {
    dir: Option<PathBuf>,
}

impl DirOcrCache {
    /// Cache rooted at `dir`; `None` or an empty path disables it
    pub fn new(dir: Option<PathBuf>) -> Self {
        let dir = dir.filter(|d| !d.as_os_str().is_empty());
        Self { dir }
    }

    /// Cache that never hits and never writes
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Cache directory, when enabled
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn entry_path(&self, image: &[u8]) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.txt", content_key(image))))
    }
}

impl OcrCache for DirOcrCache {
    fn read(&self, image: &[u8]) -> Option<String> {
        let path = self.entry_path(image)?;
        fs::read_to_string(&path).ok()
    }

    fn write(&self, image: &[u8], text: &str) {
        let (Some(dir), Some(path)) = (self.dir.as_ref(), self.entry_path(image)) else {
            return;
        };
        if let Err(e) = fs::create_dir_all(dir).and_then(|_| fs::write(&path, text)) {
            debug!("OCR cache write to {} failed: {}", path.display(), e);
        }
    }
}

/// Cache that stores nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCache;

impl OcrCache for NoOpCache {
    fn read(&self, _image: &[u8]) -> Option<String> {
        None
    }

    fn write(&self, _image: &[u8], _text: &str) {}
}

/// In-process cache, useful for tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemoryOcrCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryOcrCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached transcriptions
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OcrCache for MemoryOcrCache {
    fn read(&self, image: &[u8]) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.get(&content_key(image)).cloned()
    }

    fn write(&self, image: &[u8], text: &str) {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(content_key(image), text.to_string());
            }
            Err(_) => warn!("OCR memory cache lock poisoned, skipping write"),
        }
    }
}

/// OCR provider consulting a cache before the wrapped provider
///
/// Only successful transcriptions are cached.
pub struct CachedOcr<O, C> {
    inner: O,
    cache: C,
}

impl<O, C> CachedOcr<O, C> {
    /// Wrap `inner` with `cache`
    pub fn new(inner: O, cache: C) -> Self {
        Self { inner, cache }
    }

    /// The underlying cache
    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<O: OcrProvider, C: OcrCache> OcrProvider for CachedOcr<O, C> {
    type Error = O::Error;

    fn transcribe(&self, image: &[u8]) -> Result<String, Self::Error> {
        if let Some(text) = self.cache.read(image) {
            debug!(bytes = image.len(), "OCR cache hit");
            return Ok(text);
        }

        let text = self.inner.transcribe(image)?;
        self.cache.write(image, &text);
        Ok(text)
    }
}

//! Exact-text translation cache with a JSON snapshot on disk.
//!
//! Constructed once per process, shared behind an `Arc`, and flushed after
//! every write or batch. Keys are the literal source text: no trimming, no
//! case folding.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::TranslateError;

#[derive(Debug, Default)]
pub struct TranslationCache {
    path: Option<PathBuf>,
    entries: Mutex<HashMap<String, String>>,
}

impl TranslationCache {
    /// Cache without durable storage; `flush` is a no-op.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the snapshot at `path`; a missing file yields an empty cache
    /// bound to that path.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError::CacheIo`] if the file exists but cannot be
    /// read, or [`TranslateError::CacheFormat`] if it is not a JSON object of
    /// strings.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, TranslateError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<HashMap<String, String>>(&raw)
                .map_err(TranslateError::CacheFormat)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(TranslateError::CacheIo {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };

        tracing::info!(path = %path.display(), entries = entries.len(), "translation cache loaded");
        Ok(Self {
            path: Some(path),
            entries: Mutex::new(entries),
        })
    }

    /// Like [`TranslationCache::load`], but starts empty (still bound to
    /// `path`) when the snapshot is unreadable.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::load(path.clone()) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "starting with empty translation cache");
                Self {
                    path: Some(path),
                    entries: Mutex::default(),
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn get(&self, text: &str) -> Option<String> {
        self.lock().get(text).cloned()
    }

    pub fn set(&self, text: impl Into<String>, translation: impl Into<String>) {
        self.lock().insert(text.into(), translation.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the snapshot atomically (temp file + rename).
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError::CacheIo`] if the directory, temp file, or
    /// rename fails.
    pub fn flush(&self) -> Result<(), TranslateError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_err = |source: std::io::Error| TranslateError::CacheIo {
            path: path.display().to_string(),
            source,
        };

        let snapshot: BTreeMap<String, String> = self
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let json = serde_json::to_string_pretty(&snapshot).map_err(TranslateError::CacheFormat)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    /// Flushes and logs instead of failing; the in-memory entries stay valid.
    pub fn flush_or_warn(&self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "translation cache flush failed");
        }
    }
}

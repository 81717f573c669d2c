//! Persisted fragment resources
//!
//! The [`FragmentSink`] trait is the single writable resource behind the
//! debounced writer. Only the writer calls it.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fs2::FileExt;
use mapsync_core::prelude::*;

/// Destination for serialized fragments
pub trait FragmentSink: Send + Sync {
    /// Replace the persisted fragment with `fragment`
    fn write_fragment(&self, fragment: &str) -> Result<()>;
}

impl<T: FragmentSink + ?Sized> FragmentSink for Arc<T> {
    fn write_fragment(&self, fragment: &str) -> Result<()> {
        (**self).write_fragment(fragment)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps every written fragment in memory. Clones share the same history.
#[derive(Debug, Clone, Default)]
pub struct MemoryFragment {
    history: Arc<Mutex<Vec<String>>>,
}

impl MemoryFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently written fragment
    pub fn current(&self) -> Option<String> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    /// All writes, oldest first
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn write_count(&self) -> usize {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl FragmentSink for MemoryFragment {
    fn write_fragment(&self, fragment: &str) -> Result<()> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(fragment.to_string());
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File
// ─────────────────────────────────────────────────────────────────────────────

/// Persists the fragment to a single file, replacing its contents on each write
#[derive(Debug, Clone)]
pub struct FileFragment {
    path: PathBuf,
}

impl FileFragment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back the stored fragment, if the file exists and is non-empty
    pub fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read fragment file {}", self.path.display()))?;
        let trimmed = content.trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }
}

impl FragmentSink for FileFragment {
    fn write_fragment(&self, fragment: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::fragment_write(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| Error::fragment_write(format!("Failed to open fragment file: {}", e)))?;

        // Exclusive lock guards against a second driver writing the same file
        file.lock_exclusive()
            .map_err(|e| Error::fragment_write(format!("Failed to lock fragment file: {}", e)))?;

        let mut file = file;
        writeln!(file, "{}", fragment)
            .map_err(|e| Error::fragment_write(format!("Failed to write fragment file: {}", e)))?;
        file.flush()
            .map_err(|e| Error::fragment_write(format!("Failed to flush fragment file: {}", e)))?;

        trace!("Wrote fragment to {:?}", self.path);
        Ok(())
    }
}

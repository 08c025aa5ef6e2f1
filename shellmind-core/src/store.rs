//! # State Store
//!
//! Persists the [`MemoryDocument`] as a single JSON file.
//!
//! - `load()` never fails: a missing, empty or malformed file yields a fresh
//!   document seeded with the system prompt, and missing top-level keys are
//!   backfilled.
//! - `save()` writes to a temporary file in the target directory and renames
//!   it over the target, so an interrupted write never truncates the file.
//!
//! There is no locking; one process owns the file.

use crate::error::{self, Result};
use crate::memory::{MemoryDocument, DOCUMENT_KEYS};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default location of the state file, relative to the working directory
pub const DEFAULT_STATE_FILE: &str = "bot_memory.json";

/// Owner of the on-disk memory document
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    seed_prompt: String,
}

impl StateStore {
    pub fn new(path: impl AsRef<Path>, seed_prompt: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            seed_prompt: seed_prompt.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// The document `load()` falls back to
    pub fn default_document(&self) -> MemoryDocument {
        MemoryDocument::new(self.seed_prompt.clone())
    }

    /// Load the document, recovering from any defect in the file
    pub fn load(&self) -> MemoryDocument {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "state file absent, starting fresh");
                return self.default_document();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file unreadable, starting fresh");
                return self.default_document();
            }
        };

        let mut value: serde_json::Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file is not valid JSON, starting fresh");
                return self.default_document();
            }
        };

        let Some(object) = value.as_object_mut() else {
            warn!(path = %self.path.display(), "state file root is not an object, starting fresh");
            return self.default_document();
        };

        let defaults = match serde_json::to_value(self.default_document()) {
            Ok(serde_json::Value::Object(defaults)) => defaults,
            _ => return self.default_document(),
        };
        for key in DOCUMENT_KEYS {
            if !object.contains_key(key) {
                debug!(key, "backfilling missing state key");
                object.insert(key.to_string(), defaults[key].clone());
            }
        }

        let mut document: MemoryDocument = match serde_json::from_value(value) {
            Ok(document) => document,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file has an unexpected shape, starting fresh");
                return self.default_document();
            }
        };

        if document.ensure_seed(&self.seed_prompt) {
            debug!("restored system seed entry");
        }
        document
    }

    /// Atomically replace the state file with `document`
    pub fn save(&self, document: &MemoryDocument) -> Result<()> {
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| error::serialization_error(e).with_operation("store::save"))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .map_err(|e| error::io_error(&dir, e).with_operation("store::save"))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| error::io_error(&dir, e).with_operation("store::save"))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| error::io_error(tmp.path(), e).with_operation("store::save"))?;
        tmp.persist(&self.path).map_err(|e| {
            error::storage_failed(&self.path, format!("failed to replace state file: {}", e.error))
                .with_operation("store::save")
                .set_source(e.error)
        })?;

        debug!(
            path = %self.path.display(),
            entries = document.conversation_history.len(),
            "state saved"
        );
        Ok(())
    }

    /// Overwrite the file with a fresh default document
    pub fn reset(&self) -> Result<MemoryDocument> {
        let document = self.default_document();
        self.save(&document)?;
        Ok(document)
    }
}

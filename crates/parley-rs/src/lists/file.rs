//! JSON file backend for named lists.
//!
//! The whole store is one JSON object keyed by normalized list name, with
//! keys in ascending order:
//!
//! ```json
//! {
//!   "color": { "items": ["red"] },
//!   "medium": { "items": ["oil", "ink"] }
//! }
//! ```
//!
//! A missing or empty file is an empty store. Writes go to `<file>.tmp`
//! first and are then renamed over the document.

use crate::error::{ParleyError, Result};
use crate::lists::{ListIter, ListStore, NamedList};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// List store persisted as a single JSON object (`name -> {items}`).
///
/// Every mutation rewrites the whole document with a temp-file-then-rename
/// so readers never see a partial file.
pub struct JsonFileListStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileListStore {
    /// Open (or lazily create) the store at `path`. The parent directory is
    /// created if missing.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| ParleyError::store(format!("Failed to create list dir: {e}")))?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, NamedList>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = std::fs::read_to_string(&self.path)
            .map_err(|e| ParleyError::store(format!("Failed to read lists: {e}")))?;
        if json.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&json)
            .map_err(|e| ParleyError::store(format!("Failed to parse lists: {e}")))
    }

    fn save(&self, lists: &BTreeMap<String, NamedList>) -> Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(lists)?;
        std::fs::write(&tmp_path, json)
            .map_err(|e| ParleyError::store(format!("Failed to write temp lists: {e}")))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| ParleyError::store(format!("Failed to rename lists: {e}")))?;
        debug!("Saved {} list(s) to {}", lists.len(), self.path.display());
        Ok(())
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ListStore for JsonFileListStore {
    fn get(&self, name: &str) -> Result<Option<NamedList>> {
        let _guard = self.guard();
        Ok(self.load()?.remove(name))
    }

    fn set(&self, name: &str, list: NamedList) -> Result<()> {
        let _guard = self.guard();
        let mut lists = self.load()?;
        lists.insert(name.to_string(), list);
        self.save(&lists)
    }

    fn delete(&self, name: &str) -> Result<()> {
        let _guard = self.guard();
        let mut lists = self.load()?;
        if lists.remove(name).is_some() {
            self.save(&lists)?;
        }
        Ok(())
    }

    fn iterate(&self) -> Result<ListIter> {
        let _guard = self.guard();
        Ok(Box::new(self.load()?.into_iter()))
    }
}

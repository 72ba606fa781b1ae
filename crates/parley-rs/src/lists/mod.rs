//! Named lists: the store contract and two implementations.
//!
//! A named list is an ordered sequence of string items keyed by a
//! case-insensitive, trimmed name. Duplicates are allowed. Lists are created
//! implicitly on first add and removed entirely on clear.
//!
//! There is no cross-command transaction: an add is a read-modify-write and
//! concurrent adds to the same name are last-writer-wins.

mod file;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

pub use file::JsonFileListStore;

/// Items of one named list, in insertion order.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NamedList {
    pub items: Vec<String>,
}

impl NamedList {
    pub fn new(items: Vec<String>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Normalize a list name into its store key: trimmed and lowercased.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Snapshot iterator over `(name, list)` pairs.
pub type ListIter = Box<dyn Iterator<Item = (String, NamedList)> + Send>;

/// Persistent name → list map.
///
/// Keys are expected to be normalized with [`normalize_name`] by the
/// caller.
pub trait ListStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<NamedList>>;

    fn set(&self, name: &str, list: NamedList) -> Result<()>;

    /// Remove `name`. Removing a missing list is not an error.
    fn delete(&self, name: &str) -> Result<()>;

    /// Every stored list, in ascending name order.
    fn iterate(&self) -> Result<ListIter>;
}

/// In-process list store.
#[derive(Debug, Default)]
pub struct MemoryListStore {
    lists: Mutex<BTreeMap<String, NamedList>>,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, NamedList>> {
        self.lists.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ListStore for MemoryListStore {
    fn get(&self, name: &str) -> Result<Option<NamedList>> {
        Ok(self.lock().get(name).cloned())
    }

    fn set(&self, name: &str, list: NamedList) -> Result<()> {
        self.lock().insert(name.to_string(), list);
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.lock().remove(name);
        Ok(())
    }

    fn iterate(&self) -> Result<ListIter> {
        let snapshot: Vec<(String, NamedList)> = self
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Box::new(snapshot.into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_folds_case() {
        assert_eq!(normalize_name("  Medium "), "medium");
        assert_eq!(normalize_name("LOCATION"), "location");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn memory_store_set_get_delete() {
        let store = MemoryListStore::new();
        assert_eq!(store.get("medium").unwrap(), None);

        store
            .set("medium", NamedList::new(vec!["oil".into()]))
            .unwrap();
        assert_eq!(store.get("medium").unwrap().unwrap().items, vec!["oil"]);

        store.delete("medium").unwrap();
        assert_eq!(store.get("medium").unwrap(), None);
        // Idempotent.
        store.delete("medium").unwrap();
    }

    #[test]
    fn iterate_is_name_ordered_snapshot() {
        let store = MemoryListStore::new();
        store.set("subject", NamedList::new(vec!["cat".into()])).unwrap();
        store.set("medium", NamedList::new(vec!["oil".into()])).unwrap();

        let iter = store.iterate().unwrap();
        // Mutating after the snapshot does not affect it.
        store.delete("medium").unwrap();
        let names: Vec<String> = iter.map(|(name, _)| name).collect();
        assert_eq!(names, vec!["medium", "subject"]);
    }
}

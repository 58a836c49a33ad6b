//! In-memory object store.
//!
//! Programmable store for tests and demos:
//! - entries are listed in insertion order
//! - individual fetches or listings can be made to fail
//! - fetch calls are recorded for assertions

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::{ObjectStore, StoreEntry, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    entries: Vec<(String, String)>,
    failing_fetches: HashSet<String>,
    failing_lists: HashSet<String>,
    fetched: Vec<String>,
}

/// Object store backed by a vector of `(path, content)` pairs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from `(path, content)` pairs
    pub fn with_entries<P, C>(entries: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<String>,
        C: Into<String>,
    {
        let store = Self::new();
        for (path, content) in entries {
            store.put(path, content);
        }
        store
    }

    /// Insert or overwrite an entry; new paths go to the end of the listing
    pub fn put(&self, path: impl Into<String>, content: impl Into<String>) {
        let (path, content) = (path.into(), content.into());
        let mut state = self.write();
        match state.entries.iter_mut().find(|(p, _)| *p == path) {
            Some(existing) => existing.1 = content,
            None => state.entries.push((path, content)),
        }
    }

    /// Make fetches of `path` fail
    pub fn fail_fetch(&self, path: impl Into<String>) {
        self.write().failing_fetches.insert(path.into());
    }

    /// Make listings with exactly this prefix fail (`""` = the full listing)
    pub fn fail_list(&self, prefix: impl Into<String>) {
        self.write().failing_lists.insert(prefix.into());
    }

    /// Clear all injected failures
    pub fn heal(&self) {
        let mut state = self.write();
        state.failing_fetches.clear();
        state.failing_lists.clear();
    }

    /// Paths fetched so far, in call order
    pub fn fetched(&self) -> Vec<String> {
        self.read().fetched.clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<StoreEntry>, StoreError> {
        let state = self.read();
        let prefix = prefix.unwrap_or_default();

        if state.failing_lists.contains(prefix) {
            return Err(StoreError::list(Some(prefix), "injected listing failure"));
        }

        Ok(state
            .entries
            .iter()
            .filter(|(path, _)| path.starts_with(prefix))
            .map(|(path, _)| StoreEntry::new(path.clone()))
            .collect())
    }

    async fn fetch_text(&self, path: &str) -> Result<String, StoreError> {
        let mut state = self.write();
        state.fetched.push(path.to_string());

        if state.failing_fetches.contains(path) {
            return Err(StoreError::fetch(path, "injected fetch failure"));
        }

        state
            .entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| StoreError::fetch(path, "not found"))
    }

    fn fetch_ref(&self, path: &str) -> String {
        format!("memory://{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_in_insertion_order() {
        let store = MemoryStore::with_entries([
            ("b/original-text.txt", "b"),
            ("a/original-text.txt", "a"),
        ]);

        let all = store.list(None).await.unwrap();
        assert_eq!(all[0].path, "b/original-text.txt");
        assert_eq!(all[1].path, "a/original-text.txt");

        let scoped = store.list(Some("a/")).await.unwrap();
        assert_eq!(scoped.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::with_entries([("a/original-text.txt", "a")]);
        store.fail_fetch("a/original-text.txt");
        store.fail_list("a/");

        assert!(matches!(
            store.fetch_text("a/original-text.txt").await,
            Err(StoreError::Fetch { .. })
        ));
        assert!(matches!(store.list(Some("a/")).await, Err(StoreError::List { .. })));
        assert!(store.list(None).await.is_ok());

        store.heal();
        assert_eq!(store.fetch_text("a/original-text.txt").await.unwrap(), "a");
        assert_eq!(store.fetched().len(), 2);
    }
}

//! Document discovery and assembly.
//!
//! Builds one [`Document`] per grouping key found in the object store:
//!
//! 1. list everything, collect distinct grouping keys in first-seen order
//! 2. per key, list `<key>/`, classify each entry, fill the channels
//!    (text channels are fetched, audio/images are stored as references)
//! 3. emit the documents in grouping-key order
//!
//! Groups are assembled concurrently; a group's channels are filled in
//! discovery order before its document is emitted, so single-valued
//! channels are last-write-wins. A failed fetch leaves only that channel
//! unpopulated. A failed listing fails the whole call, and nothing is
//! written anywhere until the call has fully succeeded.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument, warn};

use crate::adapters::{ObjectStore, StoreError};
use crate::domain::channel::{self, Channel};
use crate::domain::{Channels, Document};

use super::store::{DocumentStore, MergeSummary};

/// Default number of groups assembled at once
pub const DEFAULT_MAX_CONCURRENT_GROUPS: usize = 8;

/// Discovers documents in an object store
#[derive(Clone)]
pub struct DocumentAggregator {
    store: Arc<dyn ObjectStore>,
    max_concurrent_groups: usize,
}

impl DocumentAggregator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            max_concurrent_groups: DEFAULT_MAX_CONCURRENT_GROUPS,
        }
    }

    /// Limit how many groups are assembled concurrently (minimum 1)
    pub fn with_max_concurrent_groups(mut self, max: usize) -> Self {
        self.max_concurrent_groups = max.max(1);
        self
    }

    pub fn object_store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Snapshot of every document in the store, in grouping-key discovery order
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn aggregate(&self) -> Result<Vec<Document>, StoreError> {
        let keys = self.grouping_keys().await?;
        info!(groups = keys.len(), "Discovered document groups");

        let documents: Vec<Document> = stream::iter(keys.iter())
            .map(|key| self.aggregate_group(key))
            .buffered(self.max_concurrent_groups)
            .try_collect()
            .await?;

        info!(documents = documents.len(), "Aggregation complete");
        Ok(documents)
    }

    /// Aggregate and merge the result into `documents` by identity.
    ///
    /// Nothing is merged unless aggregation succeeds as a whole.
    pub async fn aggregate_into(&self, documents: &DocumentStore) -> Result<MergeSummary, StoreError> {
        let aggregated = self.aggregate().await?;
        Ok(documents.merge(aggregated).await)
    }

    /// Distinct grouping keys in first-seen listing order.
    ///
    /// Entries without a separator belong to no group. A leading separator
    /// yields the empty key, which is a group like any other.
    pub async fn grouping_keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = self.store.list(None).await?;

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for entry in &entries {
            match channel::grouping_key(&entry.path) {
                Some(key) => {
                    if seen.insert(key) {
                        keys.push(key.to_string());
                    }
                }
                None => debug!(path = %entry.path, "Skipping ungrouped entry"),
            }
        }

        Ok(keys)
    }

    /// Assemble the document for a single grouping key
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn aggregate_group(&self, key: &str) -> Result<Document, StoreError> {
        let prefix = channel::group_prefix(key);
        let entries = self.store.list(Some(&prefix)).await?;

        let mut channels = Channels::default();
        for entry in entries {
            let Some(remainder) = entry.path.strip_prefix(&prefix) else {
                debug!(path = %entry.path, "Entry outside group prefix");
                continue;
            };

            let channel = channel::classify_remainder(remainder);
            match channel {
                Channel::Unrecognized => {
                    debug!(path = %entry.path, "Unrecognized artifact");
                }
                c if c.is_text() => match self.store.fetch_text(&entry.path).await {
                    Ok(text) => channels.assign(c, text),
                    Err(e) => {
                        warn!(group = key, path = %entry.path, channel = %c, error = %e, "Failed to fetch artifact");
                    }
                },
                c => channels.assign(c, self.store.fetch_ref(&entry.path)),
            }
        }

        debug!(
            group = key,
            original = channels.has(Channel::Original),
            simplified = channels.has(Channel::Simplified),
            translated = channels.has(Channel::Translated),
            audio = channels.has(Channel::Audio),
            images = channels.image_refs.len(),
            "Assembled document"
        );

        Ok(Document::discovered(key, channels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::domain::DocumentStatus;

    fn aggregator(store: &MemoryStore) -> DocumentAggregator {
        DocumentAggregator::new(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_two_groups() {
        let store = MemoryStore::with_entries([
            ("docA/original-text.txt", "Photosynthesis is..."),
            ("docA/image-1.png", "png"),
            ("docB/simplified-text.txt", "Plants eat light."),
        ]);

        let docs = aggregator(&store).aggregate().await.unwrap();
        assert_eq!(docs.len(), 2);

        let a = &docs[0];
        assert_eq!(a.id.as_str(), "docA");
        assert_eq!(a.channels.original_text.as_deref(), Some("Photosynthesis is..."));
        assert_eq!(a.channels.image_refs, vec!["memory://docA/image-1.png"]);
        assert!(a.channels.simplified_text.is_none());

        let b = &docs[1];
        assert_eq!(b.id.as_str(), "docB");
        assert_eq!(b.channels.simplified_text.as_deref(), Some("Plants eat light."));
        assert!(b.channels.original_text.is_none());
        assert!(b.channels.image_refs.is_empty());

        assert!(docs.iter().all(|d| d.status == DocumentStatus::Done));
    }

    #[tokio::test]
    async fn test_empty_store() {
        let docs = aggregator(&MemoryStore::new()).aggregate().await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_ungrouped_entries_are_excluded() {
        let store = MemoryStore::with_entries([
            ("README.txt", "x"),
            ("docA/audio.mp3", "mp3"),
        ]);

        let keys = aggregator(&store).grouping_keys().await.unwrap();
        assert_eq!(keys, vec!["docA"]);
    }

    #[tokio::test]
    async fn test_leading_separator_groups_under_empty_key() {
        let store = MemoryStore::with_entries([
            ("/original-text.txt", "rootless"),
            ("docA/audio.mp3", "mp3"),
        ]);

        let docs = aggregator(&store).aggregate().await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["", "docA"]);
        assert_eq!(docs[0].channels.original_text.as_deref(), Some("rootless"));
    }

    #[tokio::test]
    async fn test_audio_is_reference_only() {
        let store = MemoryStore::with_entries([("docA/audio.mp3", "binary")]);

        let docs = aggregator(&store).aggregate().await.unwrap();
        assert_eq!(
            docs[0].channels.audio_ref.as_deref(),
            Some("memory://docA/audio.mp3")
        );
        assert!(store.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_last_write_wins_and_images_accumulate() {
        let store = MemoryStore::with_entries([
            ("docA/original-text-v1.txt", "first"),
            ("docA/image-2.png", "b"),
            ("docA/original-text-v2.txt", "second"),
            ("docA/image-1.png", "a"),
        ]);

        let docs = aggregator(&store).aggregate().await.unwrap();
        let channels = &docs[0].channels;
        assert_eq!(channels.original_text.as_deref(), Some("second"));
        assert_eq!(
            channels.image_refs,
            vec!["memory://docA/image-2.png", "memory://docA/image-1.png"]
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_is_isolated() {
        let store = MemoryStore::with_entries([
            ("docA/original-text.txt", "original"),
            ("docA/simplified-text.txt", "simple"),
            ("docB/original-text.txt", "other"),
        ]);
        store.fail_fetch("docA/original-text.txt");

        let docs = aggregator(&store).aggregate().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].channels.original_text.is_none());
        assert_eq!(docs[0].channels.simplified_text.as_deref(), Some("simple"));
        assert_eq!(docs[1].channels.original_text.as_deref(), Some("other"));
    }

    #[tokio::test]
    async fn test_group_listing_failure_fails_call() {
        let store = MemoryStore::with_entries([
            ("docA/original-text.txt", "a"),
            ("docB/original-text.txt", "b"),
        ]);
        store.fail_list("docB/");

        let result = aggregator(&store).aggregate().await;
        assert!(matches!(result, Err(StoreError::List { .. })));
    }

    #[tokio::test]
    async fn test_unrecognized_artifacts_are_ignored() {
        let store = MemoryStore::with_entries([("docA/manifest.json", "{}")]);

        let docs = aggregator(&store).aggregate().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].channels.is_empty());
        assert!(store.fetched().is_empty());
    }
}

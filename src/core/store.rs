//! Process-wide document collection.
//!
//! Holds the authoritative ordered list of documents and the "currently
//! selected" pointer. All mutation goes through `upsert`/`merge`/`transition`,
//! each applied under a single write lock so readers never see a
//! half-updated document. Every change is broadcast to subscribers.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::domain::{Channels, Document, DocumentId, DocumentStatus};

use super::lifecycle::LifecycleError;

/// Capacity of the change notification channel
const CHANGE_CAPACITY: usize = 256;

/// Notification emitted after a document is inserted, replaced, or transitioned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub id: DocumentId,
    pub status: DocumentStatus,
}

/// Result of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

/// Summary of merging a batch of documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub replaced: usize,
    /// Documents skipped because they would move a status backward
    pub rejected: usize,
}

/// Why a document could not be opened for viewing
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    #[error("Document {id} is not ready for viewing (status: {status})")]
    NotViewable { id: DocumentId, status: DocumentStatus },
}

#[derive(Debug, Default, Deserialize)]
struct StoreState {
    documents: Vec<Document>,
    #[serde(default)]
    selected: Option<DocumentId>,
}

impl StoreState {
    fn position(&self, id: &DocumentId) -> Option<usize> {
        self.documents.iter().position(|d| &d.id == id)
    }

    /// Insert or replace in place; new documents go to the back or the front.
    ///
    /// A replaced document keeps the upload date it first entered with.
    fn upsert(&mut self, mut doc: Document, front: bool) -> Result<Upsert, LifecycleError> {
        match self.position(&doc.id) {
            Some(pos) => {
                let current = &self.documents[pos];
                if !doc.status.can_replace(current.status) {
                    return Err(LifecycleError::InvalidTransition {
                        id: doc.id,
                        from: current.status,
                        to: doc.status,
                    });
                }
                doc.upload_date = current.upload_date;
                self.documents[pos] = doc;
                Ok(Upsert::Replaced)
            }
            None if front => {
                self.documents.insert(0, doc);
                Ok(Upsert::Inserted)
            }
            None => {
                self.documents.push(doc);
                Ok(Upsert::Inserted)
            }
        }
    }
}

/// On-disk snapshot format
#[derive(Debug, Deserialize)]
struct Snapshot {
    #[allow(dead_code)]
    version: u32,
    #[serde(flatten)]
    state: StoreState,
}

/// Shared, cloneable handle to the document collection
#[derive(Debug, Clone)]
pub struct DocumentStore {
    state: Arc<RwLock<StoreState>>,
    changes: broadcast::Sender<StoreChange>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::from_documents(Vec::new())
    }

    /// Create a store holding `documents` in the given order
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self::from_state(StoreState {
            documents,
            selected: None,
        })
    }

    fn from_state(state: StoreState) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(state)),
            changes,
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    fn notify(&self, doc: &Document) {
        // No subscribers is fine
        let _ = self.changes.send(StoreChange {
            id: doc.id.clone(),
            status: doc.status,
        });
    }

    /// Insert a document at the back if its id is unseen, else replace it in place.
    ///
    /// Replacing is refused when it would move the status backward.
    pub async fn upsert(&self, doc: Document) -> Result<Upsert, LifecycleError> {
        self.upsert_at(doc, false).await
    }

    /// Like [`upsert`](Self::upsert), but unseen documents are prepended
    pub async fn upsert_front(&self, doc: Document) -> Result<Upsert, LifecycleError> {
        self.upsert_at(doc, true).await
    }

    async fn upsert_at(&self, doc: Document, front: bool) -> Result<Upsert, LifecycleError> {
        let mut state = self.state.write().await;
        let change = StoreChange {
            id: doc.id.clone(),
            status: doc.status,
        };
        let outcome = state.upsert(doc, front)?;
        drop(state);

        debug!(document_id = %change.id, status = %change.status, ?outcome, "Upserted document");
        let _ = self.changes.send(change);
        Ok(outcome)
    }

    /// Upsert a batch (e.g. one aggregation result) under a single lock
    pub async fn merge(&self, documents: Vec<Document>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        let mut changes = Vec::with_capacity(documents.len());

        {
            let mut state = self.state.write().await;
            for doc in documents {
                let change = StoreChange {
                    id: doc.id.clone(),
                    status: doc.status,
                };
                match state.upsert(doc, false) {
                    Ok(Upsert::Inserted) => summary.inserted += 1,
                    Ok(Upsert::Replaced) => summary.replaced += 1,
                    Err(e) => {
                        warn!(error = %e, "Skipping document during merge");
                        summary.rejected += 1;
                        continue;
                    }
                }
                changes.push(change);
            }
        }

        for change in changes {
            let _ = self.changes.send(change);
        }
        summary
    }

    /// Advance a document's status, optionally setting its channels in the same step.
    ///
    /// Only forward moves along the lifecycle are accepted.
    pub async fn transition(
        &self,
        id: &DocumentId,
        next: DocumentStatus,
        channels: Option<Channels>,
    ) -> Result<Document, LifecycleError> {
        let mut state = self.state.write().await;
        let pos = state
            .position(id)
            .ok_or_else(|| LifecycleError::NotFound(id.clone()))?;

        let doc = &mut state.documents[pos];
        if doc.status.is_terminal() {
            return Err(LifecycleError::TerminalState {
                id: id.clone(),
                status: doc.status,
            });
        }
        if !doc.status.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                id: id.clone(),
                from: doc.status,
                to: next,
            });
        }

        doc.status = next;
        if let Some(channels) = channels {
            doc.channels = channels;
        }
        let updated = doc.clone();
        drop(state);

        self.notify(&updated);
        Ok(updated)
    }

    /// Get a document by id
    pub async fn get(&self, id: &DocumentId) -> Option<Document> {
        let state = self.state.read().await;
        state.documents.iter().find(|d| &d.id == id).cloned()
    }

    /// Snapshot of all documents in list order
    pub async fn list(&self) -> Vec<Document> {
        self.state.read().await.documents.clone()
    }

    /// Point the selection at `id`.
    ///
    /// Returns the document, or `None` (selection unchanged) if the id is unknown.
    /// Eligibility for viewing is not checked here.
    pub async fn select(&self, id: &DocumentId) -> Option<Document> {
        let mut state = self.state.write().await;
        let doc = state.documents.iter().find(|d| &d.id == id).cloned()?;
        state.selected = Some(doc.id.clone());
        Some(doc)
    }

    /// Select a document only if it is ready for viewing
    pub async fn select_viewable(&self, id: &DocumentId) -> Result<Document, SelectionError> {
        let mut state = self.state.write().await;
        let doc = state
            .documents
            .iter()
            .find(|d| &d.id == id)
            .cloned()
            .ok_or_else(|| SelectionError::NotFound(id.clone()))?;

        if !doc.is_viewable() {
            return Err(SelectionError::NotViewable {
                id: doc.id,
                status: doc.status,
            });
        }

        state.selected = Some(doc.id.clone());
        Ok(doc)
    }

    /// The currently selected document, reflecting its latest state
    pub async fn selected(&self) -> Option<Document> {
        let state = self.state.read().await;
        let id = state.selected.as_ref()?;
        state.documents.iter().find(|d| &d.id == id).cloned()
    }

    pub async fn clear_selection(&self) {
        self.state.write().await.selected = None;
    }

    /// First document that is ready for viewing
    pub async fn first_viewable(&self) -> Option<Document> {
        let state = self.state.read().await;
        state.documents.iter().find(|d| d.is_viewable()).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.documents.is_empty()
    }

    /// Load a snapshot from disk (empty store if the file does not exist)
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read document snapshot: {}", path.display()))?;

        let snapshot: Snapshot =
            serde_json::from_str(&content).context("Failed to parse document snapshot JSON")?;

        Ok(Self::from_state(snapshot.state))
    }

    /// Save a snapshot to disk
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = {
            let state = self.state.read().await;
            serde_json::to_string_pretty(&SnapshotRef {
                version: 1,
                documents: &state.documents,
                selected: state.selected.as_ref(),
            })?
        };

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write document snapshot: {}", path.display()))?;

        Ok(())
    }
}

/// Borrowing twin of [`Snapshot`] for serialization
#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    documents: &'a [Document],
    selected: Option<&'a DocumentId>,
}

//! Document lifecycle driver.
//!
//! A local submission is validated, inserted at the front of the collection
//! as `pending`, and handed to a background task owned by this controller:
//!
//! ```text
//! submit ──► pending ──(pending delay)──► processing ──(pipeline)──► done
//!                                              └─────(failure)─────► error
//! ```
//!
//! Every task is keyed by its document id, so submissions progress
//! independently and can be cancelled one at a time. Status only ever moves
//! forward; the store rejects anything else.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::submission::DEFAULT_LANGUAGE;
use crate::domain::{Document, DocumentId, DocumentStatus, SubmissionRequest};

use super::pipeline::Pipeline;
use super::store::DocumentStore;
use super::validation::{SubmissionError, SubmissionLimits};

/// Default wait before a submission starts processing
pub const DEFAULT_PENDING_DELAY: Duration = Duration::from_millis(2000);

/// Lifecycle errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    #[error("Invalid status transition for {id}: {from} → {to}")]
    InvalidTransition {
        id: DocumentId,
        from: DocumentStatus,
        to: DocumentStatus,
    },

    #[error("Document {id} is already {status}")]
    TerminalState { id: DocumentId, status: DocumentStatus },

    #[error("Invalid submission: {0}")]
    InvalidSubmission(#[from] SubmissionError),
}

type TaskMap = HashMap<DocumentId, JoinHandle<()>>;

/// Drives locally submitted documents through their lifecycle
pub struct LifecycleController {
    documents: DocumentStore,
    pipeline: Arc<dyn Pipeline>,
    limits: SubmissionLimits,
    pending_delay: Duration,
    tasks: Arc<Mutex<TaskMap>>,
}

impl LifecycleController {
    pub fn new(documents: DocumentStore, pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            documents,
            pipeline,
            limits: SubmissionLimits::default(),
            pending_delay: DEFAULT_PENDING_DELAY,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_limits(mut self, limits: SubmissionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_pending_delay(mut self, delay: Duration) -> Self {
        self.pending_delay = delay;
        self
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, TaskMap> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept a submission.
    ///
    /// Returns the `pending` document as soon as it is in the collection;
    /// processing continues in the background.
    #[instrument(skip(self, request), fields(file = %request.file_name))]
    pub async fn submit(&self, request: SubmissionRequest) -> Result<Document, LifecycleError> {
        self.limits.validate(&request)?;

        let language = request.language().unwrap_or_else(|| {
            warn!(
                code = %request.language_code,
                fallback = DEFAULT_LANGUAGE.code,
                "Unknown target language, falling back"
            );
            DEFAULT_LANGUAGE
        });

        let doc = Document::pending(&request.file_name, language.name);
        self.documents.upsert_front(doc.clone()).await?;
        info!(document_id = %doc.id, language = language.name, "Document submitted");

        let handle = tokio::spawn(drive(
            self.documents.clone(),
            Arc::clone(&self.pipeline),
            doc.id.clone(),
            request,
            self.pending_delay,
        ));
        let mut tasks = self.tasks();
        tasks.retain(|_, running| !running.is_finished());
        tasks.insert(doc.id.clone(), handle);
        drop(tasks);

        Ok(doc)
    }

    /// Stop a document's background work.
    ///
    /// A document that had not finished is moved to `error`. Returns `false`
    /// if no task was tracked for `id`.
    pub async fn cancel(&self, id: &DocumentId) -> bool {
        let Some(handle) = self.tasks().remove(id) else {
            return false;
        };
        handle.abort();

        match self.documents.transition(id, DocumentStatus::Error, None).await {
            Ok(_) => info!(document_id = %id, "Processing cancelled"),
            Err(e) => debug!(document_id = %id, error = %e, "Cancelled task had already settled"),
        }
        true
    }

    /// Cancel every tracked task
    pub async fn cancel_all(&self) {
        let ids: Vec<DocumentId> = self.tasks().keys().cloned().collect();
        for id in ids {
            self.cancel(&id).await;
        }
    }

    /// Wait for a document's background work to finish, returning its final state
    pub async fn wait(&self, id: &DocumentId) -> Option<Document> {
        let handle = self.tasks().remove(id);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!(document_id = %id, error = %e, "Lifecycle task panicked");
                }
            }
        }
        self.documents.get(id).await
    }

    /// Ids of documents whose background work is still running
    pub fn active(&self) -> Vec<DocumentId> {
        let mut tasks = self.tasks();
        tasks.retain(|_, handle| !handle.is_finished());
        tasks.keys().cloned().collect()
    }
}

/// Background task for one submission
async fn drive(
    documents: DocumentStore,
    pipeline: Arc<dyn Pipeline>,
    id: DocumentId,
    request: SubmissionRequest,
    pending_delay: Duration,
) {
    tokio::time::sleep(pending_delay).await;

    if let Err(e) = documents
        .transition(&id, DocumentStatus::Processing, None)
        .await
    {
        warn!(document_id = %id, error = %e, "Could not start processing");
        return;
    }
    info!(document_id = %id, pipeline = pipeline.name(), "Processing started");

    let result = match pipeline.process(&request).await {
        Ok(channels) => {
            documents
                .transition(&id, DocumentStatus::Done, Some(channels))
                .await
        }
        Err(e) => {
            error!(document_id = %id, error = %e, "Processing failed");
            documents.transition(&id, DocumentStatus::Error, None).await
        }
    };

    match result {
        Ok(doc) => info!(document_id = %id, status = %doc.status, "Processing finished"),
        Err(e) => warn!(document_id = %id, error = %e, "Could not record processing result"),
    }
}

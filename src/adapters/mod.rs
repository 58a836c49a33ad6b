//! Adapter interfaces for external systems.
//!
//! The core consumes two capabilities it does not own:
//! - an object store the processing stages deposit artifacts into
//! - a pipeline trigger that starts processing for an uploaded file

pub mod blob;
pub mod filesystem;
pub mod memory;
pub mod trigger;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use blob::BlobContainerStore;
pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;
pub use trigger::{HttpPipelineTrigger, PipelineTrigger, TriggerError};

/// Errors surfaced by an object store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Listing failed; the whole listing scope is unusable
    #[error("Failed to list entries under '{prefix}': {reason}")]
    List { prefix: String, reason: String },

    /// Fetching a single artifact failed
    #[error("Failed to fetch '{path}': {reason}")]
    Fetch { path: String, reason: String },
}

impl StoreError {
    pub fn list(prefix: Option<&str>, reason: impl std::fmt::Display) -> Self {
        Self::List {
            prefix: prefix.unwrap_or_default().to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn fetch(path: &str, reason: impl std::fmt::Display) -> Self {
        Self::Fetch {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A single listed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    /// Full path, `/`-separated
    pub path: String,
}

impl StoreEntry {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Read capability over the shared artifact store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human-readable store name
    fn name(&self) -> &str;

    /// List entries, optionally restricted to a path prefix.
    ///
    /// Order must be stable for an unchanged store.
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<StoreEntry>, StoreError>;

    /// Fetch and decode an entry as text
    async fn fetch_text(&self, path: &str) -> Result<String, StoreError>;

    /// Resolvable reference to an entry; performs no I/O
    fn fetch_ref(&self, path: &str) -> String;
}

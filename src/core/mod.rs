//! Core engine logic.
//!
//! This module contains:
//! - Aggregator: discovers documents in the object store
//! - Store: the shared, ordered document collection
//! - Lifecycle: drives local submissions pending → processing → done/error
//! - Pipeline: the processing seam (simulated or store-polling)
//! - Validation: submission limits

pub mod aggregator;
pub mod lifecycle;
pub mod pipeline;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use aggregator::DocumentAggregator;
pub use lifecycle::{LifecycleController, LifecycleError};
pub use pipeline::{Pipeline, SimulatedPipeline, StorePollingPipeline};
pub use store::{DocumentStore, MergeSummary, SelectionError, StoreChange, Upsert};
pub use validation::{SubmissionError, SubmissionLimits};

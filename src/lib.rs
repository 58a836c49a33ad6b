//! lurnix - Content aggregation and lifecycle engine for learning documents
//!
//! Uploaded worksheets and textbook pages are turned into multi-modal
//! documents by external processing stages (OCR, simplification,
//! translation, narration, illustration). Those stages deposit artifacts in
//! a shared object store; lurnix reassembles them into documents and
//! tracks each local submission through its lifecycle.
//!
//! # Architecture
//!
//! - Artifacts are grouped by the first path segment of their name, and
//!   classified into channels by keywords in the rest of the path
//! - One document per grouping key; channels are independently optional
//! - Local submissions move `pending → processing → done | error`, never
//!   backward
//!
//! # Modules
//!
//! - `adapters`: Object stores (filesystem, blob container, memory) and the pipeline trigger
//! - `core`: Aggregator, DocumentStore, LifecycleController, Pipeline
//! - `domain`: Data structures (Document, Channel, translation payloads)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Discover documents in the artifact store
//! lurnix documents --sync
//!
//! # View one
//! lurnix show <document-id>
//!
//! # Submit a new file
//! lurnix submit worksheet.pdf --language ta
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{ObjectStore, StoreError};
pub use self::core::{DocumentAggregator, DocumentStore, LifecycleController};
pub use domain::{Channel, Channels, Document, DocumentId, DocumentStatus};

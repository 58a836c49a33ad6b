//! Domain types for lurnix.
//!
//! This module contains the core data structures:
//! - Channel: artifact classification into content channels
//! - Document: the aggregated record and its status
//! - Translation: typed view over the translation payload
//! - Submission: locally submitted file metadata

pub mod channel;
pub mod document;
pub mod submission;
pub mod translation;

// Re-export commonly used types
pub use channel::{classify, grouping_key, Channel};
pub use document::{Channels, Document, DocumentId, DocumentStatus};
pub use submission::{Language, SubmissionRequest, LANGUAGES};
pub use translation::{TranslationError, TranslationView};

//! Submission limits and validation.
//!
//! A local submission is checked before its document enters `pending`:
//! - declared MIME type must be allowed
//! - file name must match an allowed extension pattern
//! - size must be non-zero and within the limit

use glob::Pattern;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::SubmissionRequest;

/// Limits applied to local submissions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionLimits {
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,

    /// Accepted MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,

    /// Glob patterns the file name must match (case-insensitive)
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_max_size_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "application/pdf".to_string(),
        "image/png".to_string(),
        "image/jpeg".to_string(),
        "image/jpg".to_string(),
    ]
}

fn default_allowed_extensions() -> Vec<String> {
    vec![
        "*.pdf".to_string(),
        "*.png".to_string(),
        "*.jpg".to_string(),
        "*.jpeg".to_string(),
    ]
}

impl Default for SubmissionLimits {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size_bytes(),
            allowed_types: default_allowed_types(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl SubmissionLimits {
    /// Check if a file name matches any allowed extension pattern
    pub fn is_allowed_name(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        self.allowed_extensions
            .iter()
            .filter_map(|p| Pattern::new(&p.to_lowercase()).ok())
            .any(|pattern| pattern.matches(&name))
    }

    pub fn is_allowed_type(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.trim().to_lowercase();
        self.allowed_types.iter().any(|t| t.eq_ignore_ascii_case(&mime_type))
    }

    /// Validate a submission request
    pub fn validate(&self, request: &SubmissionRequest) -> Result<(), SubmissionError> {
        if request.file_name.trim().is_empty() {
            return Err(SubmissionError::MissingName);
        }

        if !self.is_allowed_type(&request.mime_type) || !self.is_allowed_name(&request.file_name)
        {
            return Err(SubmissionError::UnsupportedType {
                file_name: request.file_name.clone(),
                mime_type: request.mime_type.clone(),
            });
        }

        if request.size_bytes == 0 {
            return Err(SubmissionError::Empty);
        }

        if request.size_bytes > self.max_size_bytes {
            return Err(SubmissionError::TooLarge {
                actual: request.size_bytes,
                limit: self.max_size_bytes,
            });
        }

        Ok(())
    }
}

/// Rejected submissions
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Submission has no file name")]
    MissingName,

    #[error("Unsupported file '{file_name}' ({mime_type}); upload a PDF, PNG, or JPG file")]
    UnsupportedType { file_name: String, mime_type: String },

    #[error("File is empty")]
    Empty,

    #[error("File too large: {actual} > {limit} bytes")]
    TooLarge { actual: u64, limit: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, mime: &str, size: u64) -> SubmissionRequest {
        SubmissionRequest::new(name, mime, size, "ta")
    }

    #[test]
    fn test_default_limits() {
        let limits = SubmissionLimits::default();
        assert_eq!(limits.max_size_bytes, 10 * 1024 * 1024);
        assert_eq!(limits.allowed_types.len(), 4);
    }

    #[test]
    fn test_accepts_supported_files() {
        let limits = SubmissionLimits::default();
        assert!(limits.validate(&request("lesson.pdf", "application/pdf", 1024)).is_ok());
        assert!(limits.validate(&request("SCAN.JPG", "image/jpeg", 1024)).is_ok());
        assert!(limits.validate(&request("page.png", "IMAGE/PNG", 1024)).is_ok());
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let limits = SubmissionLimits::default();

        let result = limits.validate(&request("notes.docx", "application/msword", 10));
        assert!(matches!(result, Err(SubmissionError::UnsupportedType { .. })));

        // Declared type alone is not enough
        let result = limits.validate(&request("notes.txt", "application/pdf", 10));
        assert!(matches!(result, Err(SubmissionError::UnsupportedType { .. })));
    }

    #[test]
    fn test_rejects_size_violations() {
        let limits = SubmissionLimits {
            max_size_bytes: 100,
            ..Default::default()
        };

        assert_eq!(
            limits.validate(&request("a.pdf", "application/pdf", 0)),
            Err(SubmissionError::Empty)
        );
        assert_eq!(
            limits.validate(&request("a.pdf", "application/pdf", 101)),
            Err(SubmissionError::TooLarge {
                actual: 101,
                limit: 100
            })
        );
        assert!(limits.validate(&request("a.pdf", "application/pdf", 100)).is_ok());
    }

    #[test]
    fn test_rejects_missing_name() {
        let limits = SubmissionLimits::default();
        assert_eq!(
            limits.validate(&request("  ", "application/pdf", 10)),
            Err(SubmissionError::MissingName)
        );
    }
}

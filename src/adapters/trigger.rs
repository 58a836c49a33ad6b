//! Pipeline trigger adapter.
//!
//! Hands an uploaded file to the external processing service, which later
//! deposits its artifacts into the object store under a grouping key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::SubmissionRequest;

/// Errors that can occur while triggering processing
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Submission has no source file to upload")]
    MissingSource,

    #[error("Failed to read source file: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Pipeline service rejected the upload: {0}")]
    Rejected(String),
}

/// Starts external processing for a submitted file
#[async_trait]
pub trait PipelineTrigger: Send + Sync {
    /// Upload the file and return the grouping key its artifacts will land under
    async fn trigger(&self, request: &SubmissionRequest) -> Result<String, TriggerError>;
}

/// Response from the processing service
#[derive(Debug, Deserialize)]
struct TriggerResponse {
    /// Grouping key assigned to the upload
    folder: Option<String>,

    #[serde(default)]
    error: Option<String>,
}

/// Trigger that uploads the file as a multipart form
pub struct HttpPipelineTrigger {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpPipelineTrigger {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TriggerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PipelineTrigger for HttpPipelineTrigger {
    async fn trigger(&self, request: &SubmissionRequest) -> Result<String, TriggerError> {
        let path = request
            .source_path
            .as_ref()
            .ok_or(TriggerError::MissingSource)?;

        let bytes = tokio::fs::read(path).await?;

        let file_part = Part::bytes(bytes)
            .file_name(request.file_name.clone())
            .mime_str(&request.mime_type)?;

        let form = Form::new()
            .text("language", request.language_code.clone())
            .part("file", file_part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let body: TriggerResponse = response.json().await?;

        match body.folder {
            Some(folder) if !folder.is_empty() => Ok(folder),
            _ => Err(TriggerError::Rejected(
                body.error.unwrap_or_else(|| "no folder in response".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_source_is_rejected() {
        let trigger =
            HttpPipelineTrigger::new("http://localhost:9/upload", Duration::from_secs(1)).unwrap();
        let request = SubmissionRequest::new("a.pdf", "application/pdf", 10, "ta");

        let result = trigger.trigger(&request).await;
        assert!(matches!(result, Err(TriggerError::MissingSource)));
        assert_eq!(trigger.endpoint(), "http://localhost:9/upload");
    }

    #[test]
    fn test_response_parsing() {
        let ok: TriggerResponse = serde_json::from_str(r#"{"folder":"worksheet-7"}"#).unwrap();
        assert_eq!(ok.folder.as_deref(), Some("worksheet-7"));

        let err: TriggerResponse = serde_json::from_str(r#"{"error":"quota"}"#).unwrap();
        assert!(err.folder.is_none());
        assert_eq!(err.error.as_deref(), Some("quota"));
    }
}

//! Processing pipeline seam.
//!
//! The OCR, simplification, translation, narration, and illustration stages
//! are external. The lifecycle controller only needs "turn this submission
//! into channels", which a [`Pipeline`] provides:
//!
//! - [`SimulatedPipeline`]: fixed delay, canned channels (local stand-in)
//! - [`StorePollingPipeline`]: triggers the real service, then polls the
//!   object store until the document's artifacts appear

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::adapters::PipelineTrigger;
use crate::domain::submission::DEFAULT_LANGUAGE;
use crate::domain::translation::encode_payload;
use crate::domain::{Channel, Channels, SubmissionRequest};

use super::aggregator::DocumentAggregator;

/// Turns a submitted file into document channels
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Human-readable pipeline name
    fn name(&self) -> &str;

    /// Run every processing stage for a submission
    async fn process(&self, request: &SubmissionRequest) -> Result<Channels>;
}

pub const SAMPLE_ORIGINAL_TEXT: &str = "Sample OCR text extracted from the uploaded file. \
This would contain the actual text content from the document.";

pub const SAMPLE_SIMPLIFIED_TEXT: &str =
    "This is a simpler version of the text that is easier to read and understand.";

pub const SAMPLE_TRANSLATED_TEXT: &str = "यह अनुवादित पाठ का एक उदाहरण है।";

pub const SAMPLE_AUDIO_REF: &str = "#";

pub const SAMPLE_IMAGE_REF: &str = "https://images.pexels.com/photos/159711/books-bookstore-book-reading-159711.jpeg?auto=compress&cs=tinysrgb&w=300";

/// Stand-in pipeline: waits, then returns sample channels
#[derive(Debug, Clone)]
pub struct SimulatedPipeline {
    delay: Duration,
}

impl Default for SimulatedPipeline {
    fn default() -> Self {
        Self::new(Duration::from_millis(3000))
    }
}

impl SimulatedPipeline {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Channels produced for a request.
    ///
    /// A translation is only produced when the target is not English.
    pub fn sample_channels(request: &SubmissionRequest) -> Channels {
        let language = request.language().unwrap_or(DEFAULT_LANGUAGE);

        Channels {
            original_text: Some(SAMPLE_ORIGINAL_TEXT.to_string()),
            simplified_text: Some(SAMPLE_SIMPLIFIED_TEXT.to_string()),
            translated_text: language
                .needs_translation()
                .then(|| encode_payload(language.code, SAMPLE_TRANSLATED_TEXT)),
            audio_ref: Some(SAMPLE_AUDIO_REF.to_string()),
            image_refs: vec![SAMPLE_IMAGE_REF.to_string()],
        }
    }
}

#[async_trait]
impl Pipeline for SimulatedPipeline {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn process(&self, request: &SubmissionRequest) -> Result<Channels> {
        tokio::time::sleep(self.delay).await;
        Ok(Self::sample_channels(request))
    }
}

/// Real pipeline: trigger the service, then wait for its artifacts
pub struct StorePollingPipeline {
    trigger: Arc<dyn PipelineTrigger>,
    aggregator: DocumentAggregator,
    poll_interval: Duration,
    timeout: Duration,
}

impl StorePollingPipeline {
    pub fn new(
        trigger: Arc<dyn PipelineTrigger>,
        aggregator: DocumentAggregator,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            trigger,
            aggregator,
            poll_interval,
            timeout,
        }
    }

    /// Poll one group until its original text has been deposited
    async fn wait_for_artifacts(&self, key: &str) -> Channels {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.aggregator.aggregate_group(key).await {
                Ok(doc) if doc.channels.has(Channel::Original) => {
                    info!(group = key, attempt, "Pipeline artifacts available");
                    return doc.channels;
                }
                Ok(_) => debug!(group = key, attempt, "Artifacts not ready yet"),
                Err(e) => warn!(group = key, attempt, error = %e, "Polling failed, will retry"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl Pipeline for StorePollingPipeline {
    fn name(&self) -> &str {
        "store-polling"
    }

    async fn process(&self, request: &SubmissionRequest) -> Result<Channels> {
        let key = self
            .trigger
            .trigger(request)
            .await
            .with_context(|| format!("Failed to trigger processing for '{}'", request.file_name))?;

        info!(group = %key, "Processing triggered");

        tokio::time::timeout(self.timeout, self.wait_for_artifacts(&key))
            .await
            .with_context(|| {
                format!(
                    "Artifacts for '{}' did not appear within {:?}",
                    key, self.timeout
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryStore, TriggerError};
    use crate::domain::translation::{self, TranslationView};

    struct FixedTrigger(&'static str);

    #[async_trait]
    impl PipelineTrigger for FixedTrigger {
        async fn trigger(&self, _request: &SubmissionRequest) -> Result<String, TriggerError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_sample_channels_translation_only_for_non_english() {
        let english = SubmissionRequest::new("a.pdf", "application/pdf", 1, "en");
        assert!(SimulatedPipeline::sample_channels(&english).translated_text.is_none());

        let tamil = SubmissionRequest::new("a.pdf", "application/pdf", 1, "ta");
        let channels = SimulatedPipeline::sample_channels(&tamil);
        let view = translation::view(channels.translated_text.as_deref());
        assert!(matches!(view, TranslationView::Available { ref language, .. } if language == "TA"));
        assert_eq!(channels.image_refs.len(), 1);
        assert_eq!(channels.audio_ref.as_deref(), Some("#"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_pipeline_waits() {
        let pipeline = SimulatedPipeline::new(Duration::from_secs(3));
        let request = SubmissionRequest::new("a.pdf", "application/pdf", 1, "hi");

        let start = tokio::time::Instant::now();
        let channels = pipeline.process(&request).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(channels.original_text.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_pipeline_waits_for_original_text() {
        let store = MemoryStore::with_entries([("job-1/image-1.png", "png")]);
        let aggregator = DocumentAggregator::new(Arc::new(store.clone()));
        let pipeline = StorePollingPipeline::new(
            Arc::new(FixedTrigger("job-1")),
            aggregator,
            Duration::from_millis(500),
            Duration::from_secs(10),
        );

        let writer = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            writer.put("job-1/original-text.txt", "deposited");
        });

        let request = SubmissionRequest::new("a.pdf", "application/pdf", 1, "en");
        let channels = pipeline.process(&request).await.unwrap();
        assert_eq!(channels.original_text.as_deref(), Some("deposited"));
        assert_eq!(channels.image_refs.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_pipeline_times_out() {
        let store = MemoryStore::new();
        let pipeline = StorePollingPipeline::new(
            Arc::new(FixedTrigger("job-2")),
            DocumentAggregator::new(Arc::new(store)),
            Duration::from_millis(500),
            Duration::from_secs(5),
        );

        let request = SubmissionRequest::new("a.pdf", "application/pdf", 1, "en");
        assert!(pipeline.process(&request).await.is_err());
    }
}

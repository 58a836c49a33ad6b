//! Documents: the unit of aggregation.
//!
//! A document gathers every artifact the processing stages produced for one
//! uploaded source file. Channels are optional and independent; a document
//! may legitimately carry any subset of them.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::channel::Channel;
use super::translation::{self, TranslationView};

/// Language label for documents whose target language is not recorded
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

/// Stable document identifier (grouping key, or a generated id for local submissions)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh identifier for a locally submitted document
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Processing status of a document.
///
/// ```text
/// pending → processing → done
///    └──────────┴──────→ error
/// ```
///
/// `done` and `error` are terminal. Status never moves backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl DocumentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Valid next states from this state
    pub fn valid_transitions(&self) -> &'static [DocumentStatus] {
        match self {
            Self::Pending => &[Self::Processing, Self::Error],
            Self::Processing => &[Self::Done, Self::Error],
            Self::Done | Self::Error => &[],
        }
    }

    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Whether a record at this status may overwrite one currently at `current`.
    ///
    /// Same-status replacement is allowed; otherwise the move must be forward
    /// and `current` must not be terminal.
    pub fn can_replace(&self, current: DocumentStatus) -> bool {
        *self == current || (!current.is_terminal() && self.rank() > current.rank())
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Done | Self::Error => 2,
        }
    }

    /// Human-readable label used by listings
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing...",
            Self::Done => "Ready",
            Self::Error => "Error",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Done => write!(f, "done"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Content channels of a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channels {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplified_text: Option<String>,

    /// Raw translation payload, parsed lazily via [`Document::translation`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,

    /// Fetchable reference, never inlined bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_ref: Option<String>,

    /// Discovery order
    #[serde(default)]
    pub image_refs: Vec<String>,
}

impl Channels {
    /// Assign a value into a channel.
    ///
    /// Single-valued channels are last-write-wins; images accumulate.
    /// Unrecognized values are dropped.
    pub fn assign(&mut self, channel: Channel, value: String) {
        match channel {
            Channel::Original => self.original_text = Some(value),
            Channel::Simplified => self.simplified_text = Some(value),
            Channel::Translated => self.translated_text = Some(value),
            Channel::Audio => self.audio_ref = Some(value),
            Channel::Image => self.image_refs.push(value),
            Channel::Unrecognized => {}
        }
    }

    pub fn has(&self, channel: Channel) -> bool {
        match channel {
            Channel::Original => self.original_text.is_some(),
            Channel::Simplified => self.simplified_text.is_some(),
            Channel::Translated => self.translated_text.is_some(),
            Channel::Audio => self.audio_ref.is_some(),
            Channel::Image => !self.image_refs.is_empty(),
            Channel::Unrecognized => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A document record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,

    /// Human-readable name
    pub display_name: String,

    /// Date the document entered the system
    pub upload_date: NaiveDate,

    pub status: DocumentStatus,

    /// Target language label
    pub language: String,

    /// Grouping key in the object store, if the document was discovered there
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_prefix: Option<String>,

    #[serde(default)]
    pub channels: Channels,
}

impl Document {
    /// A freshly submitted local document, waiting for processing
    pub fn pending(display_name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: DocumentId::generate(),
            display_name: display_name.into(),
            upload_date: today(),
            status: DocumentStatus::Pending,
            language: language.into(),
            source_prefix: None,
            channels: Channels::default(),
        }
    }

    /// A document reconstructed from a grouping key in the object store.
    ///
    /// The store only holds artifacts of finished work, so these start at `done`.
    pub fn discovered(key: &str, channels: Channels) -> Self {
        Self {
            id: DocumentId::new(key),
            display_name: key.to_string(),
            upload_date: today(),
            status: DocumentStatus::Done,
            language: UNKNOWN_LANGUAGE.to_string(),
            source_prefix: Some(key.to_string()),
            channels,
        }
    }

    /// Only finished documents may be opened for detailed viewing
    pub fn is_viewable(&self) -> bool {
        self.status == DocumentStatus::Done
    }

    /// Viewer-facing translation state
    pub fn translation(&self) -> TranslationView {
        translation::view(self.channels.translated_text.as_deref())
    }

    pub fn image_count(&self) -> usize {
        self.channels.image_refs.len()
    }
}

/// Current UTC date
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use DocumentStatus::*;

        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Error));
        assert!(Processing.can_transition_to(Done));
        assert!(Processing.can_transition_to(Error));

        assert!(!Pending.can_transition_to(Done));
        assert!(!Processing.can_transition_to(Pending));
        assert!(!Done.can_transition_to(Processing));
        assert!(!Error.can_transition_to(Pending));
        assert!(Done.is_terminal() && Error.is_terminal());
    }

    #[test]
    fn test_replacement_rules() {
        use DocumentStatus::*;

        assert!(Done.can_replace(Done));
        assert!(Done.can_replace(Pending));
        assert!(Processing.can_replace(Pending));
        assert!(!Pending.can_replace(Processing));
        assert!(!Processing.can_replace(Done));
        assert!(!Error.can_replace(Done));
    }

    #[test]
    fn test_channel_assignment() {
        let mut channels = Channels::default();
        channels.assign(Channel::Original, "first".to_string());
        channels.assign(Channel::Original, "second".to_string());
        channels.assign(Channel::Image, "a.png".to_string());
        channels.assign(Channel::Image, "b.png".to_string());
        channels.assign(Channel::Unrecognized, "ignored".to_string());

        assert_eq!(channels.original_text.as_deref(), Some("second"));
        assert_eq!(channels.image_refs, vec!["a.png", "b.png"]);
        assert!(!channels.has(Channel::Audio));
    }

    #[test]
    fn test_discovered_document() {
        let doc = Document::discovered("docA", Channels::default());
        assert_eq!(doc.id.as_str(), "docA");
        assert_eq!(doc.status, DocumentStatus::Done);
        assert_eq!(doc.language, UNKNOWN_LANGUAGE);
        assert!(doc.is_viewable());
        assert_eq!(doc.translation(), TranslationView::Missing);
    }

    #[test]
    fn test_pending_document_not_viewable() {
        let doc = Document::pending("worksheet.pdf", "Tamil");
        assert_eq!(doc.status, DocumentStatus::Pending);
        assert!(!doc.is_viewable());
        assert!(doc.channels.is_empty());
    }

    #[test]
    fn test_document_serialization() {
        let mut doc = Document::discovered("docA", Channels::default());
        doc.channels.audio_ref = Some("https://store/docA/audio.mp3".to_string());

        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"status\":\"done\""));

        let parsed: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, doc);
    }
}

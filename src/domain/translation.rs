//! Translated-text payload handling.
//!
//! The translation service writes its raw response as the artifact body:
//!
//! ```json
//! [{ "translations": [{ "to": "ta", "text": "..." }] }]
//! ```
//!
//! The payload is stored as-is and parsed lazily when a viewer asks for it.
//! Anything that does not have this shape is a data error for that channel
//! only; the document's other channels stay viewable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Why a translated-text payload could not be rendered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("Translated payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Translated payload has no translation entry")]
    MissingEntry,

    #[error("Translation entry is malformed: {0}")]
    MalformedEntry(String),
}

/// What the viewer should show for the translated channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationView {
    /// No translation was produced (e.g. none was requested)
    Missing,

    /// A well-formed translation
    Available {
        /// Target language code, upper-cased for display
        language: String,
        text: String,
    },

    /// The payload exists but is malformed
    DataError(TranslationError),
}

impl TranslationView {
    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::DataError(_))
    }
}

#[derive(Debug, Deserialize)]
struct TranslationItem {
    to: String,
    text: String,
}

/// A translation as produced by the translation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub to: String,
    pub text: String,
}

/// Parse a raw translated-text payload.
///
/// Only the first translation of the first entry is read; anything after it
/// is ignored.
pub fn parse_translation(raw: &str) -> Result<Translation, TranslationError> {
    let payload: Value =
        serde_json::from_str(raw).map_err(|e| TranslationError::InvalidJson(e.to_string()))?;

    let first = payload
        .get(0)
        .and_then(|entry| entry.get("translations"))
        .and_then(|translations| translations.get(0))
        .ok_or(TranslationError::MissingEntry)?;

    let item = TranslationItem::deserialize(first)
        .map_err(|e| TranslationError::MalformedEntry(e.to_string()))?;

    Ok(Translation {
        to: item.to,
        text: item.text,
    })
}

/// Build the viewer-facing state from an optional raw payload
pub fn view(raw: Option<&str>) -> TranslationView {
    match raw {
        None => TranslationView::Missing,
        Some(raw) => match parse_translation(raw) {
            Ok(translation) => TranslationView::Available {
                language: translation.to.to_uppercase(),
                text: translation.text,
            },
            Err(e) => TranslationView::DataError(e),
        },
    }
}

/// Serialize a translation into the service's payload format
pub fn encode_payload(to: &str, text: &str) -> String {
    serde_json::json!([{ "translations": [{ "to": to, "text": text }] }]).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_payload() {
        let raw = r#"[{"detectedLanguage":{"language":"en"},"translations":[{"text":"வணக்கம்","to":"ta"}]}]"#;
        assert_eq!(
            view(Some(raw)),
            TranslationView::Available {
                language: "TA".to_string(),
                text: "வணக்கம்".to_string(),
            }
        );
    }

    #[test]
    fn test_not_json_is_data_error() {
        let result = view(Some("not json"));
        assert!(matches!(
            result,
            TranslationView::DataError(TranslationError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_shape_deviations_are_data_errors() {
        for raw in [
            "[]",
            r#"[{"translations":[]}]"#,
            r#"{"translations":[{"to":"ta","text":"x"}]}"#,
            r#"[{"translations":[{"to":"ta"}]}]"#,
            r#"[{"other":1}]"#,
        ] {
            assert!(view(Some(raw)).is_data_error(), "expected data error for {}", raw);
        }
    }

    #[test]
    fn test_only_first_translation_is_read() {
        let expected = TranslationView::Available {
            language: "TA".to_string(),
            text: "x".to_string(),
        };

        let trailing_entry = r#"[{"translations":[{"to":"ta","text":"x"}]},{"error":"quota"}]"#;
        assert_eq!(view(Some(trailing_entry)), expected);

        let partial_second = r#"[{"translations":[{"to":"ta","text":"x"},{"to":"hi"}]}]"#;
        assert_eq!(view(Some(partial_second)), expected);

        let odd_tail = r#"[{"translations":[{"to":"ta","text":"x"}]},42,"text"]"#;
        assert_eq!(view(Some(odd_tail)), expected);
    }

    #[test]
    fn test_incomplete_first_translation() {
        let raw = r#"[{"translations":[{"to":"ta"},{"to":"hi","text":"y"}]}]"#;
        assert!(matches!(
            view(Some(raw)),
            TranslationView::DataError(TranslationError::MalformedEntry(_))
        ));
    }

    #[test]
    fn test_missing_payload() {
        assert_eq!(view(None), TranslationView::Missing);
    }

    #[test]
    fn test_encoded_payload_parses() {
        let raw = encode_payload("hi", "नमस्ते");
        let translation = parse_translation(&raw).unwrap();
        assert_eq!(translation.to, "hi");
        assert_eq!(translation.text, "नमस्ते");
    }
}

//! Artifact classification.
//!
//! Processing stages deposit their outputs under `<grouping-key>/<name>`.
//! The name (the remainder after the grouping key) decides which content
//! channel an artifact feeds, by case-sensitive substring match in a fixed
//! priority order:
//!
//! ```text
//! original-text → simplified-text → translated-text → audio → image
//! ```
//!
//! The first match wins, so `docA/audio-image.mp3` is audio, not an image.

use serde::{Deserialize, Serialize};

/// Path separator used by the object store
pub const SEPARATOR: char = '/';

/// Content channel an artifact is classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// OCR output of the source document
    Original,

    /// Simplified rewrite of the original text
    Simplified,

    /// Raw translation service payload
    Translated,

    /// Narrated audio
    Audio,

    /// Generated illustration
    Image,

    /// Discovered but not attached to any channel
    Unrecognized,
}

/// Keyword table in priority order
const KEYWORDS: [(&str, Channel); 5] = [
    ("original-text", Channel::Original),
    ("simplified-text", Channel::Simplified),
    ("translated-text", Channel::Translated),
    ("audio", Channel::Audio),
    ("image", Channel::Image),
];

impl Channel {
    /// Whether the artifact's text is fetched at aggregation time
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Original | Self::Simplified | Self::Translated)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Original => write!(f, "original"),
            Channel::Simplified => write!(f, "simplified"),
            Channel::Translated => write!(f, "translated"),
            Channel::Audio => write!(f, "audio"),
            Channel::Image => write!(f, "image"),
            Channel::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "original" | "ocr" => Ok(Channel::Original),
            "simplified" => Ok(Channel::Simplified),
            "translated" | "translation" => Ok(Channel::Translated),
            "audio" => Ok(Channel::Audio),
            "image" | "images" => Ok(Channel::Image),
            _ => anyhow::bail!("Unknown channel: {}", s),
        }
    }
}

/// Classify an artifact by its full store path.
///
/// Only the remainder after the grouping key is inspected, so a grouping
/// key that happens to contain a keyword does not taint its artifacts.
/// Paths without a separator are matched as a whole.
pub fn classify(path: &str) -> Channel {
    match split_path(path) {
        Some((_, remainder)) => classify_remainder(remainder),
        None => classify_remainder(path),
    }
}

/// Classify the remainder of an artifact path (the part after the grouping key)
pub fn classify_remainder(remainder: &str) -> Channel {
    KEYWORDS
        .iter()
        .find(|(keyword, _)| remainder.contains(keyword))
        .map(|(_, channel)| *channel)
        .unwrap_or(Channel::Unrecognized)
}

/// Grouping key of a path: the segment before the first separator.
///
/// Entries without a separator belong to no group.
pub fn grouping_key(path: &str) -> Option<&str> {
    split_path(path).map(|(key, _)| key)
}

/// Split a path into `(grouping_key, remainder)`
pub fn split_path(path: &str) -> Option<(&str, &str)> {
    path.split_once(SEPARATOR)
}

/// Listing prefix for a grouping key (`"<key>/"`)
pub fn group_prefix(key: &str) -> String {
    format!("{}{}", key, SEPARATOR)
}

//! Local submission requests.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A target language the translation stage supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

/// Supported translation targets
pub const LANGUAGES: [Language; 5] = [
    Language { code: "en", name: "English" },
    Language { code: "ta", name: "Tamil" },
    Language { code: "hi", name: "Hindi" },
    Language { code: "es", name: "Spanish" },
    Language { code: "fr", name: "French" },
];

/// Fallback when a request names an unsupported language
pub const DEFAULT_LANGUAGE: Language = LANGUAGES[0];

impl Language {
    /// Look up a language by its code
    pub fn from_code(code: &str) -> Option<Language> {
        let code = code.trim().to_lowercase();
        LANGUAGES.iter().copied().find(|l| l.code == code)
    }

    /// Whether documents in this language need a translation stage
    pub fn needs_translation(&self) -> bool {
        self.code != DEFAULT_LANGUAGE.code
    }
}

/// File metadata for a locally submitted document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// Original file name
    pub file_name: String,

    /// Declared MIME type
    pub mime_type: String,

    pub size_bytes: u64,

    /// Target language code (`en`, `ta`, ...)
    pub language_code: String,

    /// Local file with the payload, when the pipeline needs the bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

impl SubmissionRequest {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
        language_code: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size_bytes,
            language_code: language_code.into(),
            source_path: None,
        }
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Resolved target language, if the code is supported
    pub fn language(&self) -> Option<Language> {
        Language::from_code(&self.language_code)
    }
}

/// Guess a MIME type from a file extension
pub fn mime_from_extension(path: &std::path::Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}

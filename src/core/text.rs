use std::fmt;
use std::ops::Deref;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::core::types::{MimeError, MimeType};

/// Encoding assigned when none (or an unknown one) is supplied
pub const DEFAULT_ENCODING: &str = "UTF-8";

static KNOWN_ENCODINGS: Lazy<RwLock<Vec<String>>> = Lazy::new(|| {
    RwLock::new(
        [
            "US-ASCII",
            "ASCII",
            "windows-1250",
            "Cp1250",
            "windows-1251",
            "Cp1251",
            "windows-1252",
            "Cp1252",
            "windows-1253",
            "Cp1253",
            "windows-1254",
            "Cp1254",
            "windows-1257",
            "Cp1257",
            "ISO-8859-1",
            "ISO8859_1",
            "ISO-8859-2",
            "ISO8859_2",
            "ISO-8859-4",
            "ISO8859_4",
            "ISO-8859-5",
            "ISO8859_5",
            "ISO-8859-7",
            "ISO8859_7",
            "ISO-8859-9",
            "ISO8859_9",
            "ISO-8859-13",
            "ISO8859_13",
            "ISO-8859-15",
            "ISO8859_15",
            "KOI8-R",
            "KOI8_R",
            "UTF-8",
            "UTF8",
            "UTF-16",
            "UTF-16BE",
            "UTF-16LE",
            "UTF-32",
            "UTF-32BE",
            "UTF-32LE",
            "UnicodeBig",
            "UnicodeLittle",
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect(),
    )
});

/// Register an additional encoding name. Blank names are ignored.
pub fn add_known_encoding(encoding: &str) {
    let encoding = encoding.trim();
    if encoding.is_empty() {
        return;
    }
    let mut known = KNOWN_ENCODINGS.write();
    if !known.iter().any(|e| e == encoding) {
        known.push(encoding.to_string());
    }
}

pub fn is_known_encoding(encoding: &str) -> bool {
    KNOWN_ENCODINGS.read().iter().any(|e| e == encoding)
}

pub fn known_encodings() -> Vec<String> {
    KNOWN_ENCODINGS.read().clone()
}

fn valid_encoding_or_default(encoding: &str) -> String {
    let encoding = encoding.trim();
    if encoding.is_empty() || !is_known_encoding(encoding) {
        DEFAULT_ENCODING.to_string()
    } else {
        encoding.to_string()
    }
}

/// A MIME type for textual content, carrying the character encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMimeType {
    mime_type: MimeType,
    encoding: String,
}

impl TextMimeType {
    /// Wrap a type with the default encoding
    pub fn new(mime_type: MimeType) -> Self {
        Self {
            mime_type,
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }

    /// Wrap a type with an encoding; unknown encodings fall back to the default
    pub fn with_encoding(mime_type: MimeType, encoding: &str) -> Self {
        Self {
            mime_type,
            encoding: valid_encoding_or_default(encoding),
        }
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Change the encoding
    ///
    /// # Errors
    ///
    /// Returns `MimeError::UnknownEncoding` if the name is not registered.
    pub fn set_encoding(&mut self, encoding: &str) -> Result<(), MimeError> {
        if !is_known_encoding(encoding) {
            return Err(MimeError::UnknownEncoding(encoding.to_string()));
        }
        self.encoding = encoding.to_string();
        Ok(())
    }

    /// Replace the media/sub pair, keeping specificity and encoding
    pub fn set_mime_type(&mut self, mime_type: MimeType) {
        let specificity = self.mime_type.specificity();
        self.mime_type = mime_type.with_specificity(specificity);
    }

    pub fn mime_type(&self) -> &MimeType {
        &self.mime_type
    }

    pub fn into_parts(self) -> (MimeType, String) {
        (self.mime_type, self.encoding)
    }
}

impl Deref for TextMimeType {
    type Target = MimeType;

    fn deref(&self) -> &Self::Target {
        &self.mime_type
    }
}

impl fmt::Display for TextMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};charset={}", self.mime_type, self.encoding)
    }
}

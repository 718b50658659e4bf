use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use thiserror::Error;

/// Placeholder used when no detector could classify the input
pub const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// Reported by the plain-text fallback for zero-length content
pub const EMPTY_MIME_TYPE: &str = "application/x-empty";

/// Reported by the plain-text fallback and the text detector
pub const TEXT_PLAIN: &str = "text/plain";

/// Reported by the magic detector for directories
pub const DIRECTORY_MIME_TYPE: &str = "application/directory";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MimeError {
    #[error("Invalid MIME type format: '{0}'")]
    InvalidMimeTypeFormat(String),

    #[error("Invalid quality indicator '{0}': must be a number between 0 and 1")]
    InvalidQuality(String),

    #[error("Unknown text encoding: '{0}'")]
    UnknownEncoding(String),

    #[error("At least one MIME type must be provided")]
    NothingProvided,
}

/// A media/subtype pair identifying a content type.
///
/// Equality and hashing consider only the two tokens, compared case-sensitively.
/// The `specificity` counter ranks competing detections and is ignored for identity.
/// A `*` token is accepted in either position but is never equal to a concrete token.
#[derive(Debug, Clone)]
pub struct MimeType {
    media_type: String,
    sub_type: String,
    specificity: u32,
}

impl MimeType {
    /// Build a type from already-split tokens
    ///
    /// # Errors
    ///
    /// Returns `MimeError::InvalidMimeTypeFormat` if either token is empty or
    /// contains a separator or whitespace.
    pub fn new(media_type: &str, sub_type: &str) -> Result<Self, MimeError> {
        let media_type = media_type.trim();
        let sub_type = sub_type.trim();
        if !is_valid_token(media_type) || !is_valid_token(sub_type) {
            return Err(MimeError::InvalidMimeTypeFormat(format!(
                "{media_type}/{sub_type}"
            )));
        }
        Ok(Self {
            media_type: media_type.to_string(),
            sub_type: sub_type.to_string(),
            specificity: 0,
        })
    }

    #[must_use]
    pub fn with_specificity(mut self, specificity: u32) -> Self {
        self.specificity = specificity;
        self
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn sub_type(&self) -> &str {
        &self.sub_type
    }

    pub fn specificity(&self) -> u32 {
        self.specificity
    }

    pub fn set_specificity(&mut self, specificity: u32) {
        self.specificity = specificity;
    }

    /// `application/octet-stream`, built without parsing
    pub(crate) fn octet_stream() -> Self {
        Self {
            media_type: "application".to_string(),
            sub_type: "octet-stream".to_string(),
            specificity: 0,
        }
    }

    /// True if either token is a wildcard
    pub fn is_wildcard(&self) -> bool {
        self.media_type.contains('*') || self.sub_type.contains('*')
    }
}

fn is_valid_token(token: &str) -> bool {
    !token.is_empty()
        && !token
            .chars()
            .any(|c| c == '/' || c == ';' || c == ',' || c.is_whitespace())
}

impl FromStr for MimeType {
    type Err = MimeError;

    /// Parse `media/sub[;params]`. Parameters are discarded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let essence = s.split(';').next().unwrap_or_default().trim();
        let (media, sub) = essence
            .split_once('/')
            .ok_or_else(|| MimeError::InvalidMimeTypeFormat(s.to_string()))?;
        Self::new(media, sub).map_err(|_| MimeError::InvalidMimeTypeFormat(s.to_string()))
    }
}

impl TryFrom<&str> for MimeType {
    type Error = MimeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl PartialEq for MimeType {
    fn eq(&self, other: &Self) -> bool {
        self.media_type == other.media_type && self.sub_type == other.sub_type
    }
}

impl Eq for MimeType {}

impl Hash for MimeType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.media_type.hash(state);
        self.sub_type.hash(state);
    }
}

impl PartialEq<str> for MimeType {
    fn eq(&self, other: &str) -> bool {
        other
            .parse::<MimeType>()
            .is_ok_and(|parsed| parsed == *self)
    }
}

impl PartialEq<&str> for MimeType {
    fn eq(&self, other: &&str) -> bool {
        <MimeType as PartialEq<str>>::eq(self, other)
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.media_type, self.sub_type)
    }
}

/// Media (major) part of a type string, parameters ignored
///
/// # Errors
///
/// Returns `MimeError::InvalidMimeTypeFormat` if the string is not `media/sub`.
pub fn media_type(mime_type: &str) -> Result<String, MimeError> {
    Ok(mime_type.parse::<MimeType>()?.media_type)
}

/// Sub (minor) part of a type string, parameters ignored
///
/// # Errors
///
/// Returns `MimeError::InvalidMimeTypeFormat` if the string is not `media/sub`.
pub fn sub_type(mime_type: &str) -> Result<String, MimeError> {
    Ok(mime_type.parse::<MimeType>()?.sub_type)
}

/// First entry of a comma-separated type list, `None` for a blank list
///
/// # Errors
///
/// Returns `MimeError::InvalidMimeTypeFormat` if the first entry is malformed.
pub fn first_type(mime_types: &str) -> Result<Option<MimeType>, MimeError> {
    if mime_types.trim().is_empty() {
        return Ok(None);
    }
    let first = mime_types.split(',').next().unwrap_or_default();
    first.trim().parse().map(Some)
}

/// Split a comma-separated type list into parsed types
///
/// # Errors
///
/// Returns `MimeError::InvalidMimeTypeFormat` on the first malformed entry.
pub fn parse_list(mime_types: &str) -> Result<Vec<MimeType>, MimeError> {
    mime_types
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

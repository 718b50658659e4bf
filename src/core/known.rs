//! Registry of every MIME type observed or declared so far.
//!
//! Used only for membership queries, never for detection.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;

use crate::core::types::{MimeError, MimeType};

#[derive(Debug, Default)]
pub struct KnownTypes {
    types: RwLock<BTreeMap<String, BTreeSet<String>>>,
}

impl KnownTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, mime_type: &MimeType) {
        self.types
            .write()
            .entry(mime_type.media_type().to_string())
            .or_default()
            .insert(mime_type.sub_type().to_string());
    }

    /// Add a type given as a string
    ///
    /// # Errors
    ///
    /// Returns `MimeError::InvalidMimeTypeFormat` if the string is not `media/sub`.
    pub fn add_str(&self, mime_type: &str) -> Result<(), MimeError> {
        self.add(&mime_type.parse()?);
        Ok(())
    }

    pub fn add_all<'a, I: IntoIterator<Item = &'a MimeType>>(&self, types: I) {
        let mut map = self.types.write();
        for mime_type in types {
            map.entry(mime_type.media_type().to_string())
                .or_default()
                .insert(mime_type.sub_type().to_string());
        }
    }

    pub fn contains(&self, mime_type: &MimeType) -> bool {
        self.types
            .read()
            .get(mime_type.media_type())
            .is_some_and(|subs| subs.contains(mime_type.sub_type()))
    }

    /// Membership check for a type string; malformed strings are never known
    pub fn contains_str(&self, mime_type: &str) -> bool {
        mime_type
            .parse::<MimeType>()
            .is_ok_and(|parsed| self.contains(&parsed))
    }

    /// Known sub types of one media type, sorted
    pub fn sub_types(&self, media_type: &str) -> Vec<String> {
        self.types
            .read()
            .get(media_type)
            .map(|subs| subs.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.types.read().values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

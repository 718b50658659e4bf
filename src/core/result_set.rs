//! Specificity-aware set of detected MIME types.
//!
//! Membership follows [`MimeType`] equality (media and subtype only). Adding a type
//! that is already present does not create a second entry; it raises the stored
//! entry's specificity instead, so a type proposed by several detectors ranks above
//! one proposed by a single detector.

use std::fmt;

use indexmap::IndexMap;

use crate::core::text::TextMimeType;
use crate::core::types::{parse_list, MimeType};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TypeKey {
    media_type: String,
    sub_type: String,
}

impl From<&MimeType> for TypeKey {
    fn from(mime_type: &MimeType) -> Self {
        Self {
            media_type: mime_type.media_type().to_string(),
            sub_type: mime_type.sub_type().to_string(),
        }
    }
}

/// One stored detection: the type with its accumulated specificity, and the
/// character encoding when the type was reported as text
#[derive(Debug, Clone)]
pub struct DetectedType {
    pub mime_type: MimeType,
    pub encoding: Option<String>,
}

impl DetectedType {
    pub fn is_text(&self) -> bool {
        self.encoding.is_some()
    }

    /// View as a text type, using the default encoding for non-text entries
    pub fn to_text(&self) -> TextMimeType {
        match &self.encoding {
            Some(encoding) => TextMimeType::with_encoding(self.mime_type.clone(), encoding),
            None => TextMimeType::new(self.mime_type.clone()),
        }
    }
}

/// Contribution of one insertion: the incoming specificity, at least 1
fn contribution(mime_type: &MimeType) -> u32 {
    mime_type.specificity().max(1)
}

#[derive(Debug, Clone, Default)]
pub struct MimeTypeSet {
    entries: IndexMap<TypeKey, DetectedType>,
}

impl MimeTypeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type. Returns `true` if it was not already present.
    pub fn insert(&mut self, mime_type: MimeType) -> bool {
        self.insert_detected(DetectedType {
            mime_type,
            encoding: None,
        })
    }

    /// Add a text type, recording its encoding
    pub fn insert_text(&mut self, text: TextMimeType) -> bool {
        let (mime_type, encoding) = text.into_parts();
        self.insert_detected(DetectedType {
            mime_type,
            encoding: Some(encoding),
        })
    }

    fn insert_detected(&mut self, detected: DetectedType) -> bool {
        let key = TypeKey::from(&detected.mime_type);
        let added = contribution(&detected.mime_type);
        if let Some(existing) = self.entries.get_mut(&key) {
            let bumped = existing.mime_type.specificity().saturating_add(added);
            existing.mime_type.set_specificity(bumped);
            if existing.encoding.is_none() {
                existing.encoding = detected.encoding;
            }
            false
        } else {
            let mut detected = detected;
            detected.mime_type.set_specificity(added);
            self.entries.insert(key, detected);
            true
        }
    }

    /// Merge every entry of `other`, accumulating specificity.
    /// Returns `true` if at least one new type was added.
    pub fn union(&mut self, other: &MimeTypeSet) -> bool {
        let mut added = false;
        for detected in other.entries.values() {
            added |= self.insert_detected(detected.clone());
        }
        added
    }

    /// Add every type from an iterator
    pub fn extend<I: IntoIterator<Item = MimeType>>(&mut self, types: I) -> bool {
        let mut added = false;
        for mime_type in types {
            added |= self.insert(mime_type);
        }
        added
    }

    pub fn contains(&self, mime_type: &MimeType) -> bool {
        self.entries.contains_key(&TypeKey::from(mime_type))
    }

    /// True if every type of a comma-separated list is present.
    /// A malformed list is never contained.
    pub fn contains_str(&self, mime_types: &str) -> bool {
        match parse_list(mime_types) {
            Ok(list) if !list.is_empty() => self.contains_all(&list),
            _ => false,
        }
    }

    pub fn contains_all(&self, mime_types: &[MimeType]) -> bool {
        mime_types.iter().all(|m| self.contains(m))
    }

    pub fn get(&self, mime_type: &MimeType) -> Option<&DetectedType> {
        self.entries.get(&TypeKey::from(mime_type))
    }

    pub fn remove(&mut self, mime_type: &MimeType) -> Option<DetectedType> {
        self.entries.shift_remove(&TypeKey::from(mime_type))
    }

    /// Replace the entry for `old` with a rewritten text type at the same position.
    /// If the rewritten type is already present the two entries are merged.
    pub fn replace_text(&mut self, old: &MimeType, rewritten: TextMimeType) {
        let Some((index, _, previous)) = self.entries.shift_remove_full(&TypeKey::from(old))
        else {
            self.insert_text(rewritten);
            return;
        };
        let (mut mime_type, encoding) = rewritten.into_parts();
        mime_type.set_specificity(
            mime_type
                .specificity()
                .max(previous.mime_type.specificity()),
        );
        let key = TypeKey::from(&mime_type);
        if let Some(existing) = self.entries.get_mut(&key) {
            let merged = existing
                .mime_type
                .specificity()
                .saturating_add(contribution(&mime_type));
            existing.mime_type.set_specificity(merged);
            existing.encoding = Some(encoding);
        } else {
            self.entries.shift_insert(
                index,
                key,
                DetectedType {
                    mime_type,
                    encoding: Some(encoding),
                },
            );
        }
    }

    /// Types in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &MimeType> {
        self.entries.values().map(|d| &d.mime_type)
    }

    /// Stored entries in insertion order
    pub fn detected(&self) -> impl Iterator<Item = &DetectedType> {
        self.entries.values()
    }

    /// Entry with the highest specificity; the earliest inserted wins ties
    pub fn most_specific(&self) -> Option<&MimeType> {
        let mut best: Option<&MimeType> = None;
        for mime_type in self.iter() {
            if best.map_or(true, |b| mime_type.specificity() > b.specificity()) {
                best = Some(mime_type);
            }
        }
        best
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Same-size mutual containment; specificity is not compared
    pub fn matches(&self, other: &MimeTypeSet) -> bool {
        self.len() == other.len() && other.iter().all(|m| self.contains(m))
    }
}

impl PartialEq for MimeTypeSet {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl PartialEq<str> for MimeTypeSet {
    fn eq(&self, other: &str) -> bool {
        match parse_list(other) {
            Ok(list) => {
                let other: MimeTypeSet = list.into_iter().collect();
                self.matches(&other)
            }
            Err(_) => false,
        }
    }
}

impl PartialEq<&str> for MimeTypeSet {
    fn eq(&self, other: &&str) -> bool {
        <MimeTypeSet as PartialEq<str>>::eq(self, other)
    }
}

impl FromIterator<MimeType> for MimeTypeSet {
    fn from_iter<I: IntoIterator<Item = MimeType>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl From<MimeType> for MimeTypeSet {
    fn from(mime_type: MimeType) -> Self {
        let mut set = Self::new();
        set.insert(mime_type);
        set
    }
}

impl fmt::Display for MimeTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, mime_type) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{mime_type}")?;
        }
        Ok(())
    }
}

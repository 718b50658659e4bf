use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::{CatalogError, CATALOG_VERSION};
use crate::core::types::MimeType;

const EMBEDDED_EXTENSIONS: &str = include_str!("../../catalogs/extensions.json");

/// Serializable extension table format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionData {
    pub version: String,
    pub extensions: BTreeMap<String, Vec<String>>,
}

/// Mapping from file extension (without the leading dot) to MIME types
#[derive(Debug, Clone, Default)]
pub struct ExtensionTable {
    entries: BTreeMap<String, Vec<MimeType>>,
}

impl ExtensionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the embedded default table
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the embedded table is malformed.
    pub fn load_embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_EXTENSIONS)
    }

    /// Load a table from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ReadError` if the file cannot be read, or a parse
    /// error if the content is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a table from a JSON string
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ParseError` for invalid JSON and
    /// `CatalogError::Mime` for malformed type strings.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let data: ExtensionData = serde_json::from_str(json)?;
        if data.version != CATALOG_VERSION {
            warn!(
                expected = CATALOG_VERSION,
                found = %data.version,
                "Extension table version mismatch"
            );
        }
        let mut table = Self::new();
        for (extension, types) in data.extensions {
            let types = types
                .iter()
                .map(|t| t.parse::<MimeType>())
                .collect::<Result<Vec<_>, _>>()?;
            table.insert(&extension, types);
        }
        Ok(table)
    }

    /// Set the types for an extension, replacing any previous entry
    pub fn insert(&mut self, extension: &str, types: Vec<MimeType>) {
        let extension = extension.trim_start_matches('.');
        if extension.is_empty() || types.is_empty() {
            return;
        }
        self.entries.insert(extension.to_string(), types);
    }

    /// Overlay another table; its entries win
    pub fn merge(&mut self, other: ExtensionTable) {
        self.entries.extend(other.entries);
    }

    /// Exact (case-sensitive) lookup
    pub fn get(&self, extension: &str) -> Option<&[MimeType]> {
        self.entries.get(extension).map(Vec::as_slice)
    }

    /// Case-sensitive lookup, then lower-case
    pub fn lookup(&self, extension: &str) -> Option<&[MimeType]> {
        self.get(extension)
            .or_else(|| self.get(&extension.to_lowercase()))
    }

    /// Every type mentioned in the table
    pub fn mime_types(&self) -> impl Iterator<Item = &MimeType> {
        self.entries.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Export to JSON
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ParseError` if serialization fails.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let data = ExtensionData {
            version: CATALOG_VERSION.to_string(),
            extensions: self
                .entries
                .iter()
                .map(|(ext, types)| (ext.clone(), types.iter().map(ToString::to_string).collect()))
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }
}

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::{CatalogError, CATALOG_VERSION};
use crate::core::types::MimeType;

const EMBEDDED_GLOBS: &str = include_str!("../../catalogs/globs.json");

/// File names are matched as a single component, so `*` never crosses `/`
const GLOB_MATCH_OPTIONS: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Serializable glob table format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobData {
    pub version: String,
    pub globs: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
struct GeneralGlob {
    source: String,
    pattern: glob::Pattern,
    types: Vec<MimeType>,
}

/// File name patterns grouped by how they are matched.
///
/// Precedence: literal names, then `*.suffix` patterns (longest suffix first),
/// then any other glob (longest pattern first).
#[derive(Debug, Clone, Default)]
pub struct GlobTable {
    literals: BTreeMap<String, Vec<MimeType>>,
    suffixes: BTreeMap<String, Vec<MimeType>>,
    general: Vec<GeneralGlob>,
}

fn has_glob_chars(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

impl GlobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the embedded default table
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the embedded table is malformed.
    pub fn load_embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_GLOBS)
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
    /// Returns `CatalogError::ParseError` for invalid JSON, `CatalogError::Mime`
    /// for malformed types, and `CatalogError::Pattern` for invalid globs.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let data: GlobData = serde_json::from_str(json)?;
        if data.version != CATALOG_VERSION {
            warn!(
                expected = CATALOG_VERSION,
                found = %data.version,
                "Glob table version mismatch"
            );
        }
        let mut table = Self::new();
        for (pattern, types) in data.globs {
            let types = types
                .iter()
                .map(|t| t.parse::<MimeType>())
                .collect::<Result<Vec<_>, _>>()?;
            table.insert(&pattern, types)?;
        }
        Ok(table)
    }

    /// Add a pattern
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Pattern` if the glob does not compile.
    pub fn insert(&mut self, pattern: &str, types: Vec<MimeType>) -> Result<(), CatalogError> {
        if pattern.is_empty() || types.is_empty() {
            return Ok(());
        }
        if !has_glob_chars(pattern) {
            self.literals.insert(pattern.to_string(), types);
            return Ok(());
        }
        if let Some(suffix) = pattern.strip_prefix('*') {
            if !suffix.is_empty() && !has_glob_chars(suffix) {
                self.suffixes.insert(suffix.to_string(), types);
                return Ok(());
            }
        }
        let compiled =
            glob::Pattern::new(pattern).map_err(|_| CatalogError::Pattern(pattern.to_string()))?;
        self.general.push(GeneralGlob {
            source: pattern.to_string(),
            pattern: compiled,
            types,
        });
        Ok(())
    }

    /// Types for a file name (not a path); retries in lower case
    pub fn lookup(&self, file_name: &str) -> Option<&[MimeType]> {
        self.lookup_exact(file_name).or_else(|| {
            let lower = file_name.to_lowercase();
            if lower == file_name {
                None
            } else {
                self.lookup_exact(&lower)
            }
        })
    }

    fn lookup_exact(&self, file_name: &str) -> Option<&[MimeType]> {
        if let Some(types) = self.literals.get(file_name) {
            return Some(types);
        }

        let suffix = self
            .suffixes
            .iter()
            .filter(|(suffix, _)| file_name.ends_with(*suffix))
            .max_by_key(|(suffix, _)| suffix.len());
        if let Some((_, types)) = suffix {
            return Some(types);
        }

        let mut best: Option<&GeneralGlob> = None;
        for glob in &self.general {
            if glob.pattern.matches_with(file_name, GLOB_MATCH_OPTIONS)
                && best.map_or(true, |b| glob.source.len() > b.source.len())
            {
                best = Some(glob);
            }
        }
        best.map(|g| g.types.as_slice())
    }

    /// Every type mentioned in the table
    pub fn mime_types(&self) -> impl Iterator<Item = &MimeType> {
        self.literals
            .values()
            .chain(self.suffixes.values())
            .chain(self.general.iter().map(|g| &g.types))
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.literals.len() + self.suffixes.len() + self.general.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

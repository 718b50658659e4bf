use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::extensions::ExtensionTable;
use crate::catalog::globs::GlobTable;
use crate::catalog::store::MagicCatalog;
use crate::catalog::CatalogError;
use crate::core::types::{MimeError, UNKNOWN_MIME_TYPE};
use crate::detector::{
    Detector, ExtensionDetector, GlobDetector, MagicDetector, ShellDetector, TextDetector,
};
use crate::matching::text::DEFAULT_SAMPLE_SIZE;
use crate::registry::handler::{builtin_handler, HandlerChain, BUILTIN_HANDLERS};

const EMBEDDED_MANIFEST: &str = include_str!("../../catalogs/detectors");

/// Detector ids accepted in configuration and the manifest
pub const BUILTIN_DETECTORS: [&str; 5] = ["magic", "extension", "glob", "text", "shell"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown detector '{0}'")]
    UnknownDetector(String),

    #[error("Unknown handler '{0}'")]
    UnknownHandler(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Mime(#[from] MimeError),
}

/// Settings for building a [`MimeSleuth`](crate::registry::sleuth::MimeSleuth)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SleuthConfig {
    /// Type returned when no detector recognises the input
    pub unknown_mime_type: String,

    /// Detector ids to register; `None` uses the built-in manifest
    pub detectors: Option<Vec<String>>,

    /// Handler ids in chain order
    pub handlers: Vec<String>,

    /// Extra rule files, appended after the embedded rules
    pub magic_files: Vec<PathBuf>,

    /// Also load the rule files installed with `file(1)`
    pub system_magic: bool,

    /// Extension tables overriding the embedded entries
    pub extension_files: Vec<PathBuf>,

    pub text_fallback: bool,
    pub text_sample_size: usize,
}

impl Default for SleuthConfig {
    fn default() -> Self {
        Self {
            unknown_mime_type: UNKNOWN_MIME_TYPE.to_string(),
            detectors: None,
            handlers: BUILTIN_HANDLERS.iter().map(|h| (*h).to_string()).collect(),
            magic_files: Vec::new(),
            system_magic: false,
            extension_files: Vec::new(),
            text_fallback: true,
            text_sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl SleuthConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` or `ConfigError::Parse` if the file cannot
    /// be read or is not valid JSON.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Detector ids to register, in the order listed
    pub fn detector_ids(&self) -> Vec<String> {
        self.detectors.clone().unwrap_or_else(manifest_detectors)
    }

    /// Extension table: embedded entries overridden by each configured file in turn
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Catalog` if any table fails to load.
    pub fn extension_table(&self) -> Result<ExtensionTable, ConfigError> {
        let mut table = ExtensionTable::load_embedded()?;
        for path in &self.extension_files {
            table.merge(ExtensionTable::load_from_file(path)?);
        }
        Ok(table)
    }

    /// Magic rules: embedded, then configured files, then system files
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Catalog` if a configured rule file cannot be read.
    pub fn magic_catalog(&self) -> Result<MagicCatalog, ConfigError> {
        let mut catalog = MagicCatalog::load_embedded();
        for path in &self.magic_files {
            catalog.load_file(path)?;
        }
        if self.system_magic {
            catalog.load_system();
        }
        Ok(catalog)
    }

    /// Instantiate the configured detectors
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownDetector` for an unrecognised id, or a
    /// catalog error if a table fails to load.
    pub fn build_detectors(
        &self,
        extensions: &ExtensionTable,
    ) -> Result<Vec<Arc<dyn Detector>>, ConfigError> {
        let mut detectors: Vec<Arc<dyn Detector>> = Vec::new();
        for id in self.detector_ids() {
            let detector: Arc<dyn Detector> = match id.as_str() {
                "magic" => Arc::new(
                    MagicDetector::new(self.magic_catalog()?)
                        .with_text_fallback(self.text_fallback)
                        .with_sample_size(self.text_sample_size),
                ),
                "extension" => Arc::new(ExtensionDetector::new(extensions.clone())),
                "glob" => Arc::new(GlobDetector::new(GlobTable::load_embedded()?)),
                "text" => Arc::new(TextDetector::new().with_sample_size(self.text_sample_size)),
                "shell" => Arc::new(ShellDetector::new()),
                _ => return Err(ConfigError::UnknownDetector(id)),
            };
            detectors.push(detector);
        }
        Ok(detectors)
    }

    /// Build the configured handler chain
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownHandler` for an unrecognised id.
    pub fn build_handlers(&self) -> Result<HandlerChain, ConfigError> {
        let mut chain = HandlerChain::new();
        for id in &self.handlers {
            let handler =
                builtin_handler(id)?.ok_or_else(|| ConfigError::UnknownHandler(id.clone()))?;
            chain.push(handler);
        }
        Ok(chain)
    }
}

/// Detector ids listed in a manifest: one per line, `#` comments and blank lines ignored
pub fn parse_manifest(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}

/// Detector ids from the embedded manifest
pub fn manifest_detectors() -> Vec<String> {
    parse_manifest(EMBEDDED_MANIFEST)
}

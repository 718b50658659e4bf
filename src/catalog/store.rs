use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::{debug, warn};

use crate::catalog::CatalogError;
use crate::parsing::magic::{compile, MagicRuleSet};

/// Locations searched for system rule files, in load order
pub const SYSTEM_MAGIC_LOCATIONS: [&str; 3] = [
    "/etc/magic.mime",
    "/usr/share/file/magic.mime",
    "/usr/share/mimelnk/magic",
];

/// Name under which the embedded rules are reported
pub const EMBEDDED_SOURCE: &str = "<embedded>";

const EMBEDDED_MAGIC: &str = include_str!("../../catalogs/magic.mime");

/// Combined rule set built from one or more rule sources.
/// Sources added earlier take precedence.
#[derive(Debug, Clone, Default)]
pub struct MagicCatalog {
    rules: MagicRuleSet,
    sources: Vec<String>,
}

impl MagicCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding only the embedded rules
    pub fn load_embedded() -> Self {
        let mut catalog = Self::new();
        catalog.add_source(EMBEDDED_SOURCE, EMBEDDED_MAGIC);
        catalog
    }

    /// Compile rule text and append it after the existing sources.
    /// Returns the number of top-level rules accepted.
    pub fn add_source(&mut self, name: &str, text: &str) -> usize {
        let report = compile(name, text);
        let accepted = report.rules.len();
        if !report.rejected.is_empty() {
            warn!(
                source = name,
                rejected = report.rejected.len(),
                "Some magic rule groups were skipped"
            );
        }
        self.rules.append(report.rules);
        self.sources.push(name.to_string());
        accepted
    }

    /// Append a rule file. Files ending in `.gz` are decompressed.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ReadError` if the file cannot be read.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, CatalogError> {
        let text = read_rule_file(path)?;
        Ok(self.add_source(&path.display().to_string(), &text))
    }

    /// Append every system rule file that exists. Unreadable files are skipped.
    /// Returns how many files were loaded.
    pub fn load_system(&mut self) -> usize {
        let mut loaded = 0;
        for location in SYSTEM_MAGIC_LOCATIONS {
            let path = Path::new(location);
            if !path.exists() {
                debug!(path = location, "System magic file not present");
                continue;
            }
            match self.load_file(path) {
                Ok(_) => loaded += 1,
                Err(e) => warn!(path = location, error = %e, "Failed to load system magic file"),
            }
        }
        loaded
    }

    pub fn rules(&self) -> &MagicRuleSet {
        &self.rules
    }

    /// Names of the loaded sources, in precedence order
    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

fn is_gzipped(path: &Path) -> bool {
    path.to_string_lossy().to_lowercase().ends_with(".gz")
}

/// Read a rule file as text; invalid UTF-8 is replaced rather than rejected
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or decompressed.
pub fn read_rule_file(path: &Path) -> Result<String, std::io::Error> {
    let mut bytes = Vec::new();
    let file = std::fs::File::open(path)?;
    if is_gzipped(path) {
        GzDecoder::new(file).read_to_end(&mut bytes)?;
    } else {
        let mut file = file;
        file.read_to_end(&mut bytes)?;
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

use std::fs::File;
use std::path::Path;

use crate::catalog::store::MagicCatalog;
use crate::core::result_set::MimeTypeSet;
use crate::core::types::{MimeType, DIRECTORY_MIME_TYPE};
use crate::detector::{Detector, DetectorError, SeekRead};
use crate::matching::engine::MagicMatcher;
use crate::matching::source::{ByteSource, SeekSource, SliceSource};
use crate::matching::text::{plain_text_fallback, DEFAULT_SAMPLE_SIZE};

/// Content detector driven by magic byte-pattern rules
#[derive(Debug, Clone)]
pub struct MagicDetector {
    catalog: MagicCatalog,
    text_fallback: bool,
    sample_size: usize,
}

impl MagicDetector {
    pub fn new(catalog: MagicCatalog) -> Self {
        Self {
            catalog,
            text_fallback: true,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    /// Detector using only the embedded rules
    pub fn embedded() -> Self {
        Self::new(MagicCatalog::load_embedded())
    }

    /// Enable or disable the plain-text fallback
    #[must_use]
    pub fn with_text_fallback(mut self, enabled: bool) -> Self {
        self.text_fallback = enabled;
        self
    }

    /// Number of leading bytes inspected by the plain-text fallback
    #[must_use]
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn catalog(&self) -> &MagicCatalog {
        &self.catalog
    }

    fn classify_source(&self, source: &mut dyn ByteSource) -> Result<MimeTypeSet, DetectorError> {
        let matcher = MagicMatcher::new(self.catalog.rules());
        let mut result = MimeTypeSet::new();
        for found in matcher.find_matches(source)? {
            result.insert(found.mime_type);
        }

        if self.text_fallback {
            if let Some(fallback) = plain_text_fallback(source, self.sample_size)? {
                let mime_type: MimeType = fallback
                    .parse()
                    .map_err(|e| DetectorError::ClassificationFailure(format!("{e}")))?;
                result.insert(mime_type);
            }
        }
        Ok(result)
    }
}

impl Default for MagicDetector {
    fn default() -> Self {
        Self::embedded()
    }
}

impl Detector for MagicDetector {
    fn description(&self) -> &str {
        "Detects content types by matching magic byte patterns"
    }

    fn classify_path(&self, path: &Path) -> Result<MimeTypeSet, DetectorError> {
        if path.is_dir() {
            let directory: MimeType = DIRECTORY_MIME_TYPE
                .parse()
                .map_err(|e| DetectorError::ClassificationFailure(format!("{e}")))?;
            return Ok(MimeTypeSet::from(directory));
        }
        let mut file = File::open(path)?;
        self.classify_file(&mut file)
    }

    fn classify_file(&self, file: &mut File) -> Result<MimeTypeSet, DetectorError> {
        let mut source = SeekSource::new(file)?;
        self.classify_source(&mut source)
    }

    fn classify_bytes(&self, data: &[u8]) -> Result<MimeTypeSet, DetectorError> {
        self.classify_source(&mut SliceSource::new(data))
    }

    fn classify_stream(&self, stream: &mut dyn SeekRead) -> Result<MimeTypeSet, DetectorError> {
        let mut source = SeekSource::new(stream)?;
        self.classify_source(&mut source)
    }
}

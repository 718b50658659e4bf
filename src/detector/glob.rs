use std::path::Path;

use crate::catalog::globs::GlobTable;
use crate::core::result_set::MimeTypeSet;
use crate::detector::{base_name, file_name_of, Detector, DetectorError};

/// Name-based detector using shared-mime-info style glob patterns
#[derive(Debug, Clone, Default)]
pub struct GlobDetector {
    table: GlobTable,
}

impl GlobDetector {
    pub fn new(table: GlobTable) -> Self {
        Self { table }
    }

    fn lookup(&self, file_name: &str) -> MimeTypeSet {
        self.table
            .lookup(file_name)
            .map(|types| types.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Detector for GlobDetector {
    fn description(&self) -> &str {
        "Matches file names against glob patterns"
    }

    fn classify_name(&self, name: &str) -> Result<MimeTypeSet, DetectorError> {
        Ok(self.lookup(base_name(name)))
    }

    fn classify_path(&self, path: &Path) -> Result<MimeTypeSet, DetectorError> {
        Ok(file_name_of(path).map(|name| self.lookup(name)).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> GlobDetector {
        GlobDetector::new(GlobTable::load_embedded().unwrap())
    }

    #[test]
    fn test_literal_name() {
        assert_eq!(
            detector().classify_name("src/Makefile").unwrap(),
            "text/x-makefile"
        );
    }

    #[test]
    fn test_suffix_and_path() {
        assert_eq!(
            detector()
                .classify_path(Path::new("/tmp/archive.tar.gz"))
                .unwrap(),
            "application/x-compressed-tar"
        );
    }

    #[test]
    fn test_no_match() {
        assert!(detector().classify_name("data.qqq").unwrap().is_empty());
        assert!(detector()
            .classify_stream(&mut std::io::Cursor::new(Vec::<u8>::new()))
            .unwrap_err()
            .is_unsupported());
    }
}

use std::path::Path;

use crate::catalog::extensions::ExtensionTable;
use crate::core::result_set::MimeTypeSet;
use crate::detector::{base_name, file_name_of, Detector, DetectorError};

/// Name-based detector using the extension table
#[derive(Debug, Clone, Default)]
pub struct ExtensionDetector {
    table: ExtensionTable,
}

impl ExtensionDetector {
    pub fn new(table: ExtensionTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ExtensionTable {
        &self.table
    }

    fn lookup(&self, file_name: &str) -> MimeTypeSet {
        let mut result = MimeTypeSet::new();
        let Some(full) = full_extension(file_name) else {
            return result;
        };
        let types = self.table.lookup(full).or_else(|| {
            let last = last_extension(full)?;
            self.table.lookup(last)
        });
        if let Some(types) = types {
            result.extend(types.iter().cloned());
        }
        result
    }
}

/// Everything after the first `.` of a file name, ignoring leading dots
pub fn full_extension(file_name: &str) -> Option<&str> {
    let stem_start = file_name.len() - file_name.trim_start_matches('.').len();
    let name = &file_name[stem_start..];
    let (_, extension) = name.split_once('.')?;
    (!extension.is_empty()).then_some(extension)
}

/// Component after the last `.` of a multi-part extension
fn last_extension(extension: &str) -> Option<&str> {
    let (_, last) = extension.rsplit_once('.')?;
    (!last.is_empty()).then_some(last)
}

impl Detector for ExtensionDetector {
    fn description(&self) -> &str {
        "Maps file extensions to content types"
    }

    fn classify_name(&self, name: &str) -> Result<MimeTypeSet, DetectorError> {
        Ok(self.lookup(base_name(name)))
    }

    fn classify_path(&self, path: &Path) -> Result<MimeTypeSet, DetectorError> {
        Ok(file_name_of(path).map(|name| self.lookup(name)).unwrap_or_default())
    }
}

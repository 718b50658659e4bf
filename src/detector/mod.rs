//! Pluggable MIME detection strategies.
//!
//! Every [`Detector`] can be asked to classify five kinds of input: a bare file
//! name, a path, an open file, a byte buffer, or a seekable stream. A detector
//! that has nothing to say about an input kind returns
//! [`DetectorError::Unsupported`]; the registry skips such detectors silently.
//!
//! | Detector              | Name | Path | File | Bytes | Stream |
//! |-----------------------|------|------|------|-------|--------|
//! | [`MagicDetector`]     |      | yes  | yes  | yes   | yes    |
//! | [`ExtensionDetector`] | yes  | yes  |      |       |        |
//! | [`GlobDetector`]      | yes  | yes  |      |       |        |
//! | [`TextDetector`]      |      | yes  | yes  | yes   | yes    |
//! | [`ShellDetector`]     | yes* | yes  |      |       |        |
//!
//! \* Windows only: the registry is keyed by extension.

pub mod extension;
pub mod glob;
pub mod magic;
pub mod shell;
pub mod text;

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use thiserror::Error;

use crate::core::result_set::MimeTypeSet;

pub use extension::ExtensionDetector;
pub use glob::GlobDetector;
pub use magic::MagicDetector;
pub use shell::ShellDetector;
pub use text::{DefaultEncodingGuesser, EncodingGuesser, TextDetector};

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("{0} input is not supported by this detector")]
    Unsupported(&'static str),

    #[error("Classification failed: {0}")]
    ClassificationFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DetectorError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

/// A readable, seekable stream
pub trait SeekRead: Read + Seek {}

impl<T: Read + Seek> SeekRead for T {}

/// A single MIME detection strategy.
///
/// Implementations must leave streams and open files at the position they had
/// on entry, whether or not classification succeeds.
pub trait Detector: Send + Sync {
    /// Unique registry key. Defaults to the fully qualified type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Human-readable summary shown in listings
    fn description(&self) -> &str;

    /// Classify from a file name alone, without touching the file system
    ///
    /// # Errors
    ///
    /// Returns `DetectorError::Unsupported` unless overridden.
    fn classify_name(&self, _name: &str) -> Result<MimeTypeSet, DetectorError> {
        Err(DetectorError::Unsupported("file name"))
    }

    /// # Errors
    ///
    /// Returns `DetectorError::Unsupported` unless overridden.
    fn classify_path(&self, _path: &Path) -> Result<MimeTypeSet, DetectorError> {
        Err(DetectorError::Unsupported("path"))
    }

    /// # Errors
    ///
    /// Returns `DetectorError::Unsupported` unless overridden.
    fn classify_file(&self, _file: &mut File) -> Result<MimeTypeSet, DetectorError> {
        Err(DetectorError::Unsupported("file handle"))
    }

    /// # Errors
    ///
    /// Returns `DetectorError::Unsupported` unless overridden.
    fn classify_bytes(&self, _data: &[u8]) -> Result<MimeTypeSet, DetectorError> {
        Err(DetectorError::Unsupported("byte buffer"))
    }

    /// # Errors
    ///
    /// Returns `DetectorError::Unsupported` unless overridden.
    fn classify_stream(&self, _stream: &mut dyn SeekRead) -> Result<MimeTypeSet, DetectorError> {
        Err(DetectorError::Unsupported("stream"))
    }
}

/// File name component of a path, if it is valid UTF-8
pub(crate) fn file_name_of(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// Last component of a `/` or `\` separated name
pub(crate) fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl Detector for Silent {
        fn description(&self) -> &str {
            "does nothing"
        }
    }

    #[test]
    fn test_default_methods_are_unsupported() {
        let detector = Silent;
        assert!(detector.classify_name("a.txt").unwrap_err().is_unsupported());
        assert!(detector
            .classify_path(Path::new("a.txt"))
            .unwrap_err()
            .is_unsupported());
        assert!(detector.classify_bytes(b"abc").unwrap_err().is_unsupported());
        let mut cursor = std::io::Cursor::new(vec![1u8]);
        assert!(detector
            .classify_stream(&mut cursor)
            .unwrap_err()
            .is_unsupported());
    }

    #[test]
    fn test_default_name_is_qualified() {
        assert!(Silent.name().ends_with("detector::tests::Silent"));
        assert!(Silent.name().contains("::"));
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("dir/sub/file.tar.gz"), "file.tar.gz");
        assert_eq!(base_name(r"C:\temp\report.pdf"), "report.pdf");
        assert_eq!(base_name("plain"), "plain");
    }
}

use std::fs::File;
use std::path::Path;

use crate::core::result_set::MimeTypeSet;
use crate::core::text::TextMimeType;
use crate::core::types::{MimeType, TEXT_PLAIN};
use crate::detector::{Detector, DetectorError, SeekRead};
use crate::matching::source::{ByteSource, SeekSource, SliceSource};
use crate::matching::text::DEFAULT_SAMPLE_SIZE;

/// Decides which character encoding, if any, a byte sample is written in
pub trait EncodingGuesser: Send + Sync {
    /// Encoding name, or `None` if the sample does not look like text
    fn guess(&self, sample: &[u8]) -> Option<String>;
}

/// Byte order marks, longest first so UTF-32LE is not mistaken for UTF-16LE
const BYTE_ORDER_MARKS: [(&[u8], &str); 5] = [
    (&[0x00, 0x00, 0xFE, 0xFF], "UTF-32BE"),
    (&[0xFF, 0xFE, 0x00, 0x00], "UTF-32LE"),
    (&[0xEF, 0xBB, 0xBF], "UTF-8"),
    (&[0xFE, 0xFF], "UTF-16BE"),
    (&[0xFF, 0xFE], "UTF-16LE"),
];

/// BOM sniffing, then ASCII, UTF-8 and Latin-1 validity checks
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEncodingGuesser;

fn is_binary_control(b: u8) -> bool {
    b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b)
}

impl EncodingGuesser for DefaultEncodingGuesser {
    fn guess(&self, sample: &[u8]) -> Option<String> {
        if sample.is_empty() {
            return None;
        }
        for (mark, encoding) in BYTE_ORDER_MARKS {
            if sample.starts_with(mark) {
                return Some(encoding.to_string());
            }
        }
        if sample.iter().copied().any(is_binary_control) || sample.contains(&0x7f) {
            return None;
        }
        if sample.is_ascii() {
            return Some("US-ASCII".to_string());
        }
        match std::str::from_utf8(sample) {
            Ok(_) => Some("UTF-8".to_string()),
            // A multi-byte sequence cut off by the sample boundary
            Err(e) if e.error_len().is_none() => Some("UTF-8".to_string()),
            Err(_) if sample.iter().any(|b| (0x80..0xA0).contains(b)) => {
                Some("windows-1252".to_string())
            }
            Err(_) => Some("ISO-8859-1".to_string()),
        }
    }
}

/// Reports `text/plain` with a guessed encoding for textual content
pub struct TextDetector {
    guesser: Box<dyn EncodingGuesser>,
    sample_size: usize,
}

impl TextDetector {
    pub fn new() -> Self {
        Self::with_guesser(Box::new(DefaultEncodingGuesser))
    }

    pub fn with_guesser(guesser: Box<dyn EncodingGuesser>) -> Self {
        Self {
            guesser,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    #[must_use]
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    fn classify_source(&self, source: &mut dyn ByteSource) -> Result<MimeTypeSet, DetectorError> {
        let sample = source.read_vec(0, self.sample_size)?;
        let mut result = MimeTypeSet::new();
        if let Some(encoding) = self.guesser.guess(&sample) {
            let text_plain: MimeType = TEXT_PLAIN
                .parse()
                .map_err(|e| DetectorError::ClassificationFailure(format!("{e}")))?;
            result.insert_text(TextMimeType::with_encoding(text_plain, &encoding));
        }
        Ok(result)
    }
}

impl Default for TextDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for TextDetector {
    fn description(&self) -> &str {
        "Recognises text content and guesses its character encoding"
    }

    fn classify_path(&self, path: &Path) -> Result<MimeTypeSet, DetectorError> {
        if path.is_dir() {
            return Ok(MimeTypeSet::new());
        }
        let mut file = File::open(path)?;
        self.classify_file(&mut file)
    }

    fn classify_file(&self, file: &mut File) -> Result<MimeTypeSet, DetectorError> {
        self.classify_source(&mut SeekSource::new(file)?)
    }

    fn classify_bytes(&self, data: &[u8]) -> Result<MimeTypeSet, DetectorError> {
        self.classify_source(&mut SliceSource::new(data))
    }

    fn classify_stream(&self, stream: &mut dyn SeekRead) -> Result<MimeTypeSet, DetectorError> {
        self.classify_source(&mut SeekSource::new(stream)?)
    }
}

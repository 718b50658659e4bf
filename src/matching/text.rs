//! Plain-text fallback applied after rule matching.

use std::io;

use crate::core::types::{EMPTY_MIME_TYPE, TEXT_PLAIN};
use crate::matching::source::ByteSource;

/// Default number of leading bytes inspected
pub const DEFAULT_SAMPLE_SIZE: usize = 1024;

/// Bytes below this value (tab) are binary
const LOW_CUTOFF: u8 = 9;

/// Bytes above this value are binary
const HIGH_CUTOFF: u8 = 175;

/// Classify a sample: empty content, plain text, or inconclusive
pub fn classify_sample(sample: &[u8]) -> Option<&'static str> {
    if sample.is_empty() {
        return Some(EMPTY_MIME_TYPE);
    }
    if sample
        .iter()
        .any(|&b| !(LOW_CUTOFF..=HIGH_CUTOFF).contains(&b))
    {
        return None;
    }
    Some(TEXT_PLAIN)
}

/// Read up to `sample_size` leading bytes and classify them
///
/// # Errors
///
/// Returns an error if the source fails to read.
pub fn plain_text_fallback(
    source: &mut dyn ByteSource,
    sample_size: usize,
) -> io::Result<Option<&'static str>> {
    let sample = source.read_vec(0, sample_size)?;
    Ok(classify_sample(&sample))
}

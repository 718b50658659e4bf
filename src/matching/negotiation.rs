//! Accept-header style content negotiation.
//!
//! Quality rules for a wanted entry:
//!
//! | Entry            | Quality |
//! |------------------|---------|
//! | `x/y;q=0.5`      | 0.5 (values above 1 are clamped) |
//! | `*/*`            | 0.01    |
//! | `text/*`         | 0.02    |
//! | `text/html`      | 1.0     |

use indexmap::IndexMap;
use tracing::debug;

use crate::core::types::{MimeError, MimeType};

/// Quality of an unqualified `*/*` entry
pub const WILDCARD_MEDIA_QUALITY: f64 = 0.01;

/// Quality of an unqualified `media/*` entry
pub const WILDCARD_SUB_QUALITY: f64 = 0.02;

/// Quality of a wanted entry; blank entries have quality 0
///
/// # Errors
///
/// Returns `MimeError::InvalidQuality` for a non-numeric `q=` value and
/// `MimeError::InvalidMimeTypeFormat` when the entry has no subtype.
pub fn quality(mime_type: &str) -> Result<f64, MimeError> {
    if mime_type.trim().is_empty() {
        return Ok(0.0);
    }
    let parts: Vec<&str> = mime_type
        .split(['/', ';'])
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 2 {
        return Err(MimeError::InvalidMimeTypeFormat(mime_type.to_string()));
    }

    for part in &parts[2..] {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("q=") {
            let q: f64 = value
                .trim()
                .parse()
                .map_err(|_| MimeError::InvalidQuality(part.to_string()))?;
            if !q.is_finite() {
                return Err(MimeError::InvalidQuality(part.to_string()));
            }
            return Ok(q.min(1.0));
        }
    }

    if parts[0].contains('*') {
        Ok(WILDCARD_MEDIA_QUALITY)
    } else if parts[1].contains('*') {
        Ok(WILDCARD_SUB_QUALITY)
    } else {
        Ok(1.0)
    }
}

/// One acceptable concrete type and the quality it was wanted with
#[derive(Debug, Clone)]
struct Candidate {
    mime_type: MimeType,
    quality: f64,
}

/// Drop an optional `Accept:` header name and all whitespace
fn normalize_wanted(wanted: &str) -> String {
    let wanted = match wanted.find(':') {
        Some(i) if i > 0 => &wanted[i + 1..],
        _ => wanted,
    };
    let wanted: String = wanted.chars().filter(|c| !c.is_whitespace()).collect();
    if wanted.is_empty() {
        "*/*".to_string()
    } else {
        wanted
    }
}

/// Expand each wanted entry against the provided list, grouped by media type
fn candidates_by_media(
    wanted: &str,
    provided: &[MimeType],
) -> Result<IndexMap<String, Vec<Candidate>>, MimeError> {
    let mut map: IndexMap<String, Vec<Candidate>> = IndexMap::new();

    for entry in wanted.split(',').filter(|e| !e.is_empty()) {
        let wanted_type: MimeType = entry.parse()?;
        let q = quality(entry)?;

        if wanted_type.media_type().contains('*') {
            for offered in provided {
                map.entry(offered.media_type().to_string())
                    .or_default()
                    .push(Candidate {
                        mime_type: offered.clone(),
                        quality: q,
                    });
            }
        } else if wanted_type.sub_type().contains('*') {
            for offered in provided
                .iter()
                .filter(|o| o.media_type() == wanted_type.media_type())
            {
                map.entry(wanted_type.media_type().to_string())
                    .or_default()
                    .push(Candidate {
                        mime_type: offered.clone(),
                        quality: q,
                    });
            }
        } else if provided.contains(&wanted_type) {
            map.entry(wanted_type.media_type().to_string())
                .or_default()
                .push(Candidate {
                    mime_type: wanted_type,
                    quality: q,
                });
        }
    }
    Ok(map)
}

/// Pick the best type to send given what the client wants and what can be provided.
///
/// A single provided type is always returned as is. When nothing wanted is
/// provided, the first provided type is returned.
///
/// # Errors
///
/// Returns `MimeError::NothingProvided` for an empty provided list,
/// `MimeError::InvalidMimeTypeFormat` for malformed entries, and
/// `MimeError::InvalidQuality` for unparseable `q=` values.
pub fn negotiate(wanted: &str, provided: &str) -> Result<MimeType, MimeError> {
    let provided: Vec<MimeType> = provided
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()?;

    let Some(first) = provided.first() else {
        return Err(MimeError::NothingProvided);
    };
    if provided.len() == 1 {
        return Ok(first.clone());
    }

    let wanted = normalize_wanted(wanted);
    let map = candidates_by_media(&wanted, &provided)?;

    let mut best: Option<&Candidate> = None;
    let mut best_quality = 0.0;
    for candidate in map.values().flatten() {
        if candidate.quality > best_quality {
            best_quality = candidate.quality;
            best = Some(candidate);
        }
    }

    let selected = best.map_or_else(|| first.clone(), |c| c.mime_type.clone());
    debug!(wanted = %wanted, selected = %selected, quality = best_quality, "Negotiated type");
    Ok(selected)
}

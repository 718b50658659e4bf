//! Core value types shared by every detector.
//!
//! - [`MimeType`]: a media/sub pair with a specificity counter used for ranking
//! - [`TextMimeType`]: a MIME type carrying a character encoding
//! - [`MimeTypeSet`]: the specificity-aware result container merged across detectors
//! - [`KnownTypes`]: the registry of every type seen so far

pub mod known;
pub mod result_set;
pub mod text;
pub mod types;

pub use known::KnownTypes;
pub use result_set::{DetectedType, MimeTypeSet};
pub use text::TextMimeType;
pub use types::{MimeError, MimeType};

//! # mime-sleuth
//!
//! A library for identifying the MIME type of files, byte buffers and streams.
//!
//! File names are easy to get wrong and easy to fake. `mime-sleuth` looks at the
//! content itself, using Unix `magic`-style byte-pattern rules, and combines
//! that with name-based lookups and text encoding sniffing. Every detector
//! proposes candidate types; the candidates are merged so that a type proposed
//! by several detectors, or matched by a deeper nested rule, ranks highest.
//!
//! ## Features
//!
//! - **Magic rules**: nested byte-pattern rules with per-rule specificity
//! - **Name tables**: multi-part extensions (`tar.gz`) and shared-mime-info style globs
//! - **Text sniffing**: byte order marks, ASCII/UTF-8/Latin-1 detection
//! - **Handlers**: post-processors that refine results, e.g. XML that is really SVG
//! - **Content negotiation**: HTTP `Accept` style selection with quality values
//!
//! ## Example
//!
//! ```rust,no_run
//! use mime_sleuth::{negotiate, MimeSleuth};
//!
//! let sleuth = MimeSleuth::new().unwrap();
//!
//! let result = sleuth.classify_bytes(b"\x89PNG\r\n\x1a\n");
//! assert!(result.contains_str("image/png"));
//!
//! let selected = negotiate("text/*;q=0.5, application/json", "text/html,application/json").unwrap();
//! assert_eq!(selected, "application/json");
//! ```
//!
//! ## Modules
//!
//! - [`core`]: MIME types, the specificity-aware result set, known types
//! - [`parsing`]: Magic rule grammar compiler
//! - [`matching`]: Rule evaluation, text fallback and content negotiation
//! - [`catalog`]: Embedded and on-disk rule, extension and glob tables
//! - [`detector`]: The detector trait and its implementations
//! - [`registry`]: Detector registry, handler chain and the [`MimeSleuth`] facade
//! - [`cli`]: Command-line interface implementation
//! - [`web`]: HTTP API

pub mod catalog;
pub mod cli;
pub mod core;
pub mod detector;
pub mod matching;
pub mod parsing;
pub mod registry;
pub mod utils;
pub mod web;

// Re-export commonly used types for convenience
pub use core::result_set::{DetectedType, MimeTypeSet};
pub use core::text::TextMimeType;
pub use core::types::{first_type, media_type, sub_type, MimeError, MimeType};
pub use detector::{Detector, DetectorError};
pub use matching::negotiation::{negotiate, quality};
pub use registry::{MimeSleuth, SleuthConfig};

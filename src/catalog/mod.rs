//! Embedded and on-disk data used by the detectors.
//!
//! Three tables are compiled into the binary from `catalogs/`:
//!
//! - `magic.mime`: byte-pattern rules for the magic detector
//! - `extensions.json`: file extension to MIME type mapping
//! - `globs.json`: file name glob to MIME type mapping
//!
//! Each can be extended at run time from files, and the magic rules can also be
//! supplemented from the system locations used by `file(1)`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mime_sleuth::catalog::store::MagicCatalog;
//! use std::path::Path;
//!
//! let mut catalog = MagicCatalog::load_embedded();
//! catalog.load_file(Path::new("/etc/magic.mime")).unwrap();
//! println!("{} rules", catalog.rules().len());
//! ```

pub mod extensions;
pub mod globs;
pub mod store;

use thiserror::Error;

use crate::core::types::MimeError;
use crate::parsing::magic::MagicParseError;

/// Version string carried by the JSON tables
pub const CATALOG_VERSION: &str = "1.0.0";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid magic rules: {0}")]
    Magic(#[from] MagicParseError),

    #[error("Invalid MIME type in catalog: {0}")]
    Mime(#[from] MimeError),

    #[error("Invalid glob pattern '{0}'")]
    Pattern(String),
}

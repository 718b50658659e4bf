//! Detector registry, handler chain and the [`MimeSleuth`] facade.
//!
//! A classification runs every registered detector in name order. Detectors
//! that do not support the input kind are skipped, failures are logged and
//! contribute nothing, and each non-empty result is merged into one
//! [`MimeTypeSet`](crate::core::MimeTypeSet) before the handler chain gets a
//! look at it. An empty result is replaced by the configured unknown type, so a
//! classification never comes back empty.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mime_sleuth::registry::MimeSleuth;
//!
//! let sleuth = MimeSleuth::global();
//! let result = sleuth.classify_bytes(b"%PDF-1.7\n");
//! println!("{}", result.most_specific().unwrap());
//! ```

pub mod config;
pub mod detectors;
pub mod handler;
pub mod sleuth;

pub use config::{ConfigError, SleuthConfig};
pub use detectors::DetectorRegistry;
pub use handler::{HandlerAction, HandlerChain, MimeHandler, SvgHandler, XmlHandler};
pub use sleuth::MimeSleuth;

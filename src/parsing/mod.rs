//! Parsers for magic rule sources.
//!
//! Rule text follows the classic `magic.mime` layout:
//!
//! ```text
//! # PNG: two-byte prefix, refined by the full signature
//! 0       beshort     0x8950          image/png
//! >2      string      NG\r\n\x1a\n    image/png
//! ```
//!
//! - [`entry`]: one line (offset, type, mask, test, message)
//! - [`magic`]: grouping of lines into a rule forest

pub mod entry;
pub mod magic;

pub use magic::{compile, MagicParseError, MagicRuleSet};

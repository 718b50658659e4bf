//! Rule evaluation, plain-text fallback, and content negotiation.
//!
//! - [`MagicMatcher`]: evaluates a compiled rule forest against a [`ByteSource`]
//! - [`text::plain_text_fallback`]: classifies samples as empty, text, or inconclusive
//! - [`negotiation::negotiate`]: picks the best provided type for an Accept list
//!
//! ## Specificity
//!
//! A matching top-level rule scores 1. Each nested rule along the deepest
//! matching chain adds 1, and the deepest rule that announces a type decides
//! the reported type:
//!
//! ```text
//! 0   beshort  0x8950          image/png   <- "\x89P" alone scores 1
//! >2  string   NG\r\n\x1a\n    image/png   <- full signature scores 2
//! ```

pub mod engine;
pub mod negotiation;
pub mod source;
pub mod text;

pub use engine::{MagicMatch, MagicMatcher};
pub use source::{ByteSource, SeekSource, SliceSource};

//! Post-processing handlers applied to merged detector results.
//!
//! After each detector's result is merged, every handler that has not fired yet
//! looks for the first entry whose type it is interested in. A handler fires at
//! most once per classification. It may rewrite the entry's type or encoding and
//! may stop the chain, in which case no further handlers run for that
//! classification.

use tracing::debug;

use crate::core::result_set::MimeTypeSet;
use crate::core::text::TextMimeType;
use crate::core::types::{MimeError, MimeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerAction {
    Continue,
    Stop,
}

pub trait MimeHandler: Send + Sync {
    /// Short id used in configuration and listings
    fn name(&self) -> &str;

    /// Types this handler wants to see
    fn interests(&self) -> &[MimeType];

    /// Inspect the content sample and optionally rewrite `text` in place
    fn handle(&self, content: &[u8], text: &mut TextMimeType) -> HandlerAction;
}

fn parse_all(types: &[&str]) -> Result<Vec<MimeType>, MimeError> {
    types.iter().map(|t| t.parse()).collect()
}

/// Rewrites XML or text content that contains an `<svg` element to `image/svg+xml`
pub struct SvgHandler {
    interests: Vec<MimeType>,
    svg: MimeType,
}

impl SvgHandler {
    /// # Errors
    ///
    /// Never fails for the built-in type strings.
    pub fn new() -> Result<Self, MimeError> {
        Ok(Self {
            interests: parse_all(&["text/xml", "application/xml", "text/plain"])?,
            svg: "image/svg+xml".parse()?,
        })
    }
}

impl MimeHandler for SvgHandler {
    fn name(&self) -> &str {
        "svg"
    }

    fn interests(&self) -> &[MimeType] {
        &self.interests
    }

    fn handle(&self, content: &[u8], text: &mut TextMimeType) -> HandlerAction {
        if contains(content, b"<svg") {
            text.set_mime_type(self.svg.clone());
            HandlerAction::Stop
        } else {
            HandlerAction::Continue
        }
    }
}

/// Rewrites plain text starting with an XML declaration to `text/xml`,
/// taking the encoding from the declaration
pub struct XmlHandler {
    interests: Vec<MimeType>,
    xml: MimeType,
}

impl XmlHandler {
    /// # Errors
    ///
    /// Never fails for the built-in type strings.
    pub fn new() -> Result<Self, MimeError> {
        Ok(Self {
            interests: parse_all(&["text/plain"])?,
            xml: "text/xml".parse()?,
        })
    }
}

impl MimeHandler for XmlHandler {
    fn name(&self) -> &str {
        "xml"
    }

    fn interests(&self) -> &[MimeType] {
        &self.interests
    }

    fn handle(&self, content: &[u8], text: &mut TextMimeType) -> HandlerAction {
        let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
        let start = content
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(content.len());
        let content = &content[start..];
        if !content.starts_with(b"<?xml") {
            return HandlerAction::Continue;
        }
        text.set_mime_type(self.xml.clone());
        if let Some(encoding) = declared_encoding(content) {
            if let Err(e) = text.set_encoding(&encoding) {
                debug!(error = %e, "Ignoring XML declaration encoding");
            }
        }
        HandlerAction::Continue
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// `encoding="..."` from an XML declaration
fn declared_encoding(content: &[u8]) -> Option<String> {
    let end = content.windows(2).position(|w| w == b"?>")?;
    let declaration = std::str::from_utf8(&content[..end]).ok()?;
    let rest = &declaration[declaration.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    let close = value.find(quote)?;
    Some(value[..close].to_string())
}

/// Handler ids accepted in configuration, in default order
pub const BUILTIN_HANDLERS: [&str; 2] = ["svg", "xml"];

/// Create a built-in handler by id
///
/// # Errors
///
/// Returns `MimeError` if a built-in type string fails to parse.
pub fn builtin_handler(id: &str) -> Result<Option<Box<dyn MimeHandler>>, MimeError> {
    Ok(match id {
        "svg" => Some(Box::new(SvgHandler::new()?)),
        "xml" => Some(Box::new(XmlHandler::new()?)),
        _ => None,
    })
}

/// Which handlers have fired during one classification
#[derive(Debug, Clone, Default)]
pub struct HandlerPass {
    fired: Vec<bool>,
    stopped: bool,
}

impl HandlerPass {
    pub fn stopped(&self) -> bool {
        self.stopped
    }
}

/// Ordered list of handlers
#[derive(Default)]
pub struct HandlerChain {
    handlers: Vec<Box<dyn MimeHandler>>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handler: Box<dyn MimeHandler>) {
        self.handlers.push(handler);
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// State for a fresh classification
    pub fn start(&self) -> HandlerPass {
        HandlerPass {
            fired: vec![false; self.handlers.len()],
            stopped: false,
        }
    }

    /// Give every handler that has not fired a chance at the current result
    pub fn apply(&self, pass: &mut HandlerPass, result: &mut MimeTypeSet, content: &[u8]) {
        for (index, handler) in self.handlers.iter().enumerate() {
            if pass.stopped {
                return;
            }
            if pass.fired.get(index).copied().unwrap_or(true) {
                continue;
            }
            let Some(target) = result
                .detected()
                .find(|d| handler.interests().contains(&d.mime_type))
                .cloned()
            else {
                continue;
            };

            pass.fired[index] = true;
            let original = target.to_text();
            let mut text = original.clone();
            let action = handler.handle(content, &mut text);
            if text != original {
                debug!(
                    handler = handler.name(),
                    from = %original,
                    to = %text,
                    "Handler rewrote type"
                );
                result.replace_text(&target.mime_type, text);
            }
            if action == HandlerAction::Stop {
                pass.stopped = true;
            }
        }
    }
}

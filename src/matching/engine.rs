use std::io;

use regex::bytes::Regex;
use tracing::debug;

use crate::core::types::MimeType;
use crate::matching::source::ByteSource;
use crate::parsing::entry::{
    truncate, Endian, MagicEntry, NumericType, Offset, OffsetBase, Operand, Operator, ValueType,
    REGEX_WINDOW,
};
use crate::parsing::magic::{MagicRuleSet, RuleId};

/// A matching top-level rule
#[derive(Debug, Clone)]
pub struct MagicMatch {
    /// Resolved type; its specificity is 1 plus the depth of the deepest matching chain
    pub mime_type: MimeType,
    /// Root of the rule that matched
    pub rule: RuleId,
}

/// Outcome of evaluating one node and its descendants
struct ChainMatch {
    specificity: u32,
    mime_type: Option<MimeType>,
}

/// Evaluates a compiled rule forest against byte sources
pub struct MagicMatcher<'a> {
    rules: &'a MagicRuleSet,
}

impl<'a> MagicMatcher<'a> {
    pub fn new(rules: &'a MagicRuleSet) -> Self {
        Self { rules }
    }

    /// Evaluate every top-level rule. All matches are returned in rule order.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails to read.
    pub fn find_matches(&self, source: &mut dyn ByteSource) -> io::Result<Vec<MagicMatch>> {
        let mut matches = Vec::new();
        for &root in self.rules.roots() {
            let Some(chain) = self.evaluate(root, 0, source)? else {
                continue;
            };
            match chain.mime_type {
                Some(mime_type) => matches.push(MagicMatch {
                    mime_type: mime_type.with_specificity(chain.specificity),
                    rule: root,
                }),
                None => debug!(
                    line = self.rules.node(root).line,
                    "Matching rule announces no type"
                ),
            }
        }
        Ok(matches)
    }

    /// Highest-specificity match; the earliest rule wins ties
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails to read.
    pub fn best_match(&self, source: &mut dyn ByteSource) -> io::Result<Option<MagicMatch>> {
        let mut best: Option<MagicMatch> = None;
        for candidate in self.find_matches(source)? {
            if best
                .as_ref()
                .map_or(true, |b| candidate.mime_type.specificity() > b.mime_type.specificity())
            {
                best = Some(candidate);
            }
        }
        Ok(best)
    }

    fn evaluate(
        &self,
        id: RuleId,
        parent_end: u64,
        source: &mut dyn ByteSource,
    ) -> io::Result<Option<ChainMatch>> {
        let node = self.rules.node(id);
        let Some(end) = test_entry(&node.entry, parent_end, source)? else {
            return Ok(None);
        };

        let mut deepest: Option<ChainMatch> = None;
        for &child in &node.children {
            if let Some(chain) = self.evaluate(child, end, source)? {
                if deepest
                    .as_ref()
                    .map_or(true, |d| chain.specificity > d.specificity)
                {
                    deepest = Some(chain);
                }
            }
        }

        Ok(Some(match deepest {
            Some(chain) => ChainMatch {
                specificity: chain.specificity + 1,
                mime_type: chain.mime_type.or_else(|| node.mime_type().cloned()),
            },
            None => ChainMatch {
                specificity: 1,
                mime_type: node.mime_type().cloned(),
            },
        }))
    }
}

fn resolve_base(base: OffsetBase, parent_end: u64) -> Option<u64> {
    match base {
        OffsetBase::Absolute(offset) => Some(offset),
        OffsetBase::Relative(delta) => parent_end.checked_add_signed(delta),
    }
}

/// Resolve an offset to an absolute position, `None` if it falls outside the content
fn resolve_offset(
    offset: Offset,
    parent_end: u64,
    source: &mut dyn ByteSource,
) -> io::Result<Option<u64>> {
    match offset {
        Offset::Direct(base) => Ok(resolve_base(base, parent_end)),
        Offset::Indirect {
            base,
            width,
            endian,
            adjust,
        } => {
            let Some(at) = resolve_base(base, parent_end) else {
                return Ok(None);
            };
            let Some(pointer) = read_uint(source, at, width, endian)? else {
                return Ok(None);
            };
            Ok(pointer.checked_add_signed(adjust))
        }
    }
}

fn read_uint(
    source: &mut dyn ByteSource,
    offset: u64,
    width: usize,
    endian: Endian,
) -> io::Result<Option<u64>> {
    let mut buf = [0u8; 8];
    let buf = &mut buf[..width];
    if source.read_at(offset, buf)? < width {
        return Ok(None);
    }
    let big = match endian {
        Endian::Big => true,
        Endian::Little => false,
        Endian::Native => cfg!(target_endian = "big"),
    };
    let value = if big {
        buf.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
    } else {
        buf.iter().rev().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
    };
    Ok(Some(value))
}

/// Run one entry's test. Returns the end offset of the matched value.
fn test_entry(
    entry: &MagicEntry,
    parent_end: u64,
    source: &mut dyn ByteSource,
) -> io::Result<Option<u64>> {
    let Some(offset) = resolve_offset(entry.offset, parent_end, source)? else {
        return Ok(None);
    };
    match &entry.value_type {
        ValueType::Numeric(numeric) => test_numeric(entry, numeric, offset, source),
        ValueType::String => {
            let expected = match &entry.operand {
                Operand::Bytes(bytes) => bytes.as_slice(),
                _ => &[],
            };
            test_string(entry.operator, expected, offset, source)
        }
        ValueType::PString => {
            let Some(len) = read_uint(source, offset, 1, Endian::Big)? else {
                return Ok(None);
            };
            let data = source.read_vec(offset + 1, usize::try_from(len).unwrap_or(0))?;
            let end = offset + 1 + data.len() as u64;
            let matched = match &entry.operand {
                Operand::Bytes(expected) => compare_bytes(entry.operator, &data, expected),
                _ => entry.operator == Operator::Any,
            };
            Ok(matched.then_some(end))
        }
        ValueType::Regex => match &entry.operand {
            Operand::Pattern(regex) => test_regex(entry.operator, regex, offset, source),
            _ => Ok(None),
        },
    }
}

fn test_numeric(
    entry: &MagicEntry,
    numeric: &NumericType,
    offset: u64,
    source: &mut dyn ByteSource,
) -> io::Result<Option<u64>> {
    let Some(raw) = read_uint(source, offset, numeric.width, numeric.endian)? else {
        return Ok(None);
    };
    let end = offset + numeric.width as u64;
    let value = numeric.mask.map_or(raw, |mask| raw & mask);
    let expected = match entry.operand {
        Operand::Number(n) => n,
        _ => 0,
    };
    let matched = match entry.operator {
        Operator::Any => true,
        Operator::Equal => value == expected,
        Operator::NotEqual => value != expected,
        Operator::AllBits => value & expected == expected,
        Operator::Greater => widen(value, numeric) > widen(expected, numeric),
        Operator::Less => widen(value, numeric) < widen(expected, numeric),
    };
    Ok(matched.then_some(end))
}

/// Sign-extend a width-truncated value unless the type is unsigned
fn widen(value: u64, numeric: &NumericType) -> i128 {
    let value = truncate(i128::from(value), numeric.width);
    if !numeric.signed {
        return i128::from(value);
    }
    let bits = numeric.width * 8;
    let sign = 1u64 << (bits - 1);
    if value & sign == 0 {
        i128::from(value)
    } else {
        i128::from(value) - (1i128 << bits)
    }
}

fn test_string(
    operator: Operator,
    expected: &[u8],
    offset: u64,
    source: &mut dyn ByteSource,
) -> io::Result<Option<u64>> {
    if operator == Operator::Any {
        return Ok(Some(offset));
    }
    let data = source.read_vec(offset, expected.len())?;
    let end = offset + data.len() as u64;
    Ok(compare_bytes(operator, &data, expected).then_some(end))
}

/// Literal byte comparison of `data` (read at most `expected.len()` long)
fn compare_bytes(operator: Operator, data: &[u8], expected: &[u8]) -> bool {
    match operator {
        Operator::Any => true,
        Operator::Equal => data == expected,
        Operator::NotEqual => data != expected,
        Operator::Greater => data > expected,
        Operator::Less => data.len() == expected.len() && data < expected,
        Operator::AllBits => false,
    }
}

fn test_regex(
    operator: Operator,
    regex: &Regex,
    offset: u64,
    source: &mut dyn ByteSource,
) -> io::Result<Option<u64>> {
    let window = source.read_vec(offset, REGEX_WINDOW)?;
    let found = regex.find(&window);
    Ok(match (operator, found) {
        (Operator::Equal, Some(m)) => Some(offset + m.end() as u64),
        (Operator::NotEqual, None) => Some(offset),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::source::SliceSource;

    fn matches_for(rules: &str, data: &[u8]) -> Vec<MagicMatch> {
        let rules = MagicRuleSet::parse("test", rules);
        MagicMatcher::new(&rules)
            .find_matches(&mut SliceSource::new(data))
            .unwrap()
    }

    const PNG_RULES: &str = "0 beshort 0x8950 image/png\n>2 string NG\\r\\n\\x1a\\n image/png\n";

    #[test]
    fn test_png_prefix_and_full_signature() {
        let prefix = matches_for(PNG_RULES, b"\x89\x50");
        assert_eq!(prefix.len(), 1);
        assert_eq!(prefix[0].mime_type, "image/png");
        assert_eq!(prefix[0].mime_type.specificity(), 1);

        let full = matches_for(PNG_RULES, b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR");
        assert_eq!(full[0].mime_type.specificity(), 2);
    }

    #[test]
    fn test_no_match_on_short_data() {
        assert!(matches_for(PNG_RULES, b"\x89").is_empty());
        assert!(matches_for(PNG_RULES, b"").is_empty());
    }

    #[test]
    fn test_child_type_overrides_parent() {
        let rules = "0 string PK\\003\\004 application/zip\n\
                     >30 string mimetype application/vnd.oasis.opendocument\n";
        let mut data = b"PK\x03\x04".to_vec();
        data.resize(30, 0);
        data.extend_from_slice(b"mimetype");
        let found = matches_for(rules, &data);
        assert_eq!(found[0].mime_type, "application/vnd.oasis.opendocument");
        assert_eq!(found[0].mime_type.specificity(), 2);

        let found = matches_for(rules, b"PK\x03\x04");
        assert_eq!(found[0].mime_type, "application/zip");
        assert_eq!(found[0].mime_type.specificity(), 1);
    }

    #[test]
    fn test_empty_child_message_inherits_parent() {
        let rules = "0 string GIF8 image/gif\n>4 string 9a\n";
        let found = matches_for(rules, b"GIF89a");
        assert_eq!(found[0].mime_type, "image/gif");
        assert_eq!(found[0].mime_type.specificity(), 2);
    }

    #[test]
    fn test_deepest_chain_wins_and_first_on_tie() {
        let rules = "0 byte 1 a/root\n\
                     >1 byte 2 a/shallow\n\
                     >1 byte 2 a/deep\n\
                     >>2 byte 3\n\
                     >1 byte 2 a/other\n";
        let found = matches_for(rules, &[1, 2, 3]);
        assert_eq!(found[0].mime_type, "a/deep");
        assert_eq!(found[0].mime_type.specificity(), 3);

        let found = matches_for(rules, &[1, 2, 9]);
        assert_eq!(found[0].mime_type, "a/shallow");
        assert_eq!(found[0].mime_type.specificity(), 2);
    }

    #[test]
    fn test_all_matching_roots_reported() {
        let rules = "0 string AB a/one\n0 byte 0x41 a/two\n0 string XY a/three\n";
        let found = matches_for(rules, b"ABC");
        let types: Vec<String> = found.iter().map(|m| m.mime_type.to_string()).collect();
        assert_eq!(types, vec!["a/one", "a/two"]);
    }

    #[test]
    fn test_best_match_prefers_first_on_tie() {
        let rules = MagicRuleSet::parse("test", "0 string AB a/one\n0 byte 0x41 a/two\n");
        let best = MagicMatcher::new(&rules)
            .best_match(&mut SliceSource::new(b"AB"))
            .unwrap()
            .unwrap();
        assert_eq!(best.mime_type, "a/one");
    }

    #[test]
    fn test_endianness() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(matches_for("0 belong 0x01020304 a/be", &data).len(), 1);
        assert_eq!(matches_for("0 lelong 0x04030201 a/le", &data).len(), 1);
        assert_eq!(matches_for("0 leshort 0x0102 a/le", &data).len(), 0);
        let native = if cfg!(target_endian = "big") {
            "0 short 0x0102 a/native"
        } else {
            "0 short 0x0201 a/native"
        };
        assert_eq!(matches_for(native, &data).len(), 1);
    }

    #[test]
    fn test_mask_and_operators() {
        let data = [0xF5u8];
        assert_eq!(matches_for("0 byte&0x0f 5 a/b", &data).len(), 1);
        assert_eq!(matches_for("0 byte !5 a/b", &data).len(), 1);
        assert_eq!(matches_for("0 byte &0xf0 a/b", &data).len(), 1);
        assert_eq!(matches_for("0 byte &0x0a a/b", &data).len(), 0);
        assert_eq!(matches_for("0 byte x a/b", &data).len(), 1);
    }

    #[test]
    fn test_signed_and_unsigned_ordering() {
        let data = [0xFFu8];
        // -1 signed, 255 unsigned
        assert_eq!(matches_for("0 byte <0 a/b", &data).len(), 1);
        assert_eq!(matches_for("0 ubyte >0x7f a/b", &data).len(), 1);
        assert_eq!(matches_for("0 ubyte <0 a/b", &data).len(), 0);
    }

    #[test]
    fn test_relative_offsets() {
        let rules = "0 string AB a/b\n>&1 byte 0x44 a/c\n";
        let found = matches_for(rules, b"ABCD");
        assert_eq!(found[0].mime_type, "a/c");
    }

    #[test]
    fn test_indirect_offsets() {
        // One-byte pointer at offset 3 to the marker
        let rules = "0 string PTR a/ptr\n>(3.b) string HIT a/hit\n>(3.b+3) byte 0x21\n";
        let data = b"PTR\x06xxHIT!";
        let found = matches_for(rules, data);
        assert_eq!(found[0].mime_type, "a/hit");

        let data = b"PTR\xF0";
        let found = matches_for(rules, data);
        assert_eq!(found[0].mime_type, "a/ptr");
        assert_eq!(found[0].mime_type.specificity(), 1);
    }

    #[test]
    fn test_indirect_overflow_never_matches() {
        let rules = "0 (0.Q+1) byte x a/b\n0 (0.Q-9) byte x a/c\n";
        let data = [0xFFu8; 9];
        assert!(matches_for(rules, &data).is_empty());
        let rules = "0 (0.b-9) byte x a/c\n";
        assert!(matches_for(rules, &[4u8; 9]).is_empty());
    }

    #[test]
    fn test_string_operators() {
        assert_eq!(matches_for("0 string !abc a/b", b"abd").len(), 1);
        assert_eq!(matches_for("0 string >a a/b", b"b").len(), 1);
        assert_eq!(matches_for("0 string <b a/b", b"a").len(), 1);
        assert_eq!(matches_for("0 string <b a/b", b"").len(), 0);
    }

    #[test]
    fn test_pstring() {
        let rules = "0 pstring JFIF a/pascal\n>&0 byte 0x2e a/dotted\n";
        let found = matches_for(rules, b"\x04JFIF.");
        assert_eq!(found[0].mime_type, "a/dotted");
        assert!(matches_for(rules, b"\x03JFI").is_empty());
    }

    #[test]
    fn test_regex_window() {
        let rules = "0 regex ^#!.*python text/x-python\n";
        assert_eq!(matches_for(rules, b"#!/usr/bin/env python3\n").len(), 1);
        assert!(matches_for(rules, b"#!/bin/sh\n").is_empty());
        let rules = "0 regex !<html a/not-html\n";
        assert_eq!(matches_for(rules, b"plain").len(), 1);
    }

    #[test]
    fn test_root_without_type_reports_nothing() {
        assert!(matches_for("0 string AB\n", b"AB").is_empty());
        let found = matches_for("0 string AB\n>2 byte 0x43 a/c\n", b"ABC");
        assert_eq!(found[0].mime_type, "a/c");
    }
}

//! Parsing of a single magic rule line.
//!
//! ```text
//! >>offset  type[&mask]  test  [mime/type [free text]]
//! ```

use regex::bytes::Regex;

use crate::core::types::MimeType;

/// Search window used by `regex` tests, measured from the resolved offset
pub const REGEX_WINDOW: usize = 4096;

/// Byte order of a numeric value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Native,
    Big,
    Little,
}

/// Where an offset is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetBase {
    Absolute(u64),
    /// Relative to the end of the parent's match
    Relative(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    Direct(OffsetBase),
    /// Read a `width`-byte value at `base` and add `adjust` to it
    Indirect {
        base: OffsetBase,
        width: usize,
        endian: Endian,
        adjust: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericType {
    pub width: usize,
    pub endian: Endian,
    pub signed: bool,
    pub mask: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Numeric(NumericType),
    String,
    /// One length byte followed by the string bytes
    PString,
    Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Greater,
    Less,
    /// Every bit of the operand is set
    AllBits,
    /// Matches any value that can be read
    Any,
}

#[derive(Debug, Clone)]
pub enum Operand {
    Number(u64),
    Bytes(Vec<u8>),
    Pattern(Regex),
    None,
}

/// One parsed rule line
#[derive(Debug, Clone)]
pub struct MagicEntry {
    pub depth: usize,
    pub offset: Offset,
    pub value_type: ValueType,
    pub operator: Operator,
    pub operand: Operand,
    /// Type announced by this line; `None` inherits the parent's
    pub mime_type: Option<MimeType>,
    /// Remaining message text after the type token
    pub description: Option<String>,
}

/// Parse one (non-blank, non-comment) line
///
/// # Errors
///
/// Returns a human-readable reason when the offset, type, or test field is invalid.
pub fn parse_entry(line: &str) -> Result<MagicEntry, String> {
    let depth = line.chars().take_while(|&c| c == '>').count();
    let rest = &line[depth..];

    let (offset_token, rest) = next_field(rest).ok_or("missing offset")?;
    let (type_token, rest) = next_field(rest).ok_or("missing type")?;
    let (test_token, rest) = next_escaped_field(rest).ok_or("missing test")?;

    let offset = parse_offset(offset_token)?;
    let value_type = parse_type(type_token)?;
    let (operator, operand) = parse_test(&value_type, test_token)?;

    let message = rest.trim();
    let (mime_type, description) = parse_message(message);

    Ok(MagicEntry {
        depth,
        offset,
        value_type,
        operator,
        operand,
        mime_type,
        description,
    })
}

/// Split off the next whitespace-delimited field
fn next_field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

/// Like [`next_field`], but a backslash escapes the following character
fn next_escaped_field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c.is_whitespace() {
            return Some((&s[..i], &s[i..]));
        }
    }
    Some((s, ""))
}

fn parse_message(message: &str) -> (Option<MimeType>, Option<String>) {
    if message.is_empty() {
        return (None, None);
    }
    let (first, rest) = match message.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (message, ""),
    };
    let description = (!rest.is_empty()).then(|| rest.to_string());
    match first.parse::<MimeType>() {
        Ok(mime_type) => (Some(mime_type), description),
        // Free text only; the type comes from the parent
        Err(_) => (None, Some(message.to_string())),
    }
}

/// Parse a number in decimal, `0x` hex or leading-`0` octal, with optional sign
pub fn parse_number(s: &str) -> Result<i128, String> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let value = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        u64::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse::<u64>()
    }
    .map_err(|_| format!("invalid number '{s}'"))?;
    let value = i128::from(value);
    Ok(if negative { -value } else { value })
}

fn parse_signed(s: &str) -> Result<i64, String> {
    i64::try_from(parse_number(s)?).map_err(|_| format!("number out of range '{s}'"))
}

fn parse_offset_base(s: &str) -> Result<OffsetBase, String> {
    if let Some(relative) = s.strip_prefix('&') {
        return Ok(OffsetBase::Relative(parse_signed(relative)?));
    }
    let value = parse_number(s)?;
    u64::try_from(value)
        .map(OffsetBase::Absolute)
        .map_err(|_| format!("negative absolute offset '{s}'"))
}

fn parse_offset(token: &str) -> Result<Offset, String> {
    let Some(inner) = token.strip_prefix('(') else {
        return parse_offset_base(token).map(Offset::Direct);
    };
    let inner = inner
        .strip_suffix(')')
        .ok_or_else(|| format!("unterminated indirect offset '{token}'"))?;

    // Adjustment: the last '+' or '-' that is not part of the base
    let search_from = usize::from(inner.starts_with('&')) + 1;
    let (spec, adjust) = match inner
        .get(search_from..)
        .and_then(|tail| tail.rfind(['+', '-']))
        .map(|i| i + search_from)
    {
        Some(i) => (&inner[..i], parse_signed(&inner[i..])?),
        None => (inner, 0),
    };

    let (base, width, endian) = match spec.rsplit_once(['.', ',']) {
        Some((base, kind)) => {
            let (width, endian) = match kind {
                "b" | "B" => (1, Endian::Native),
                "s" => (2, Endian::Little),
                "S" => (2, Endian::Big),
                "l" => (4, Endian::Little),
                "L" => (4, Endian::Big),
                "q" => (8, Endian::Little),
                "Q" => (8, Endian::Big),
                other => return Err(format!("unknown indirect type '{other}'")),
            };
            (base, width, endian)
        }
        None => (spec, 4, Endian::Native),
    };

    Ok(Offset::Indirect {
        base: parse_offset_base(base)?,
        width,
        endian,
        adjust,
    })
}

fn parse_type(token: &str) -> Result<ValueType, String> {
    let (name, mask) = match token.split_once('&') {
        Some((name, mask)) => (name, Some(mask)),
        None => (token, None),
    };

    let value_type = match name {
        "string" => ValueType::String,
        "pstring" => ValueType::PString,
        "regex" => ValueType::Regex,
        _ => ValueType::Numeric(parse_numeric_type(name)?),
    };

    match (value_type, mask) {
        (ValueType::Numeric(mut numeric), Some(mask)) => {
            let mask = parse_number(mask)?;
            numeric.mask = Some(truncate(mask, numeric.width));
            Ok(ValueType::Numeric(numeric))
        }
        (_, Some(_)) => Err(format!("mask not allowed on '{name}'")),
        (value_type, None) => Ok(value_type),
    }
}

fn parse_numeric_type(name: &str) -> Result<NumericType, String> {
    let (signed, rest) = match name.strip_prefix('u') {
        Some(rest) => (false, rest),
        None => (true, name),
    };
    let (endian, rest) = if let Some(rest) = rest.strip_prefix("be") {
        (Endian::Big, rest)
    } else if let Some(rest) = rest.strip_prefix("le") {
        (Endian::Little, rest)
    } else {
        (Endian::Native, rest)
    };
    let width = match rest {
        "byte" => 1,
        "short" => 2,
        "long" | "date" => 4,
        "quad" => 8,
        other => match other.strip_prefix("int").map(str::parse::<usize>) {
            Some(Ok(width @ (1 | 2 | 4 | 8))) => width,
            _ => return Err(format!("unknown type '{name}'")),
        },
    };
    Ok(NumericType {
        width,
        endian,
        signed,
        mask: None,
    })
}

/// Keep only the low `width` bytes of a value
pub fn truncate(value: i128, width: usize) -> u64 {
    // Two's complement reinterpretation is intended here
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let bits = value as u64;
    if width >= 8 {
        bits
    } else {
        bits & ((1u64 << (width * 8)) - 1)
    }
}

fn split_operator(test: &str) -> (Operator, &str) {
    let mut chars = test.chars();
    let operator = match chars.next() {
        Some('=') => Operator::Equal,
        Some('!') => Operator::NotEqual,
        Some('>') => Operator::Greater,
        Some('<') => Operator::Less,
        Some('&') => Operator::AllBits,
        _ => return (Operator::Equal, test),
    };
    (operator, chars.as_str())
}

fn parse_test(value_type: &ValueType, test: &str) -> Result<(Operator, Operand), String> {
    if test == "x" {
        return Ok((Operator::Any, Operand::None));
    }
    let (operator, value) = split_operator(test);
    match value_type {
        ValueType::Numeric(numeric) => {
            let number = parse_number(value)?;
            Ok((operator, Operand::Number(truncate(number, numeric.width))))
        }
        ValueType::String | ValueType::PString => {
            if operator == Operator::AllBits {
                return Err("'&' is not valid for string tests".to_string());
            }
            let bytes = unescape(value)?;
            if bytes.is_empty() && operator == Operator::Equal {
                return Err("empty string test".to_string());
            }
            Ok((operator, Operand::Bytes(bytes)))
        }
        ValueType::Regex => {
            if !matches!(operator, Operator::Equal | Operator::NotEqual) {
                return Err("regex tests only support '=' and '!'".to_string());
            }
            let pattern = String::from_utf8(unescape(value)?)
                .map_err(|_| "regex is not valid UTF-8".to_string())?;
            let regex = Regex::new(&pattern).map_err(|e| format!("invalid regex: {e}"))?;
            Ok((operator, Operand::Pattern(regex)))
        }
    }
}

/// Resolve backslash escapes into raw bytes
pub fn unescape(s: &str) -> Result<Vec<u8>, String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }
        let Some(&next) = bytes.get(i + 1) else {
            return Err("trailing backslash".to_string());
        };
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'x' => {
                let digits: Vec<u8> = bytes[i..]
                    .iter()
                    .take(2)
                    .take_while(|c| c.is_ascii_hexdigit())
                    .copied()
                    .collect();
                if digits.is_empty() {
                    return Err("\\x without hex digits".to_string());
                }
                i += digits.len();
                out.push(byte_from_digits(&digits, 16)?);
            }
            b'0'..=b'7' => {
                let mut digits = vec![next];
                digits.extend(
                    bytes[i..]
                        .iter()
                        .take(2)
                        .take_while(|c| (b'0'..=b'7').contains(*c)),
                );
                i += digits.len() - 1;
                out.push(byte_from_digits(&digits, 8)?);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn byte_from_digits(digits: &[u8], radix: u32) -> Result<u8, String> {
    let text = std::str::from_utf8(digits).map_err(|e| e.to_string())?;
    u32::from_str_radix(text, radix)
        .ok()
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| format!("escape out of range '{text}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_string_entry() {
        let entry = parse_entry("0\tstring\tGIF8\timage/gif").unwrap();
        assert_eq!(entry.depth, 0);
        assert_eq!(entry.offset, Offset::Direct(OffsetBase::Absolute(0)));
        assert_eq!(entry.value_type, ValueType::String);
        assert_eq!(entry.operator, Operator::Equal);
        assert!(matches!(entry.operand, Operand::Bytes(ref b) if b == b"GIF8"));
        assert_eq!(entry.mime_type.unwrap(), "image/gif");
    }

    #[test]
    fn test_parse_nested_numeric_entry() {
        let entry = parse_entry(">>&2 ubeshort&0xff00 >0x0100 application/x-thing v2").unwrap();
        assert_eq!(entry.depth, 2);
        assert_eq!(entry.offset, Offset::Direct(OffsetBase::Relative(2)));
        assert_eq!(
            entry.value_type,
            ValueType::Numeric(NumericType {
                width: 2,
                endian: Endian::Big,
                signed: false,
                mask: Some(0xff00),
            })
        );
        assert_eq!(entry.operator, Operator::Greater);
        assert!(matches!(entry.operand, Operand::Number(0x0100)));
        assert_eq!(entry.description.as_deref(), Some("v2"));
    }

    #[test]
    fn test_number_bases() {
        assert_eq!(parse_number("10").unwrap(), 10);
        assert_eq!(parse_number("0x1F").unwrap(), 31);
        assert_eq!(parse_number("010").unwrap(), 8);
        assert_eq!(parse_number("0").unwrap(), 0);
        assert_eq!(parse_number("-1").unwrap(), -1);
        assert!(parse_number("0x").is_err());
        assert!(parse_number("09").is_err());
        assert!(parse_number("ten").is_err());
    }

    #[test]
    fn test_negative_operand_wraps_to_width() {
        let entry = parse_entry("0 byte -1 a/b").unwrap();
        assert!(matches!(entry.operand, Operand::Number(0xff)));
    }

    #[test]
    fn test_indirect_offsets() {
        assert_eq!(
            parse_offset("(0x3c.l+4)").unwrap(),
            Offset::Indirect {
                base: OffsetBase::Absolute(0x3c),
                width: 4,
                endian: Endian::Little,
                adjust: 4,
            }
        );
        assert_eq!(
            parse_offset("(&2.S-1)").unwrap(),
            Offset::Indirect {
                base: OffsetBase::Relative(2),
                width: 2,
                endian: Endian::Big,
                adjust: -1,
            }
        );
        assert_eq!(
            parse_offset("(8)").unwrap(),
            Offset::Indirect {
                base: OffsetBase::Absolute(8),
                width: 4,
                endian: Endian::Native,
                adjust: 0,
            }
        );
        assert!(parse_offset("(8.z)").is_err());
        assert!(parse_offset("(8").is_err());
    }

    #[test]
    fn test_explicit_width_types() {
        assert!(matches!(
            parse_type("uleint8").unwrap(),
            ValueType::Numeric(NumericType { width: 8, endian: Endian::Little, signed: false, .. })
        ));
        assert!(matches!(
            parse_type("int2").unwrap(),
            ValueType::Numeric(NumericType { width: 2, endian: Endian::Native, signed: true, .. })
        ));
        assert!(parse_type("int3").is_err());
        assert!(parse_type("float").is_err());
        assert!(parse_type("string&0xff").is_err());
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(unescape(r"\x89PNG\r\n\032\n").unwrap(), b"\x89PNG\r\n\x1a\n");
        assert_eq!(unescape(r"a\ b\\c").unwrap(), b"a b\\c");
        assert_eq!(unescape(r"\0").unwrap(), vec![0]);
        assert!(unescape("abc\\").is_err());
        assert!(unescape(r"\777").is_err());
    }

    #[test]
    fn test_escaped_space_stays_in_test_field() {
        let entry = parse_entry(r"0 string %!PS-Adobe\ 3 application/postscript").unwrap();
        assert!(matches!(entry.operand, Operand::Bytes(ref b) if b == b"%!PS-Adobe 3"));
        assert_eq!(entry.mime_type.unwrap(), "application/postscript");
    }

    #[test]
    fn test_any_value_and_empty_message() {
        let entry = parse_entry(">4 byte x").unwrap();
        assert_eq!(entry.operator, Operator::Any);
        assert!(entry.mime_type.is_none());
    }

    #[test]
    fn test_free_text_message_has_no_type() {
        let entry = parse_entry(">4 byte 1 version one").unwrap();
        assert!(entry.mime_type.is_none());
        assert_eq!(entry.description.as_deref(), Some("version one"));
    }

    #[test]
    fn test_regex_entry() {
        let entry = parse_entry(r"0 regex ^#!.*python text/x-python").unwrap();
        assert_eq!(entry.value_type, ValueType::Regex);
        assert!(matches!(entry.operand, Operand::Pattern(_)));
        assert!(parse_entry("0 regex >abc a/b").is_err());
        assert!(parse_entry("0 regex ([ a/b").is_err());
    }

    #[test]
    fn test_malformed_lines() {
        assert!(parse_entry("zero string abc a/b").is_err());
        assert!(parse_entry("0 blob abc a/b").is_err());
        assert!(parse_entry("0 byte notanumber a/b").is_err());
        assert!(parse_entry("0 string").is_err());
        assert!(parse_entry("0").is_err());
        assert!(parse_entry("0 string &abc a/b").is_err());
    }
}

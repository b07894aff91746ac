//! Source-encoding detection and conversion.
//!
//! Every extractor works on UTF-8 internally. Input files are converted once,
//! up front, before tokenisation starts:
//!
//! - When the caller names an encoding (`--from-code`), that encoding is used
//!   unconditionally via `encoding_rs`.
//! - Otherwise the bytes are sniffed: valid UTF-8 is taken as-is; then
//!   UTF-32 is tried in both endian orders (BOM first, then validation);
//!   then UTF-16 (BOM first, then a newline-count heuristic). Anything else
//!   is rejected.
//!
//! Files at or above 4 GiB are rejected before any conversion work.

use anyhow::{Result, anyhow, bail};

/// Hard cap on input size, in bytes.
pub const MAX_INPUT_SIZE: u64 = 0xFFFF_FFFF;

/// How the bytes of a source file should be interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SourceEncoding {
    /// Sniff UTF-8 / UTF-16 / UTF-32.
    #[default]
    Auto,
    /// A caller-supplied encoding label, resolved through `encoding_rs`.
    Named(String),
}

impl SourceEncoding {
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("auto") {
            SourceEncoding::Auto
        } else {
            SourceEncoding::Named(label.to_string())
        }
    }
}

/// Convert raw file bytes to a UTF-8 string according to `encoding`.
pub fn decode_source(bytes: &[u8], encoding: &SourceEncoding) -> Result<String> {
    if bytes.len() as u64 >= MAX_INPUT_SIZE {
        bail!("input file exceeds the supported size of {} bytes", MAX_INPUT_SIZE);
    }

    match encoding {
        SourceEncoding::Named(label) => decode_named(bytes, label),
        SourceEncoding::Auto => sniff(bytes),
    }
}

fn decode_named(bytes: &[u8], label: &str) -> Result<String> {
    let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
        .ok_or_else(|| anyhow!("unknown source encoding \"{}\"", label))?;
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        bail!("input is not valid {}", encoding.name());
    }
    Ok(text.into_owned())
}

fn sniff(bytes: &[u8]) -> Result<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        // A UTF-8 BOM is tolerated and stripped.
        return Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string());
    }

    if let Some(text) = try_utf32(bytes) {
        return Ok(text);
    }
    if let Some(text) = try_utf16(bytes) {
        return Ok(text);
    }

    bail!("input is not valid UTF-8, UTF-16 or UTF-32; use --from-code to name the encoding")
}

fn try_utf32(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    // BOM decides the byte order outright.
    if bytes.starts_with(&[0x00, 0x00, 0xFE, 0xFF]) {
        return decode_utf32(&bytes[4..], true);
    }
    if bytes.starts_with(&[0xFF, 0xFE, 0x00, 0x00]) {
        return decode_utf32(&bytes[4..], false);
    }
    decode_utf32(bytes, true).or_else(|| decode_utf32(bytes, false))
}

fn decode_utf32(bytes: &[u8], big_endian: bool) -> Option<String> {
    let mut out = String::with_capacity(bytes.len() / 4);
    for unit in bytes.chunks_exact(4) {
        let value = if big_endian {
            u32::from_be_bytes([unit[0], unit[1], unit[2], unit[3]])
        } else {
            u32::from_le_bytes([unit[0], unit[1], unit[2], unit[3]])
        };
        out.push(char::from_u32(value)?);
    }
    Some(out)
}

fn try_utf16(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return decode_utf16(&bytes[2..], true);
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return decode_utf16(&bytes[2..], false);
    }

    // No BOM: count how often a newline appears as U+000A in each byte
    // order and pick the order that sees more of them.
    let mut newlines_be = 0usize;
    let mut newlines_le = 0usize;
    for unit in bytes.chunks_exact(2) {
        if unit == [0x00, 0x0A] {
            newlines_be += 1;
        }
        if unit == [0x0A, 0x00] {
            newlines_le += 1;
        }
    }
    if newlines_be == 0 && newlines_le == 0 {
        return None;
    }
    decode_utf16(bytes, newlines_be >= newlines_le)
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> Option<String> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|unit| {
            if big_endian {
                u16::from_be_bytes([unit[0], unit[1]])
            } else {
                u16::from_le_bytes([unit[0], unit[1]])
            }
        })
        .collect();
    String::from_utf16(&units).ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_plain_utf8() {
        let text = decode_source("café".as_bytes(), &SourceEncoding::Auto).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"hello");
        let text = decode_source(&bytes, &SourceEncoding::Auto).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_utf16_le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "hi\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let text = decode_source(&bytes, &SourceEncoding::Auto).unwrap();
        assert_eq!(text, "hi\n");
    }

    #[test]
    fn test_utf16_be_heuristic_without_bom() {
        let mut bytes = Vec::new();
        for unit in "a\nb\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let text = decode_source(&bytes, &SourceEncoding::Auto).unwrap();
        assert_eq!(text, "a\nb\n");
    }

    #[test]
    fn test_utf32_le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE, 0x00, 0x00];
        for c in "ok".chars() {
            bytes.extend_from_slice(&(c as u32).to_le_bytes());
        }
        let text = decode_source(&bytes, &SourceEncoding::Auto).unwrap();
        assert_eq!(text, "ok");
    }

    #[test]
    fn test_named_latin1() {
        let bytes = [b'c', b'a', b'f', 0xE9];
        let text = decode_source(&bytes, &SourceEncoding::Named("ISO-8859-1".into())).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn test_unknown_label_rejected() {
        let err = decode_source(b"x", &SourceEncoding::Named("no-such-charset".into()));
        assert!(err.is_err());
    }

    #[test]
    fn test_undetectable_rejected() {
        // Odd length, invalid UTF-8, no BOM: nothing can apply.
        let err = decode_source(&[0xFF, 0x80, 0x80], &SourceEncoding::Auto);
        assert!(err.is_err());
    }
}

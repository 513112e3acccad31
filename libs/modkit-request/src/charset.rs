//! Character set detection and text codecs.
//!
//! Response bodies are decoded with the charset announced in the
//! `Content-Type` header; request text bodies are encoded with the charset
//! configured on the request. Unknown or missing charsets fall back to UTF-8.

use std::fmt;

/// Supported character sets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Charset {
    /// 7-bit US-ASCII; bytes above `0x7F` decode to `?`
    UsAscii,
    /// Windows-1252, also used for `iso-8859-1` labels
    Windows1252,
    /// UTF-7 (RFC 2152)
    Utf7,
    /// UTF-8
    #[default]
    Utf8,
    /// UTF-16, little-endian unless a BOM says otherwise
    Utf16,
    /// UTF-32, little-endian
    Utf32,
}

impl Charset {
    /// Look up a charset by its label (case-insensitive)
    ///
    /// Returns `None` for labels that are not recognized.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().trim_matches('"').to_ascii_lowercase();
        match label.as_str() {
            "us-ascii" | "ascii" => Some(Self::UsAscii),
            "iso-8859-1" | "latin1" | "windows-1252" | "cp1252" => Some(Self::Windows1252),
            "utf-7" | "utf7" => Some(Self::Utf7),
            "utf-8" | "utf8" => Some(Self::Utf8),
            "utf-16" | "utf-16le" | "unicode" => Some(Self::Utf16),
            "utf-32" | "utf-32le" => Some(Self::Utf32),
            _ => None,
        }
    }

    /// Detect the charset of a `Content-Type` header value
    ///
    /// The value is split on `;`, each segment is trimmed and lower-cased and
    /// the first `charset=<label>` segment decides. Absent header, absent
    /// parameter, or an unknown label all resolve to UTF-8.
    #[must_use]
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return Self::Utf8;
        };
        content_type
            .split(';')
            .map(|segment| segment.trim().to_ascii_lowercase())
            .find_map(|segment| {
                segment
                    .strip_prefix("charset=")
                    .map(|label| Self::from_label(label).unwrap_or_default())
            })
            .unwrap_or_default()
    }

    /// Canonical label
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::UsAscii => "us-ascii",
            Self::Windows1252 => "windows-1252",
            Self::Utf7 => "utf-7",
            Self::Utf8 => "utf-8",
            Self::Utf16 => "utf-16",
            Self::Utf32 => "utf-32",
        }
    }

    /// Decode bytes into text, replacing malformed sequences
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::UsAscii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
                .collect(),
            Self::Windows1252 => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
            Self::Utf7 => utf7::decode(bytes),
            Self::Utf8 => encoding_rs::UTF_8.decode(bytes).0.into_owned(),
            Self::Utf16 => encoding_rs::UTF_16LE.decode(bytes).0.into_owned(),
            Self::Utf32 => decode_utf32_le(bytes),
        }
    }

    /// Encode text into bytes
    ///
    /// Characters that the charset cannot represent become `?` for ASCII and
    /// numeric character references for Windows-1252.
    #[must_use]
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::UsAscii => text
                .chars()
                .map(|c| u8::try_from(c).ok().filter(u8::is_ascii).unwrap_or(b'?'))
                .collect(),
            Self::Windows1252 => encoding_rs::WINDOWS_1252.encode(text).0.into_owned(),
            Self::Utf7 => utf7::encode(text),
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf16 => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Self::Utf32 => text
                .chars()
                .flat_map(|c| u32::from(c).to_le_bytes())
                .collect(),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn decode_utf32_le(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xFF, 0xFE, 0x00, 0x00]).unwrap_or(bytes);
    let chunks = bytes.chunks_exact(4);
    let trailing = !chunks.remainder().is_empty();
    let mut text: String = chunks
        .map(|chunk| {
            let code = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect();
    if trailing {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

mod utf7 {
    const ALPHABET: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    /// Set D, set O, and the whitespace characters RFC 2152 allows verbatim.
    fn is_direct(c: char) -> bool {
        c.is_ascii_alphanumeric()
            || matches!(c, ' ' | '\t' | '\r' | '\n')
            || "'(),-./:?!\"#$%&*;<=>@[]^_`{|}".contains(c)
    }

    fn sextet(b: u8) -> Option<u32> {
        let value = match b {
            b'A'..=b'Z' => b - b'A',
            b'a'..=b'z' => b - b'a' + 26,
            b'0'..=b'9' => b - b'0' + 52,
            b'+' => 62,
            b'/' => 63,
            _ => return None,
        };
        Some(u32::from(value))
    }

    fn flush_run(out: &mut Vec<u8>, units: &mut Vec<u16>) {
        if units.is_empty() {
            return;
        }
        out.push(b'+');
        let mut bits: u32 = 0;
        let mut nbits: u32 = 0;
        for unit in units.drain(..) {
            bits = (bits << 16) | u32::from(unit);
            nbits += 16;
            while nbits >= 6 {
                nbits -= 6;
                out.push(ALPHABET[((bits >> nbits) & 0x3F) as usize]);
            }
            bits &= (1 << nbits) - 1;
        }
        if nbits > 0 {
            out.push(ALPHABET[((bits << (6 - nbits)) & 0x3F) as usize]);
        }
        out.push(b'-');
    }

    pub(super) fn encode(text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len());
        let mut units = Vec::new();
        for c in text.chars() {
            if c == '+' {
                flush_run(&mut out, &mut units);
                out.extend_from_slice(b"+-");
            } else if let Some(byte) = u8::try_from(c).ok().filter(|_| is_direct(c)) {
                flush_run(&mut out, &mut units);
                out.push(byte);
            } else {
                let mut buf = [0u16; 2];
                units.extend_from_slice(c.encode_utf16(&mut buf));
            }
        }
        flush_run(&mut out, &mut units);
        out
    }

    pub(super) fn decode(bytes: &[u8]) -> String {
        let mut out = String::with_capacity(bytes.len());
        let mut units: Vec<u16> = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            i += 1;
            if b != b'+' {
                out.push(if b.is_ascii() {
                    char::from(b)
                } else {
                    char::REPLACEMENT_CHARACTER
                });
                continue;
            }
            if bytes.get(i) == Some(&b'-') {
                out.push('+');
                i += 1;
                continue;
            }
            let mut bits: u32 = 0;
            let mut nbits: u32 = 0;
            while let Some(value) = bytes.get(i).copied().and_then(sextet) {
                bits = (bits << 6) | value;
                nbits += 6;
                if nbits >= 16 {
                    nbits -= 16;
                    units.push(u16::try_from((bits >> nbits) & 0xFFFF).unwrap_or(0xFFFD));
                    bits &= (1 << nbits) - 1;
                }
                i += 1;
            }
            if bytes.get(i) == Some(&b'-') {
                i += 1;
            }
            out.push_str(&String::from_utf16_lossy(&units));
            units.clear();
        }
        out
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_detects_latin1_charset() {
        let charset = Charset::from_content_type(Some("text/html; charset=iso-8859-1"));
        assert_eq!(charset, Charset::Windows1252);
        assert_eq!(charset.decode(&[0x63, 0x61, 0x66, 0xE9]), "caf\u{e9}");
    }

    #[test]
    fn test_missing_charset_is_utf8() {
        assert_eq!(
            Charset::from_content_type(Some("application/json")),
            Charset::Utf8
        );
        assert_eq!(Charset::from_content_type(None), Charset::Utf8);
    }

    #[test]
    fn test_unknown_charset_is_utf8() {
        assert_eq!(
            Charset::from_content_type(Some("text/plain; charset=koi8-r")),
            Charset::Utf8
        );
    }

    #[test]
    fn test_charset_detection_is_case_and_space_insensitive() {
        assert_eq!(
            Charset::from_content_type(Some("text/plain;   CHARSET=\"UTF-16\"")),
            Charset::Utf16
        );
        assert_eq!(
            Charset::from_content_type(Some("text/plain; format=flowed; charset=us-ascii")),
            Charset::UsAscii
        );
    }

    #[test]
    fn test_ascii_replaces_high_bytes() {
        assert_eq!(Charset::UsAscii.decode(b"ok\xFF"), "ok?");
        assert_eq!(Charset::UsAscii.encode("caf\u{e9}"), b"caf?".to_vec());
    }

    #[test]
    fn test_utf16_and_utf32_codecs() {
        let text = "A\u{20ac}";
        let utf16 = Charset::Utf16.encode(text);
        assert_eq!(utf16, vec![0x41, 0x00, 0xAC, 0x20]);
        assert_eq!(Charset::Utf16.decode(&utf16), text);

        let utf32 = Charset::Utf32.encode(text);
        assert_eq!(utf32, vec![0x41, 0, 0, 0, 0xAC, 0x20, 0, 0]);
        assert_eq!(Charset::Utf32.decode(&utf32), text);
    }

    #[test]
    fn test_utf7_rfc_example() {
        let text = "Hi Mom -\u{263a}-!";
        let encoded = Charset::Utf7.encode(text);
        assert_eq!(encoded, b"Hi Mom -+Jjo--!".to_vec());
        assert_eq!(Charset::Utf7.decode(&encoded), text);
    }

    #[test]
    fn test_utf7_plus_sign() {
        assert_eq!(Charset::Utf7.encode("1+1"), b"1+-1".to_vec());
        assert_eq!(Charset::Utf7.decode(b"1+-1"), "1+1");
    }

    #[test]
    fn test_utf8_strips_bom_and_replaces_invalid() {
        assert_eq!(Charset::Utf8.decode(b"\xEF\xBB\xBFhi"), "hi");
        assert_eq!(Charset::Utf8.decode(b"a\xFFb"), "a\u{fffd}b");
    }
}

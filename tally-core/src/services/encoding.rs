//! Encoding resolution - bytes to text, never failing

use encoding_rs::{UTF_8, WINDOWS_1252};

use crate::domain::TextEncoding;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Bytes with no assigned character in windows-1252
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// Decoded upload text and the encoding that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: TextEncoding,
}

/// Decode an upload.
///
/// Candidates are tried in order: UTF-8 with BOM, UTF-8, windows-1252, and
/// finally ISO-8859-1, which accepts any byte sequence. The first one that
/// decodes the whole input wins.
pub fn resolve_encoding(bytes: &[u8]) -> DecodedText {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(rest) {
            return DecodedText {
                text: text.into_owned(),
                encoding: TextEncoding::Utf8Bom,
            };
        }
    }

    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return DecodedText {
            text: text.into_owned(),
            encoding: TextEncoding::Utf8,
        };
    }

    // encoding_rs maps the undefined bytes to C1 controls, so reject them here
    if !bytes.iter().any(|b| CP1252_UNDEFINED.contains(b)) {
        if let Some(text) = WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes) {
            return DecodedText {
                text: text.into_owned(),
                encoding: TextEncoding::Windows1252,
            };
        }
    }

    // ISO-8859-1: every byte is the code point of the same value
    DecodedText {
        text: bytes.iter().map(|&b| char::from(b)).collect(),
        encoding: TextEncoding::Latin1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_with_bom_strips_bom() {
        let decoded = resolve_encoding(b"\xEF\xBB\xBFData;SKU");
        assert_eq!(decoded.encoding, TextEncoding::Utf8Bom);
        assert_eq!(decoded.text, "Data;SKU");
    }

    #[test]
    fn test_plain_utf8() {
        let decoded = resolve_encoding("Preço;Custo".as_bytes());
        assert_eq!(decoded.encoding, TextEncoding::Utf8);
        assert_eq!(decoded.text, "Preço;Custo");
        assert!(!decoded.encoding.is_fallback());
    }

    #[test]
    fn test_empty_input_is_utf8() {
        let decoded = resolve_encoding(b"");
        assert_eq!(decoded.encoding, TextEncoding::Utf8);
        assert!(decoded.text.is_empty());
    }

    #[test]
    fn test_windows_1252_export() {
        // "Preço" and a euro sign, as a legacy spreadsheet export writes them
        let decoded = resolve_encoding(b"Pre\xE7o;\x80");
        assert_eq!(decoded.encoding, TextEncoding::Windows1252);
        assert_eq!(decoded.text, "Preço;€");
        assert!(decoded.encoding.is_fallback());
    }

    #[test]
    fn test_undefined_cp1252_byte_falls_back_to_latin1() {
        let decoded = resolve_encoding(b"a\x81b\xE9");
        assert_eq!(decoded.encoding, TextEncoding::Latin1);
        assert_eq!(decoded.text, "a\u{81}bé");
    }

    #[test]
    fn test_bom_followed_by_invalid_utf8_does_not_claim_bom() {
        let decoded = resolve_encoding(b"\xEF\xBB\xBFPre\xE7o");
        assert_eq!(decoded.encoding, TextEncoding::Windows1252);
    }
}

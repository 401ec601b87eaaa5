//! MIME transfer and header encodings.
//!
//! Supports Base64 (with RFC 2045 line wrapping), Quoted-Printable, and
//! RFC 2047 header encoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum encoded line length for Base64 and Quoted-Printable bodies (RFC 2045).
pub const MAX_LINE_LENGTH: usize = 76;

/// Longest UTF-8 chunk per RFC 2047 encoded-word; 45 bytes is 60 Base64 chars,
/// keeping each word under the 75 character limit.
const ENCODED_WORD_CHUNK: usize = 45;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 split into CRLF-terminated lines of at most
/// [`MAX_LINE_LENGTH`] characters.
///
/// Every line, including the last one, ends with `\r\n`. Empty input yields an
/// empty string.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let line_count = encoded.len().div_ceil(MAX_LINE_LENGTH);
    let mut result = String::with_capacity(encoded.len() + line_count * 2);

    // Base64 output is pure ASCII so byte chunks are valid str boundaries.
    for line in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        result.push_str(std::str::from_utf8(line).unwrap_or_default());
        result.push_str("\r\n");
    }

    result
}

/// Encodes text using Quoted-Printable encoding (RFC 2045 section 6.7).
///
/// Hard line breaks in the input (`\n` or `\r\n`) are emitted as CRLF, long
/// lines get `=` soft breaks so no encoded line exceeds [`MAX_LINE_LENGTH`],
/// and whitespace at the end of a line is always escaped.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);
    let mut lines = text.split('\n').peekable();

    while let Some(line) = lines.next() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        encode_quoted_printable_line(line.as_bytes(), &mut result);
        if lines.peek().is_some() {
            result.push_str("\r\n");
        }
    }

    result
}

fn encode_quoted_printable_line(line: &[u8], out: &mut String) {
    let mut column = 0;

    for (index, &byte) in line.iter().enumerate() {
        let is_last = index + 1 == line.len();
        let literal = match byte {
            b'!'..=b'<' | b'>'..=b'~' => true,
            b' ' | b'\t' => !is_last,
            _ => false,
        };
        let width = if literal { 1 } else { 3 };

        // Non-final characters must leave room for the soft break marker.
        let limit = if is_last {
            MAX_LINE_LENGTH
        } else {
            MAX_LINE_LENGTH - 1
        };
        if column + width > limit {
            out.push_str("=\r\n");
            column = 0;
        }

        if literal {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "={byte:02X}");
        }
        column += width;
    }
}

/// Encodes a header value using RFC 2047 `B` encoding when it is not plain ASCII.
///
/// ASCII values without control characters are returned unchanged. Longer
/// values are split into several encoded-words on character boundaries.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return text.to_string();
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for ch in text.chars() {
        if chunk.len() + ch.len_utf8() > ENCODED_WORD_CHUNK {
            words.push(encoded_word(&chunk));
            chunk.clear();
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk));
    }

    words.join(" ")
}

fn encoded_word(chunk: &str) -> String {
    format!("=?utf-8?B?{}?=", encode_base64(chunk.as_bytes()))
}

/// Reference decoders for checking encoder output.
#[cfg(test)]
pub(crate) mod test_support {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    /// Decodes Base64, ignoring embedded line breaks.
    pub fn decode_base64(data: &str) -> Option<Vec<u8>> {
        let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD.decode(cleaned).ok()
    }

    /// Decodes Quoted-Printable text, honoring soft line breaks.
    pub fn decode_quoted_printable(text: &str) -> Option<String> {
        let mut result = Vec::with_capacity(text.len());
        let bytes = text.as_bytes();
        let mut index = 0;

        while index < bytes.len() {
            let byte = bytes[index];
            if byte != b'=' {
                result.push(byte);
                index += 1;
                continue;
            }
            if bytes[index + 1..].starts_with(b"\r\n") {
                index += 3;
                continue;
            }
            let hex = std::str::from_utf8(bytes.get(index + 1..index + 3)?).ok()?;
            result.push(u8::from_str_radix(hex, 16).ok()?);
            index += 3;
        }

        String::from_utf8(result).ok()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::test_support::{decode_base64, decode_quoted_printable};
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_wrapped_short_input() {
        assert_eq!(encode_base64_wrapped(b"Hello"), "SGVsbG8=\r\n");
        assert_eq!(encode_base64_wrapped(b""), "");
    }

    #[test]
    fn test_base64_wrapped_exact_multiple() {
        // 57 input bytes encode to exactly 76 characters.
        let data = vec![0xAB_u8; 57 * 2];
        let wrapped = encode_base64_wrapped(&data);
        let lines: Vec<&str> = wrapped.split_terminator("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.len() == MAX_LINE_LENGTH));
    }

    proptest! {
        #[test]
        fn base64_wrapped_lines_are_76_and_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let wrapped = encode_base64_wrapped(&data);
            let lines: Vec<&str> = wrapped.split_terminator("\r\n").collect();
            if let Some((last, full)) = lines.split_last() {
                for line in full {
                    prop_assert_eq!(line.len(), MAX_LINE_LENGTH);
                }
                prop_assert!(!last.is_empty() && last.len() <= MAX_LINE_LENGTH);
            }
            prop_assert_eq!(decode_base64(&lines.concat()).unwrap(), data);
        }

        #[test]
        fn quoted_printable_roundtrips_and_respects_line_length(text in "[ -~\u{e9}\u{4e2d}\t\n]{0,400}") {
            let encoded = encode_quoted_printable(&text);
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= MAX_LINE_LENGTH, "line too long: {line:?}");
                prop_assert!(!line.ends_with(' ') && !line.ends_with('\t'));
            }
            prop_assert_eq!(decode_quoted_printable(&encoded).unwrap(), text.replace('\n', "\r\n"));
        }
    }

    #[test]
    fn test_quoted_printable_encode() {
        let text = "Hello, World!";
        let encoded = encode_quoted_printable(text);
        assert_eq!(encoded, "Hello, World!");

        let text = "Héllo, Wørld!";
        let encoded = encode_quoted_printable(text);
        assert!(encoded.contains("=C3"));
    }

    #[test]
    fn test_quoted_printable_equals_sign_and_trailing_space() {
        assert_eq!(encode_quoted_printable("a=b"), "a=3Db");
        assert_eq!(encode_quoted_printable("end "), "end=20");
        assert_eq!(encode_quoted_printable("tab\t\nnext"), "tab=09\r\nnext");
    }

    #[test]
    fn test_quoted_printable_keeps_hard_breaks() {
        assert_eq!(
            encode_quoted_printable("Hello\nworking\r\n"),
            "Hello\r\nworking\r\n"
        );
    }

    #[test]
    fn test_quoted_printable_soft_breaks_long_lines() {
        let text = "x".repeat(200);
        let encoded = encode_quoted_printable(&text);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 76);
        assert!(lines[0].ends_with('='));
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), text);
    }

    #[test]
    fn test_rfc2047_encode() {
        assert_eq!(encode_rfc2047("Hello?"), "Hello?");

        let encoded = encode_rfc2047("Héllo");
        assert_eq!(encoded, "=?utf-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_rfc2047_splits_long_values() {
        let text = "é".repeat(60);
        let encoded = encode_rfc2047(&text);
        let words: Vec<&str> = encoded.split(' ').collect();
        assert!(words.len() > 1);
        assert!(words.iter().all(|w| w.len() <= 75));
    }
}

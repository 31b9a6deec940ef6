//! Charset transcoding.
//!
//! The extractor never fails on an unknown or broken charset: decoding falls
//! back to reading bytes as ISO-8859-1 and encoding falls back to the
//! inverse mapping, so an unknown charset round-trips bytes unchanged.

use encoding_rs::{Encoding, EncoderResult};

/// Converts between raw octets and text in a named charset.
///
/// Implementations must not panic and must not fail: when the charset is
/// unknown or the conversion is impossible the input is passed through.
pub trait Transcoder {
    /// Decode `bytes` in `charset` into text.
    fn to_unicode(&self, bytes: &[u8], charset: &str) -> String;

    /// Encode `text` into `charset`.
    fn from_unicode(&self, text: &str, charset: &str) -> Vec<u8>;

    /// Encode `text` into `charset`, writing characters the charset cannot
    /// represent as `&#xHEX;` character references.
    fn from_unicode_with_entity(&self, text: &str, charset: &str) -> Vec<u8>;
}

/// [`Transcoder`] backed by `encoding_rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodingRsTranscoder;

impl EncodingRsTranscoder {
    fn lookup(charset: &str) -> Option<&'static Encoding> {
        let label = charset.trim();
        if label.is_empty() {
            return None;
        }
        let encoding = Encoding::for_label(label.as_bytes());
        if encoding.is_none() {
            tracing::debug!(charset = label, "Unknown charset, passing bytes through");
        }
        encoding
    }
}

impl Transcoder for EncodingRsTranscoder {
    fn to_unicode(&self, bytes: &[u8], charset: &str) -> String {
        match Self::lookup(charset) {
            Some(encoding) => {
                let (text, _had_errors) = encoding.decode_without_bom_handling(bytes);
                text.into_owned()
            }
            None => latin1_decode(bytes),
        }
    }

    fn from_unicode(&self, text: &str, charset: &str) -> Vec<u8> {
        match Self::lookup(charset) {
            Some(encoding) => {
                let (bytes, _, _) = encoding.encode(text);
                bytes.into_owned()
            }
            None => latin1_encode(text),
        }
    }

    fn from_unicode_with_entity(&self, text: &str, charset: &str) -> Vec<u8> {
        let Some(encoding) = Self::lookup(charset) else {
            return latin1_encode(text);
        };
        if encoding.output_encoding() == encoding_rs::UTF_8 {
            return text.as_bytes().to_vec();
        }

        let mut encoder = encoding.new_encoder();
        let mut out = Vec::with_capacity(text.len() + 16);
        let mut src = text;
        let mut buf = [0u8; 1024];
        loop {
            let (result, read, written) =
                encoder.encode_from_utf8_without_replacement(src, &mut buf, true);
            out.extend_from_slice(&buf[..written]);
            src = &src[read..];
            match result {
                EncoderResult::InputEmpty => break,
                EncoderResult::OutputFull => continue,
                EncoderResult::Unmappable(ch) => {
                    out.extend_from_slice(format!("&#x{:X};", ch as u32).as_bytes());
                }
            }
        }
        out
    }
}

/// Read every byte as the code point of the same value.
pub fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`latin1_decode`]. Characters above U+00FF are written as
/// UTF-8 since they have no single-octet form.
pub fn latin1_encode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match u8::try_from(u32::from(ch)) {
            Ok(b) => out.push(b),
            Err(_) => {
                let mut tmp = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
            }
        }
    }
    out
}

/// Reinterpret octet-valued text as UTF-8 when that is lossless.
///
/// `s` is expected to hold raw octets mapped one per character. When every
/// character is an octet and the octets form valid UTF-8 the decoded text is
/// returned; otherwise `s` is returned as is, which keeps already-decoded
/// text from being decoded twice.
pub fn try_from_utf8(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    for ch in s.chars() {
        match u8::try_from(u32::from(ch)) {
            Ok(b) => bytes.push(b),
            Err(_) => return s.to_string(),
        }
    }
    match String::from_utf8(bytes) {
        Ok(decoded) => decoded,
        Err(_) => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_unicode_known_charsets() {
        let tc = EncodingRsTranscoder;
        assert_eq!(tc.to_unicode(b"caf\xe9", "iso-8859-1"), "café");
        assert_eq!(tc.to_unicode("日本".as_bytes(), "UTF-8"), "日本");
        assert_eq!(tc.to_unicode(b"\x93\xfa\x96\x7b", "Shift_JIS"), "日本");
    }

    #[test]
    fn test_unknown_charset_round_trips_bytes() {
        let tc = EncodingRsTranscoder;
        let raw = b"a\xff\x80z";
        let text = tc.to_unicode(raw, "x-no-such-charset");
        assert_eq!(text.chars().count(), 4);
        assert_eq!(tc.from_unicode(&text, "x-no-such-charset"), raw.to_vec());
        assert_eq!(tc.to_unicode(raw, ""), latin1_decode(raw));
    }

    #[test]
    fn test_from_unicode_with_entity() {
        let tc = EncodingRsTranscoder;
        let out = tc.from_unicode_with_entity("aé日", "iso-8859-1");
        assert_eq!(out, b"a\xe9&#x65E5;".to_vec());
        let out = tc.from_unicode_with_entity("日", "utf-8");
        assert_eq!(out, "日".as_bytes().to_vec());
    }

    #[test]
    fn test_try_from_utf8() {
        // "é" as two raw octets.
        assert_eq!(try_from_utf8("\u{c3}\u{a9}"), "é");
        // Invalid UTF-8 stays as is.
        assert_eq!(try_from_utf8("\u{e9}t\u{e9}"), "\u{e9}t\u{e9}");
        // Already-decoded text outside the octet range stays as is.
        assert_eq!(try_from_utf8("日本"), "日本");
        assert_eq!(try_from_utf8("plain"), "plain");
    }

    #[test]
    fn test_latin1_encode_roundtrip() {
        let raw: Vec<u8> = (0u8..=255).collect();
        assert_eq!(latin1_encode(&latin1_decode(&raw)), raw);
    }
}

//! Tolerant Base64 decoding for message bodies and `B` encoded words.

use std::sync::LazyLock;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Strict engine: standard alphabet, canonical padding required.
static STRICT: LazyLock<GeneralPurpose> = LazyLock::new(|| {
    GeneralPurpose::new(
        &alphabet::STANDARD,
        GeneralPurposeConfig::new()
            .with_decode_allow_trailing_bits(true)
            .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
    )
});

/// Decode Base64 that may contain line breaks or junk.
///
/// The input is first decoded as is. When that fails every octet outside
/// the Base64 alphabet is removed, the rest is truncated to a multiple of
/// four and decoded again. Input that still does not decode (padding in the
/// middle, for instance) yields an empty result.
pub fn safe_decode(input: &[u8]) -> Vec<u8> {
    if let Ok(bytes) = STRICT.decode(input) {
        return bytes;
    }

    let mut cleaned: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
        .collect();
    cleaned.truncate(cleaned.len() - cleaned.len() % 4);

    match STRICT.decode(&cleaned) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Base64 payload is corrupt, dropping it");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_input() {
        assert_eq!(safe_decode(b"aGVsbG8="), b"hello");
        assert_eq!(safe_decode(b""), b"");
    }

    #[test]
    fn test_line_broken_input() {
        assert_eq!(safe_decode(b"aGVs\r\nbG8g\r\nd29y\r\nbGQ=\r\n"), b"hello world");
    }

    #[test]
    fn test_truncated_input_is_cut_to_quads() {
        // "aGVsbG8" lacks its padding; the last partial quad is dropped.
        assert_eq!(safe_decode(b"aGVsbG8"), b"hel");
    }

    #[test]
    fn test_inner_padding_yields_empty() {
        assert_eq!(safe_decode(b"aG==bG8h"), b"");
    }
}

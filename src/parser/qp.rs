//! Quoted-printable decoding (RFC 2045 §6.7) and the `Q` encoding of
//! RFC 2047 encoded words.

/// Decode quoted-printable octets.
///
/// Never fails: an `=` that starts neither an octet nor a soft line break is
/// kept literally. Blanks at the end of a line are dropped; blanks followed
/// by text or by `=` are kept. With `underscore_to_space` (the `Q` encoding)
/// `_` decodes to a space.
pub fn decode_quoted_printable(input: &[u8], underscore_to_space: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut padding: Vec<u8> = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let c = input[pos];
        pos += 1;

        match c {
            b' ' | b'\t' => {
                padding.push(c);
            }
            b'=' => {
                out.append(&mut padding);

                if let (Some(&h), Some(&l)) = (input.get(pos), input.get(pos + 1)) {
                    if let (Some(h), Some(l)) = (hex_value(h), hex_value(l)) {
                        out.push(h << 4 | l);
                        pos += 2;
                        continue;
                    }
                }

                // Soft line break: "=" [blanks] CRLF (or a bare CR or LF).
                let mut look = pos;
                while matches!(input.get(look), Some(b' ' | b'\t')) {
                    look += 1;
                }
                match input.get(look) {
                    Some(b'\r') => {
                        pos = look + 1;
                        if input.get(pos) == Some(&b'\n') {
                            pos += 1;
                        }
                    }
                    Some(b'\n') => {
                        pos = look + 1;
                    }
                    _ => out.push(b'='),
                }
            }
            b'\r' => {
                padding.clear();
                out.push(b'\r');
                if input.get(pos) == Some(&b'\n') {
                    out.push(b'\n');
                    pos += 1;
                }
            }
            b'\n' => {
                padding.clear();
                out.push(b'\n');
            }
            _ => {
                out.append(&mut padding);
                if c == b'_' && underscore_to_space {
                    out.push(b' ');
                } else {
                    out.push(c);
                }
            }
        }
    }

    // Blanks at the very end of the input count as trailing.
    out
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn qp(s: &[u8]) -> Vec<u8> {
        decode_quoted_printable(s, false)
    }

    #[test]
    fn test_hex_octets() {
        assert_eq!(qp(b"caf=C3=A9"), "café".as_bytes());
        assert_eq!(qp(b"caf=c3=a9"), "café".as_bytes());
    }

    #[test]
    fn test_soft_line_break() {
        assert_eq!(qp(b"long=\r\nline"), b"longline");
        assert_eq!(qp(b"long= \t\r\nline"), b"longline");
        assert_eq!(qp(b"long=\nline"), b"longline");
        // Blanks before the soft break are content.
        assert_eq!(qp(b"two =\r\nwords"), b"two words");
    }

    #[test]
    fn test_literal_equals() {
        assert_eq!(qp(b"a=b"), b"a=b");
        assert_eq!(qp(b"a=G1"), b"a=G1");
        assert_eq!(qp(b"end="), b"end=");
    }

    #[test]
    fn test_trailing_blanks_dropped() {
        assert_eq!(qp(b"text  \r\nnext"), b"text\r\nnext");
        assert_eq!(qp(b"text \t"), b"text");
        assert_eq!(qp(b"a  b"), b"a  b");
        // Blanks dropped at one line end do not reappear later.
        assert_eq!(qp(b"a \r\nb c"), b"a\r\nb c");
    }

    #[test]
    fn test_line_breaks_preserved() {
        assert_eq!(qp(b"a\r\nb\nc\rd"), b"a\r\nb\nc\rd");
    }

    #[test]
    fn test_q_encoding_underscore() {
        assert_eq!(decode_quoted_printable(b"a_b=5F", true), b"a b_");
        assert_eq!(decode_quoted_printable(b"a_b", false), b"a_b");
    }

    proptest! {
        #[test]
        fn test_decode_is_identity_without_equals(s in "[A-Za-z0-9.,;:!?()<>/+*'\"-]{0,64}( [A-Za-z0-9]{1,8}){0,8}") {
            prop_assert_eq!(qp(s.as_bytes()), s.as_bytes().to_vec());
        }
    }
}

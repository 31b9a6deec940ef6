//! Multipart body splitting (RFC 2046 §5.1.1).

use std::sync::LazyLock;

use regex::bytes::Regex;

use super::engine::{first_of, parse_all, re, Cursor, Parse};
use super::lexical::crlf;

static TRANSPORT_PADDING: LazyLock<Regex> = LazyLock::new(|| re(r"^[\t ]*"));

/// Body parts of a multipart body, preamble and epilogue removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartBody<'a> {
    pub parts: Vec<&'a [u8]>,
    /// The close delimiter was missing; the last part runs to the end of
    /// the body.
    pub corrupted: bool,
}

/// Split `body` on `boundary`.
///
/// A body without even an opening delimiter yields no parts.
pub fn split_multipart<'a>(body: &'a [u8], boundary: &[u8]) -> MultipartBody<'a> {
    parse_all(body, |c| multipart_body(c, boundary)).unwrap_or_default()
}

fn transport_padding(c: &mut Cursor<'_>) -> Parse<()> {
    c.regex(&TRANSPORT_PADDING).map(|_| ())
}

fn multipart_body<'a>(c: &mut Cursor<'a>, boundary: &[u8]) -> Parse<MultipartBody<'a>> {
    let dash_boundary = [b"--", boundary].concat();
    c.skip_to(&dash_boundary, true)?;
    transport_padding(c)?;
    crlf(c)?;

    let delimiter = [b"\r\n--", boundary].concat();
    let mut ret = MultipartBody::default();
    let mut closed = false;

    while !closed {
        let start = c.pos();
        loop {
            if c.skip_to(&delimiter, false).is_err() {
                c.discard();
                ret.parts.push(c.consumed_since(start));
                ret.corrupted = true;
                closed = true;
                break;
            }
            let end = c.pos();

            let after = c.optional(|c| {
                c.skip(delimiter.len())?;
                first_of!(c;
                    |c| {
                        transport_padding(c)?;
                        crlf(c)?;
                        Ok(false)
                    },
                    |c| c.literal(b"--").map(|_| true),
                )
            });
            match after {
                Some(is_close) => {
                    ret.parts.push(&c.consumed_since(start)[..end - start]);
                    closed = is_close;
                    break;
                }
                // Text that starts like the delimiter but is not one.
                None => {
                    c.any_char()?;
                }
            }
        }
    }

    c.discard();
    Ok(ret)
}

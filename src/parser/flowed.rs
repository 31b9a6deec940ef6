//! `format=flowed` text (RFC 3676).

use std::sync::LazyLock;

use regex::bytes::Regex;

use super::engine::{first_of, parse_all, re, Cursor, Parse};

static SIG_SEP: LazyLock<Regex> = LazyLock::new(|| re(r"(?-u)^(>*) ?(-- )(?:(\r\n)|\z)"));
static FLOWED_LINE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?-u)^(>*) ?([^\x00\n\r]*?)( ?)(?:(\r\n)|\z)"));

/// Unfold flowed text: soft line breaks (a line ending in a space) are
/// joined with the following line of the same quote depth.
///
/// With `delsp` the trailing space of a flowed line is removed as well.
/// Text that is not well-formed flowed text comes back unchanged.
pub fn decode_flowed(body: &[u8], delsp: bool) -> Vec<u8> {
    parse_all(body, |c| flowed_body(c, delsp)).unwrap_or_else(|| body.to_vec())
}

struct Line<'a> {
    quote: &'a [u8],
    text: &'a [u8],
    flow: &'a [u8],
    crlf: bool,
    signature: bool,
}

fn line<'a>(c: &mut Cursor<'a>) -> Parse<Line<'a>> {
    let at = c.pos();
    let caps = first_of!(c;
        |c| c.regex_match(&SIG_SEP).map(|caps| (caps, true)),
        |c| c.regex_match(&FLOWED_LINE).map(|caps| (caps, false)),
    )?;
    let (caps, signature) = caps;
    // A zero-length match only happens at the end of the input.
    if c.pos() == at {
        return Err(super::engine::NoMatch);
    }
    let group = |i: usize| caps.get(i).map(|m| m.as_bytes()).unwrap_or_default();
    Ok(Line {
        quote: group(1),
        text: group(2),
        flow: if signature { &[] } else { group(3) },
        crlf: caps.get(if signature { 3 } else { 4 }).is_some(),
        signature,
    })
}

fn flowed_body(c: &mut Cursor<'_>, delsp: bool) -> Parse<Vec<u8>> {
    let mut out = Vec::with_capacity(c.len());
    let mut last_flowed = false;
    let mut last_quote: &[u8] = &[];

    for l in c.zero_or_more(line) {
        if l.signature {
            if last_flowed {
                out.extend_from_slice(b"\r\n");
            }
            out.extend_from_slice(l.quote);
            out.extend_from_slice(l.text);
            if l.crlf {
                out.extend_from_slice(b"\r\n");
            }
            last_flowed = false;
        } else {
            if last_flowed && l.quote != last_quote {
                out.extend_from_slice(b"\r\n");
                last_flowed = false;
            }
            if !last_flowed {
                out.extend_from_slice(l.quote);
            }
            out.extend_from_slice(l.text);
            if !delsp {
                out.extend_from_slice(l.flow);
            }
            if l.flow.is_empty() && l.crlf {
                out.extend_from_slice(b"\r\n");
            }
            last_flowed = l.flow == b" ";
        }
        last_quote = l.quote;
    }
    Ok(out)
}

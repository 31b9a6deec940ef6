//! RFC 2047 encoded words and the "unstructured text with encoded words"
//! grammar used for `Subject`, `Content-Location` and legacy parameters.

use std::sync::LazyLock;

use regex::bytes::Regex;

use super::base64::safe_decode;
use super::engine::{first_of, re, Cursor, Parse};
use super::lexical::fws;
use super::qp::decode_quoted_printable;
use crate::charset::{latin1_decode, Transcoder};

static EW_TOKEN: LazyLock<Regex> = LazyLock::new(|| re(r#"(?-u)^[^\t\n\r "(),./:-@\[-\]]+"#));
static EW_TOKEN_NOAST: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?-u)^[^\t\n\r "(),./:-@\[-\]*]+"#));
static ENCODED_TEXT: LazyLock<Regex> = LazyLock::new(|| re(r"(?-u)^[^ ?]+"));
static UTEXT_NE_1N: LazyLock<Regex> = LazyLock::new(|| re(r"(?-u)^[^\t\n\r =]+"));

/// One encoded word: `=?charset[*language]?encoding?text?=`.
///
/// Returns whether the word was decoded, and the text. A word with an
/// encoding other than `B` or `Q` is returned verbatim and flagged as not
/// decoded.
pub fn encoded_word(c: &mut Cursor<'_>, tc: &dyn Transcoder) -> Parse<(bool, String)> {
    let start = c.pos();

    c.literal(b"=?")?;
    let charset = latin1_decode(c.regex(&EW_TOKEN_NOAST)?);
    c.optional(|c| {
        c.literal(b"*")?;
        c.regex(&EW_TOKEN_NOAST)
    });
    c.literal(b"?")?;
    let encoding = c.regex(&EW_TOKEN)?.to_ascii_uppercase();
    c.literal(b"?")?;
    let text = c.regex(&ENCODED_TEXT)?;
    c.literal(b"?=")?;

    match encoding.as_slice() {
        b"Q" => {
            let bytes = decode_quoted_printable(text, true);
            Ok((true, tc.to_unicode(&bytes, &charset)))
        }
        b"B" => {
            let bytes = safe_decode(text);
            Ok((true, tc.to_unicode(&bytes, &charset)))
        }
        _ => Ok((false, latin1_decode(c.consumed_since(start)))),
    }
}

/// A run of encoded words separated by folding white space.
///
/// The white space between two words is dropped when both of them decoded,
/// and kept otherwise.
pub fn encoded_word_seq(c: &mut Cursor<'_>, tc: &dyn Transcoder) -> Parse<String> {
    let (mut last_decoded, mut ret) = encoded_word(c, tc)?;
    for (space, decoded, text) in c.zero_or_more(|c| {
        let space = fws(c)?;
        let (decoded, text) = encoded_word(c, tc)?;
        Ok((space, decoded, text))
    }) {
        if !last_decoded || !decoded {
            ret.push_str(&space);
        }
        ret.push_str(&text);
        last_decoded = decoded;
    }
    Ok(ret)
}

/// Unstructured text in which encoded words are decoded wherever they
/// appear. Leading and trailing white space is dropped.
pub fn unstructured_ew(c: &mut Cursor<'_>, tc: &dyn Transcoder) -> Parse<String> {
    c.zero_or_more(fws);
    let mut ret = String::new();
    for chunk in c.zero_or_more(|c| {
        let mut s = c.zero_or_more(fws).concat();
        for piece in c.one_or_more(|c| {
            first_of!(c;
                |c| encoded_word_seq(c, tc),
                |c| c.regex(&UTEXT_NE_1N).map(latin1_decode),
                |c| c.literal(b"=").map(latin1_decode),
            )
        })? {
            s.push_str(&piece);
        }
        Ok(s)
    }) {
        ret.push_str(&chunk);
    }
    c.zero_or_more(fws);
    Ok(ret)
}

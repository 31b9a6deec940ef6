//! RFC 5322 lexical tokens (§3.2): folding white space, comments, atoms,
//! quoted strings and unstructured text.
//!
//! Productions return the raw octets they matched as text, one character per
//! octet. Callers that want UTF-8 interpretation apply
//! [`crate::charset::try_from_utf8`] afterwards.

use std::sync::LazyLock;

use regex::bytes::Regex;

use super::engine::{first_of, re, Cursor, Parse};
use crate::charset::latin1_decode;

static WSP_0N: LazyLock<Regex> = LazyLock::new(|| re(r"(?-u)^[\t ]*"));
static WSP_1N: LazyLock<Regex> = LazyLock::new(|| re(r"(?-u)^[\t ]+"));
static QUOTED_PAIR: LazyLock<Regex> = LazyLock::new(|| re(r"(?-u)^\\([\x00-\x7f])"));
static CTEXT_1N: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?-u)^[\x01-\x08\x0b\x0c\x0e-\x1f!-'*-\[\]-\x7f]+"));
static ATEXT_1N: LazyLock<Regex> = LazyLock::new(|| re(r"(?-u)^[!#-'*+\-/-9=?A-Z\^-\x7e]+"));
static QTEXT_1N: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?-u)^[\x01-\x08\x0b\x0c\x0e-\x1f!#-\[\]-\x7f]+"));
static DTEXT_1N: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?-u)^[\x01-\x08\x0b\x0c\x0e-\x1f!-Z\^-\x7f]+"));
static UTEXT_1N: LazyLock<Regex> = LazyLock::new(|| re(r"(?-u)^[^\t\n\r ]+"));

fn text(bytes: &[u8]) -> String {
    latin1_decode(bytes)
}

// ── Core rules (RFC 5234 B.1) ───────────────────────────────────────

pub fn crlf(c: &mut Cursor<'_>) -> Parse<()> {
    c.literal(b"\r\n").map(|_| ())
}

pub fn wsp_0n(c: &mut Cursor<'_>) -> Parse<String> {
    c.regex(&WSP_0N).map(text)
}

pub fn wsp_1n(c: &mut Cursor<'_>) -> Parse<String> {
    c.regex(&WSP_1N).map(text)
}

// ── Folding white space and comments (§3.2.2) ───────────────────────

pub fn quoted_pair(c: &mut Cursor<'_>) -> Parse<String> {
    let caps = c.regex_match(&QUOTED_PAIR)?;
    Ok(caps.get(1).map(|m| text(m.as_bytes())).unwrap_or_default())
}

/// Folding white space. Line breaks are dropped; only the blanks are kept.
pub fn fws(c: &mut Cursor<'_>) -> Parse<String> {
    let runs = c.one_or_more(|c| {
        c.optional(crlf);
        wsp_1n(c)
    })?;
    Ok(runs.concat())
}

/// A possibly nested comment. Its text is never needed, so nothing is
/// returned. An unterminated comment consumes nothing.
pub fn comment(c: &mut Cursor<'_>) -> Parse<()> {
    c.attempt(|c| {
        c.literal(b"(")?;
        c.zero_or_more(|c| {
            c.optional(fws);
            first_of!(c;
                |c| c.regex(&CTEXT_1N).map(|_| ()),
                |c| quoted_pair(c).map(|_| ()),
                comment,
            )
        });
        c.optional(fws);
        c.literal(b")")?;
        Ok(())
    })
}

/// Comments and folding white space. Returns the white space only.
pub fn cfws(c: &mut Cursor<'_>) -> Parse<String> {
    first_of!(c;
        |c| {
            let mut s = c
                .one_or_more(|c| {
                    let t = c.optional(fws).unwrap_or_default();
                    comment(c)?;
                    Ok(t)
                })?
                .concat();
            if let Some(t) = c.optional(fws) {
                s.push_str(&t);
            }
            Ok(s)
        },
        fws,
    )
}

// ── Atoms (§3.2.3) ──────────────────────────────────────────────────

pub fn atext_1n(c: &mut Cursor<'_>) -> Parse<String> {
    c.regex(&ATEXT_1N).map(text)
}

pub fn atom(c: &mut Cursor<'_>, no_cfws: bool) -> Parse<String> {
    if !no_cfws {
        c.optional(cfws);
    }
    let ret = atext_1n(c)?;
    if !no_cfws {
        c.optional(cfws);
    }
    Ok(ret)
}

pub fn dot_atom_text(c: &mut Cursor<'_>) -> Parse<String> {
    let mut ret = atext_1n(c)?;
    for more in c.zero_or_more(|c| {
        c.literal(b".")?;
        atext_1n(c)
    }) {
        ret.push('.');
        ret.push_str(&more);
    }
    Ok(ret)
}

pub fn dot_atom(c: &mut Cursor<'_>) -> Parse<String> {
    c.optional(cfws);
    let ret = dot_atom_text(c)?;
    c.optional(cfws);
    Ok(ret)
}

// ── Quoted strings (§3.2.4) ─────────────────────────────────────────

/// A quoted string without its quotes and with quoted pairs resolved.
///
/// The empty string `""` is accepted.
pub fn quoted_string(c: &mut Cursor<'_>, no_cfws: bool) -> Parse<String> {
    if !no_cfws {
        c.optional(cfws);
    }
    c.literal(b"\"")?;
    let mut ret = String::new();
    let chunks = c.zero_or_more(|c| {
        let mut s = c.optional(fws).unwrap_or_default();
        let t = first_of!(c;
            |c| c.regex(&QTEXT_1N).map(text),
            quoted_pair,
        )?;
        s.push_str(&t);
        Ok(s)
    });
    for chunk in chunks {
        ret.push_str(&chunk);
    }
    if let Some(t) = c.optional(fws) {
        ret.push_str(&t);
    }
    c.literal(b"\"")?;
    if !no_cfws {
        c.optional(cfws);
    }
    Ok(ret)
}

// ── Miscellaneous tokens (§3.2.5) ───────────────────────────────────

pub fn word(c: &mut Cursor<'_>, no_cfws: bool) -> Parse<String> {
    first_of!(c;
        |c| atom(c, no_cfws),
        |c| quoted_string(c, no_cfws),
    )
}

/// Unstructured field body. Leading and trailing white space is dropped,
/// inner folds collapse to their blanks.
pub fn unstructured(c: &mut Cursor<'_>) -> Parse<String> {
    c.zero_or_more(fws);
    let mut ret = String::new();
    for chunk in c.zero_or_more(|c| {
        let mut s = c.zero_or_more(fws).concat();
        s.push_str(&c.regex(&UTEXT_1N).map(text)?);
        Ok(s)
    }) {
        ret.push_str(&chunk);
    }
    c.zero_or_more(fws);
    Ok(ret)
}

// ── Domain literal (§3.4.1) ─────────────────────────────────────────

pub fn domain_literal(c: &mut Cursor<'_>) -> Parse<String> {
    c.optional(cfws);
    c.literal(b"[")?;
    let mut ret = String::new();
    for chunk in c.zero_or_more(|c| {
        let mut s = c.optional(fws).unwrap_or_default();
        let t = first_of!(c;
            |c| c.regex(&DTEXT_1N).map(text),
            quoted_pair,
        )?;
        s.push_str(&t);
        Ok(s)
    }) {
        ret.push_str(&chunk);
    }
    if let Some(t) = c.optional(fws) {
        ret.push_str(&t);
    }
    c.literal(b"]")?;
    c.optional(cfws);
    Ok(ret)
}

//! Rewriting of references inside HTML and CSS content.
//!
//! Content stays in the part's own charset. Only the references are
//! decoded for lookup, and replacements are encoded back into that charset.

use std::sync::LazyLock;

use regex::bytes::{Captures, Regex};

use super::resolver::find_part;
use super::ExtractedPart;
use crate::charset::{latin1_decode, try_from_utf8, Transcoder};
use crate::parser::engine::find;
use crate::path::{get_base_dir, resolve};

fn rx(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid built-in pattern")
}

/// `url(...)` and `@import` targets, in every quoting HTML lets through.
///
/// Groups: 1 the text before the target, 2-5 a double-quoted target, 6-9
/// a single-quoted target, 10 a bare target.
static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    let double = r#"((?:\\"|[^"])*?)"#;
    let single = r"((?:\\'|[^'])*?)";
    rx(&format!(
        concat!(
            r"(?i-u)(@import\s*(?:url\s*\(\s*)?|[^a-zA-Z0-9_]url\s*\(\s*)",
            r#"(?:"{d}"|&quot;{d}&quot;|&#x22;{d}&#x22;|&#34;{d}&#34;"#,
            r"|'{s}'|&apos;{s}&apos;|&#x27;{s}&#x27;|&#39;{s}&#39;",
            r#"|([^"';()]+))"#,
        ),
        d = double,
        s = single,
    ))
});

/// An opening tag with its attribute text.
static ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    rx(r#"(?-u)(<([?A-Za-z0-9_:\-]+))(\s(?:"(?:\\"|[^"])*"|'(?:\\'|[^'])*'|[^"'\\>])*)(>)"#)
});

/// A linking attribute inside the attribute text of a tag.
static LINK_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    rx(concat!(
        r"(?i-u)(\s(class|src|href|background|action|data)\s*=\s*)",
        r#"(?:(")((?:\\"|[^"])*)"|(')((?:\\'|[^'])*)'|([^"'\\ >]+))"#,
    ))
});

static BASE: LazyLock<Regex> = LazyLock::new(|| {
    rx(concat!(
        r#"(?i-u)<base\s(?:"(?:\\"|[^"])*"|'(?:\\'|[^'])*'|[^"'\\>])*?"#,
        r#"href\s*=\s*(?:"((?:\\"|[^"])*)"|'((?:\\'|[^'])*)'|([^"'\\ >]+))"#,
        r#"(?:"(?:\\"|[^"])*"|'(?:\\'|[^'])*'|[^"'\\>])*>"#,
    ))
});

/// Office namespace tags left in PowerPoint and Word HTML exports.
static OFFICE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    rx(r#"(?-u)</?(o|p|oa|v):(?:"(?:\\"|[^"])*"|'(?:\\'|[^'])*'|[^"'\\>])*?>"#)
});

/// Marker of Office HTML exports with VML drawings.
pub const VML_MARKER: &[u8] = br#"xmlns:v="urn:schemas-microsoft-com:vml""#;

/// Class of an anchor that links back to the original page; its `href` is
/// left alone.
pub const ORIGINAL_LINK_CLASS: &str = "unmht_link_to_original";

/// Rewrite the references in `parts[origin]`.
///
/// HTML gets its `<base>` tags folded into the part's base directory and
/// removed, then its linking attributes rewritten. HTML and CSS both get
/// their `url()` and `@import` targets rewritten. Parts that are neither
/// are left alone.
pub fn rewrite_part(
    parts: &mut [ExtractedPart],
    origin: usize,
    base_uri: &str,
    tc: &dyn Transcoder,
) {
    let (is_html, is_css) = (parts[origin].is_html, parts[origin].is_css);
    if !is_html && !is_css {
        return;
    }

    let mut content = std::mem::take(&mut parts[origin].content);
    if is_html {
        content = strip_base(parts, origin, &content, tc);
        content = rewrite_elements(parts, origin, &content, base_uri, tc);
        if find(&content, VML_MARKER).is_some() {
            content = OFFICE_TAG.replace_all(&content, &b""[..]).into_owned();
        }
    }
    content = rewrite_css(parts, origin, &content, base_uri, tc);
    parts[origin].content = content;
}

/// Decode a reference taken from content in `charset`.
fn decode_reference(bytes: &[u8], charset: &str, tc: &dyn Transcoder) -> String {
    if charset.is_empty() {
        try_from_utf8(&latin1_decode(bytes))
    } else {
        tc.to_unicode(bytes, charset)
    }
}

fn encode_reference(text: &str, charset: &str, tc: &dyn Transcoder) -> Vec<u8> {
    if charset.is_empty() {
        text.as_bytes().to_vec()
    } else {
        tc.from_unicode(text, charset)
    }
}

/// Remove backslash escapes of `quote`.
fn unescape_quote(bytes: &[u8], quote: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&quote) {
            out.push(quote);
            i += 2;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}

fn is_skipped_scheme(path: &str) -> bool {
    path.starts_with("mailto:") || path.starts_with("data:")
}

fn wrap(prev: &[u8], quote: &[u8], inner: &[u8]) -> Vec<u8> {
    [prev, quote, inner, quote].concat()
}

fn strip_base(
    parts: &mut [ExtractedPart],
    origin: usize,
    content: &[u8],
    tc: &dyn Transcoder,
) -> Vec<u8> {
    BASE.replace_all(content, |caps: &Captures<'_>| {
        let path = if let Some(m) = caps.get(1) {
            unescape_quote(m.as_bytes(), b'"')
        } else if let Some(m) = caps.get(2) {
            unescape_quote(m.as_bytes(), b'\'')
        } else {
            caps.get(3).map(|m| m.as_bytes().to_vec()).unwrap_or_default()
        };
        let part = &mut parts[origin];
        let href = get_base_dir(&decode_reference(&path, &part.charset, tc));
        part.base_dir = resolve(&part.base_dir, &href);
        Vec::new()
    })
    .into_owned()
}

fn rewrite_elements(
    parts: &mut [ExtractedPart],
    origin: usize,
    content: &[u8],
    base_uri: &str,
    tc: &dyn Transcoder,
) -> Vec<u8> {
    ELEMENT
        .replace_all(content, |caps: &Captures<'_>| {
            let name = &caps[2];
            if name.eq_ignore_ascii_case(b"base") {
                return caps[0].to_vec();
            }
            let is_object = name.eq_ignore_ascii_case(b"object") || name.eq_ignore_ascii_case(b"embed");
            let is_anchor = name.eq_ignore_ascii_case(b"a");
            let is_link = name.eq_ignore_ascii_case(b"link");
            let mut is_original_link = false;

            let attrs = LINK_ATTRIBUTE.replace_all(&caps[3], |a: &Captures<'_>| {
                let whole = &a[0];
                let prev = &a[1];
                let attr = &a[2];
                let (quote, raw) = if let Some(m) = a.get(4) {
                    (&b"\""[..], unescape_quote(m.as_bytes(), b'"'))
                } else if let Some(m) = a.get(6) {
                    (&b"'"[..], unescape_quote(m.as_bytes(), b'\''))
                } else {
                    (&b"\""[..], a.get(7).map(|m| m.as_bytes().to_vec()).unwrap_or_default())
                };
                let charset = parts[origin].charset.clone();
                let path = decode_reference(&raw, &charset, tc);

                if attr.eq_ignore_ascii_case(b"class") {
                    if is_anchor && path == ORIGINAL_LINK_CLASS {
                        is_original_link = true;
                    }
                    return whole.to_vec();
                }
                if is_original_link && attr.eq_ignore_ascii_case(b"href") {
                    return whole.to_vec();
                }
                if path.is_empty() || is_skipped_scheme(&path) {
                    return whole.to_vec();
                }
                if !is_object && attr.eq_ignore_ascii_case(b"data") {
                    return whole.to_vec();
                }

                let is_relative = !has_scheme(&path);
                if let Some(target) = find_part(parts, origin, &path, false) {
                    if is_link {
                        parts[target.index].referred_base_dir = parts[origin].base_dir.clone();
                    }
                    let href = format!("{base_uri}{}{}", parts[target.index].ref_name, target.fragment);
                    return wrap(prev, quote, &encode_reference(&href, &charset, tc));
                }

                if path.starts_with("file:") || path.starts_with("cid:") {
                    return wrap(prev, quote, b"");
                }
                if is_relative && is_anchor {
                    let absolute = resolve(&get_base_dir(&parts[origin].location), &path);
                    return wrap(prev, quote, &encode_reference(&absolute, &charset, tc));
                }
                whole.to_vec()
            });

            [&caps[1], &attrs[..], &caps[4]].concat()
        })
        .into_owned()
}

/// Whether `path` starts with `scheme:`.
fn has_scheme(path: &str) -> bool {
    let scheme_len = path
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-')
        .count();
    scheme_len > 0 && path.as_bytes().get(scheme_len) == Some(&b':')
}

fn rewrite_css(
    parts: &mut [ExtractedPart],
    origin: usize,
    content: &[u8],
    base_uri: &str,
    tc: &dyn Transcoder,
) -> Vec<u8> {
    CSS_URL
        .replace_all(content, |caps: &Captures<'_>| {
            let whole = &caps[0];
            let Some(prev_match) = caps.get(1) else {
                return whole.to_vec();
            };
            let prev = prev_match.as_bytes();

            let quoted = (2..=9).find_map(|i| caps.get(i).map(|m| (i, m)));
            let (mut quote, raw) = match quoted {
                Some((i, m)) => {
                    let q = if i <= 5 { b'"' } else { b'\'' };
                    (&content[prev_match.end()..m.start()], unescape_quote(m.as_bytes(), q))
                }
                None => (
                    &b""[..],
                    caps.get(10).map(|m| m.as_bytes().to_vec()).unwrap_or_default(),
                ),
            };
            if quote.is_empty() && !prev.contains(&b'(') {
                quote = &b"'"[..];
            }

            let charset = parts[origin].charset.clone();
            let path = decode_reference(&raw, &charset, tc);
            if path.is_empty() || is_skipped_scheme(&path) {
                return whole.to_vec();
            }

            let check_referred = parts[origin].is_css;
            if let Some(target) = find_part(parts, origin, &path, check_referred) {
                parts[target.index].referred_base_dir = parts[origin].base_dir.clone();
                if target.index == origin && !target.fragment.is_empty() {
                    return wrap(prev, quote, &encode_reference(&target.fragment, &charset, tc));
                }
                let href = format!("{base_uri}{}{}", parts[target.index].ref_name, target.fragment);
                return wrap(prev, quote, &encode_reference(&href, &charset, tc));
            }

            if path.starts_with("file:") {
                return wrap(prev, quote, b"");
            }
            whole.to_vec()
        })
        .into_owned()
}

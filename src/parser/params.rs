//! Structured MIME header values: parameter lists (RFC 2045 §5, RFC 2183,
//! RFC 2231), `Content-Transfer-Encoding`, `Content-ID` and
//! `Content-Location` (RFC 2557).

use std::sync::LazyLock;

use regex::bytes::Regex;

use super::address::{local_part, msg_id};
use super::encoded_word::unstructured_ew;
use super::engine::{first_of, parse_all, re, Cursor, NoMatch, Parse};
use super::lexical::{cfws, fws, quoted_string};
use crate::charset::{latin1_decode, latin1_encode, Transcoder};
use crate::model::MimeParams;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| re(r#"(?-u)^[^\t\n\r "(),/:-@\[-\]]+"#));
static ATTRIBUTE_CHAR: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?-u)^[^\t\n\r "%'-*,/:-@\[-\]]"#));
static ATTRIBUTE_CHAR_1N: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?-u)^[^\t\n\r "%'-*,/:-@\[-\]]+"#));
static OTHER_SECTIONS: LazyLock<Regex> = LazyLock::new(|| re(r"^\*([1-9][0-9]*)"));
static CHARSET_OR_LANGUAGE: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?-u)^[^\t\n\r "(),./:-@\[-\]?']+"#));
static EXT_OCTET: LazyLock<Regex> = LazyLock::new(|| re(r"^%([0-9A-Fa-f]{2})"));
static LOOSE_VALUE: LazyLock<Regex> = LazyLock::new(|| re(r#"(?-u)^[^\t\n\r ";=?\\]+"#));
static URL_WORD: LazyLock<Regex> = LazyLock::new(|| re(r#"(?-u)^[^ \t\r\n"\\]+"#));
static LWSP_0N: LazyLock<Regex> = LazyLock::new(|| re(r"^[\t ]*"));
static ENCODING_NAMES: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^(?:7bit|8bit|binary|quoted-printable|base64)"));

/// One `attribute[*section][*]=value` occurrence before reassembly.
#[derive(Debug, Clone, Default)]
struct ParamSection {
    name: String,
    value: Vec<u8>,
    section: Option<u32>,
    charset: Option<String>,
    extended: bool,
}

// ── Public entry points ─────────────────────────────────────────────

/// Decode a `Content-Type` or `Content-Disposition` value.
///
/// The type may appear anywhere among the parameters, and a missing `;`
/// between parameters is tolerated. Parsing stops quietly at the first
/// construct it cannot read; only a value without a type is rejected.
pub fn decode_params(value: &[u8], tc: &dyn Transcoder) -> Option<MimeParams> {
    let mut c = Cursor::new(value);
    c.optional(|c| parameter_list(c, tc))
}

/// Decode a `Content-Transfer-Encoding` value, lowercased.
pub fn decode_transfer_encoding(value: &[u8]) -> Option<String> {
    parse_all(value, |c| {
        c.optional(cfws);
        let ret = first_of!(c;
            |c| c.regex(&ENCODING_NAMES),
            token,
        )?;
        c.optional(cfws);
        Ok(latin1_decode(ret).to_ascii_lowercase())
    })
}

/// Decode a `Content-ID` value (or the `start` parameter of a
/// `multipart/related`), without angle brackets.
pub fn decode_content_id(value: &[u8]) -> Option<String> {
    parse_all(value, cid)
}

/// Decode a `Content-Location` value.
pub fn decode_content_location(value: &[u8], tc: &dyn Transcoder) -> Option<String> {
    parse_all(value, |c| {
        c.optional(cfws);
        let ret = first_of!(c;
            url_parameter,
            |c| unstructured_ew(c, tc),
        )?;
        c.optional(cfws);
        Ok(ret)
    })
}

// ── RFC 2045 ────────────────────────────────────────────────────────

fn token<'a>(c: &mut Cursor<'a>) -> Parse<&'a [u8]> {
    c.regex(&TOKEN)
}

fn value(c: &mut Cursor<'_>) -> Parse<Vec<u8>> {
    first_of!(c;
        |c| token(c).map(<[u8]>::to_vec),
        |c| quoted_string(c, false).map(|s| latin1_encode(&s)),
    )
}

/// `content-id`: a `msg-id`, or a bare or bracketed local part for
/// generators that leave out the domain.
fn cid(c: &mut Cursor<'_>) -> Parse<String> {
    first_of!(c;
        msg_id,
        |c| {
            c.optional(cfws);
            c.literal(b"<")?;
            let s = local_part(c)?;
            c.literal(b">")?;
            c.optional(cfws);
            Ok(s)
        },
        |c| {
            c.optional(cfws);
            let s = local_part(c)?;
            c.optional(cfws);
            Ok(s)
        },
    )
}

// ── RFC 2231 ────────────────────────────────────────────────────────

fn parameter_list(c: &mut Cursor<'_>, tc: &dyn Transcoder) -> Parse<MimeParams> {
    let mut sections: Vec<ParamSection> = Vec::new();
    let mut media: Option<(String, String)> = None;

    c.zero_or_more(|c| {
        c.optional(cfws);
        first_of!(c;
            |c| {
                sections.push(parameter(c)?);
                Ok(())
            },
            |c| {
                if media.is_some() {
                    return Err(NoMatch);
                }
                let kind = token(c)?;
                c.optional(cfws);
                c.literal(b"/")?;
                c.optional(cfws);
                let subtype = token(c)?;
                media = Some((
                    latin1_decode(kind).to_ascii_lowercase(),
                    latin1_decode(subtype).to_ascii_lowercase(),
                ));
                Ok(())
            },
            |c| {
                if media.is_some() {
                    return Err(NoMatch);
                }
                let kind = token(c)?;
                media = Some((latin1_decode(kind).to_ascii_lowercase(), String::new()));
                Ok(())
            },
        )?;
        c.optional(cfws);
        c.optional(|c| c.literal(b";"));
        Ok(())
    });

    let (kind, subtype) = media.ok_or(NoMatch)?;
    let mut ret = MimeParams::new(kind, subtype);
    for (name, value) in assemble(sections, tc) {
        ret.add_param(&name, value);
    }
    Ok(ret)
}

/// Group sections by exact name, order each group by section number and
/// join the decoded sections.
///
/// Extended sections are charset-decoded with the charset of the group.
/// Other sections go through encoded-word decoding, which is not allowed
/// there but is what many generators emit.
fn assemble(sections: Vec<ParamSection>, tc: &dyn Transcoder) -> Vec<(String, String)> {
    struct Group {
        name: String,
        charset: Option<String>,
        sections: Vec<ParamSection>,
    }

    let mut groups: Vec<Group> = Vec::new();
    for s in sections {
        let at = match groups.iter().position(|g| g.name == s.name) {
            Some(at) => at,
            None => {
                groups.push(Group {
                    name: s.name.clone(),
                    charset: None,
                    sections: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[at];
        if let Some(charset) = s.charset.as_ref().filter(|cs| !cs.is_empty()) {
            group.charset = Some(charset.clone());
        }
        group.sections.push(s);
    }

    groups
        .into_iter()
        .map(|mut g| {
            g.sections.sort_by_key(|s| s.section.unwrap_or(0));
            let charset = g.charset.unwrap_or_default();
            let mut value = String::new();
            // Adjacent extended sections are decoded together so that a
            // multi-octet character may span a section boundary.
            let mut pending: Vec<u8> = Vec::new();
            for s in &g.sections {
                if s.extended {
                    pending.extend_from_slice(&s.value);
                    continue;
                }
                if !pending.is_empty() {
                    value.push_str(&tc.to_unicode(&pending, &charset));
                    pending.clear();
                }
                match parse_all(&s.value, |c| unstructured_ew(c, tc)) {
                    Some(decoded) => value.push_str(&decoded),
                    None => value.push_str(&latin1_decode(&s.value)),
                }
            }
            if !pending.is_empty() {
                value.push_str(&tc.to_unicode(&pending, &charset));
            }
            (g.name, value)
        })
        .collect()
}

fn parameter(c: &mut Cursor<'_>) -> Parse<ParamSection> {
    first_of!(c;
        regular_parameter,
        extended_parameter,
        // Values with characters that should have been quoted.
        |c| {
            let name = attribute(c)?;
            let section = c.optional(section);
            c.literal(b"=")?;
            let value = c.regex(&LOOSE_VALUE)?.to_vec();
            Ok(ParamSection {
                name,
                value,
                section,
                ..Default::default()
            })
        },
    )
}

fn regular_parameter(c: &mut Cursor<'_>) -> Parse<ParamSection> {
    let name = attribute(c)?;
    let section = c.optional(section);
    c.literal(b"=")?;
    let value = value(c)?;
    Ok(ParamSection {
        name,
        value,
        section,
        ..Default::default()
    })
}

fn attribute(c: &mut Cursor<'_>) -> Parse<String> {
    c.regex(&ATTRIBUTE_CHAR_1N).map(latin1_decode)
}

fn section(c: &mut Cursor<'_>) -> Parse<u32> {
    first_of!(c; initial_section, other_sections)
}

fn initial_section(c: &mut Cursor<'_>) -> Parse<u32> {
    c.literal(b"*0").map(|_| 0)
}

fn other_sections(c: &mut Cursor<'_>) -> Parse<u32> {
    let caps = c.regex_match(&OTHER_SECTIONS)?;
    let digits = caps.get(1).ok_or(NoMatch)?.as_bytes();
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(NoMatch)
}

fn extended_parameter(c: &mut Cursor<'_>) -> Parse<ParamSection> {
    first_of!(c;
        |c| {
            let name = attribute(c)?;
            let section = c.optional(initial_section);
            c.literal(b"*")?;
            c.literal(b"=")?;
            let charset = c.optional(|c| c.regex(&CHARSET_OR_LANGUAGE).map(latin1_decode));
            c.literal(b"'")?;
            // The language tag is not used.
            c.optional(|c| c.regex(&CHARSET_OR_LANGUAGE));
            c.literal(b"'")?;
            let value = extended_other_values(c);
            Ok(ParamSection {
                name,
                value,
                section,
                charset,
                extended: true,
            })
        },
        |c| {
            let name = attribute(c)?;
            let section = c.optional(other_sections);
            c.literal(b"*")?;
            c.literal(b"=")?;
            let value = extended_other_values(c);
            Ok(ParamSection {
                name,
                value,
                section,
                extended: true,
                ..Default::default()
            })
        },
    )
}

/// Percent-decoded octets of an extended value.
fn extended_other_values(c: &mut Cursor<'_>) -> Vec<u8> {
    c.zero_or_more(|c| {
        first_of!(c;
            ext_octet,
            |c| c.regex(&ATTRIBUTE_CHAR).map(|s| s[0]),
        )
    })
}

fn ext_octet(c: &mut Cursor<'_>) -> Parse<u8> {
    let caps = c.regex_match(&EXT_OCTET)?;
    let hex = caps.get(1).ok_or(NoMatch)?.as_bytes();
    std::str::from_utf8(hex)
        .ok()
        .and_then(|s| u8::from_str_radix(s, 16).ok())
        .ok_or(NoMatch)
}

// ── RFC 2557 ────────────────────────────────────────────────────────

/// A quoted URL whose words may be split by folding white space.
fn url_parameter(c: &mut Cursor<'_>) -> Parse<String> {
    c.literal(b"\"")?;
    let mut ret = latin1_decode(c.regex(&URL_WORD)?);
    for word in c.zero_or_more(|c| {
        c.optional(fws);
        c.regex(&LWSP_0N)?;
        c.optional(fws);
        c.regex(&URL_WORD).map(latin1_decode)
    }) {
        ret.push_str(&word);
    }
    c.literal(b"\"")?;
    Ok(ret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::EncodingRsTranscoder;
    use proptest::prelude::*;

    fn params(s: &str) -> Option<MimeParams> {
        decode_params(s.as_bytes(), &EncodingRsTranscoder)
    }

    #[test]
    fn test_content_type() {
        let p = params("text/html; charset=\"UTF-8\"").unwrap();
        assert_eq!(p.kind, "text");
        assert_eq!(p.subtype, "html");
        assert_eq!(p.param("charset"), Some("UTF-8"));
    }

    #[test]
    fn test_type_after_parameters_and_missing_semicolons() {
        let p = params("boundary=\"----=_NextPart\" Multipart/Related type=\"text/html\"")
            .unwrap();
        assert_eq!(p.kind, "multipart");
        assert_eq!(p.subtype, "related");
        assert_eq!(p.param("boundary"), Some("----=_NextPart"));
        assert_eq!(p.param("type"), Some("text/html"));
    }

    #[test]
    fn test_disposition() {
        let p = params("attachment; filename=report.pdf").unwrap();
        assert_eq!(p.kind, "attachment");
        assert_eq!(p.subtype, "");
        assert_eq!(p.param("filename"), Some("report.pdf"));
    }

    #[test]
    fn test_missing_type_is_rejected() {
        assert!(params("charset=utf-8").is_none());
        assert!(params("").is_none());
    }

    #[test]
    fn test_stops_at_garbage() {
        let p = params("text/plain; charset=us-ascii; ???").unwrap();
        assert_eq!(p.param("charset"), Some("us-ascii"));
    }

    #[test]
    fn test_rfc2231_extended() {
        let p = params("attachment; filename*=UTF-8'ja'%E6%97%A5%E6%9C%AC.txt").unwrap();
        assert_eq!(p.param("filename"), Some("日本.txt"));
    }

    #[test]
    fn test_rfc2231_sections_out_of_order() {
        let p = params(
            "attachment; filename*1*=%E6%9C%AC.txt; filename*0*=UTF-8''%E6%97%A5",
        )
        .unwrap();
        assert_eq!(p.param("filename"), Some("日本.txt"));
        // A character split across two sections.
        let p = params("attachment; n*0*=UTF-8''%E6%97; n*1*=%A5").unwrap();
        assert_eq!(p.param("n"), Some("日"));
        let p = params("text/plain; title*2=\"c\"; title*0=\"a\"; title*1=\"b\"").unwrap();
        assert_eq!(p.param("title"), Some("abc"));
    }

    #[test]
    fn test_encoded_word_in_parameter() {
        let p = params("attachment; filename=\"=?UTF-8?B?5pel5pys?=.txt\"").unwrap();
        assert_eq!(p.param("filename"), Some("日本.txt"));
    }

    #[test]
    fn test_loose_parameter_value() {
        let p = params("text/html; name=[x].html").unwrap();
        assert_eq!(p.param("name"), Some("[x].html"));
    }

    #[test]
    fn test_transfer_encoding() {
        assert_eq!(decode_transfer_encoding(b" Base64 ").as_deref(), Some("base64"));
        assert_eq!(
            decode_transfer_encoding(b"Quoted-Printable").as_deref(),
            Some("quoted-printable")
        );
        assert_eq!(decode_transfer_encoding(b"x-uuencode").as_deref(), Some("x-uuencode"));
        assert_eq!(decode_transfer_encoding(b""), None);
    }

    #[test]
    fn test_content_id() {
        assert_eq!(decode_content_id(b"<img1@example.com>").as_deref(), Some("img1@example.com"));
        assert_eq!(decode_content_id(b" <image001> ").as_deref(), Some("image001"));
        assert_eq!(decode_content_id(b"bare.id").as_deref(), Some("bare.id"));
    }

    #[test]
    fn test_content_location() {
        let tc = EncodingRsTranscoder;
        assert_eq!(
            decode_content_location(b"http://x/y/a.html", &tc).as_deref(),
            Some("http://x/y/a.html")
        );
        assert_eq!(
            decode_content_location(b"\"http://x/very/\r\n long.html\"", &tc).as_deref(),
            Some("http://x/very/long.html")
        );
    }

    proptest! {
        #[test]
        fn test_sections_join_in_numeric_order(
            chunks in proptest::collection::vec("[a-z0-9]{1,6}", 1..8),
            seed in any::<u64>(),
        ) {
            let mut order: Vec<usize> = (0..chunks.len()).collect();
            // Deterministic shuffle from the seed.
            let mut state = seed;
            for i in (1..order.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let j = (state >> 33) as usize % (i + 1);
                order.swap(i, j);
            }
            let mut header = String::from("attachment");
            for &i in &order {
                header.push_str(&format!("; name*{}=\"{}\"", i, chunks[i]));
            }
            let p = params(&header).unwrap();
            let joined = chunks.concat();
            prop_assert_eq!(p.param("name"), Some(joined.as_str()));
        }
    }
}

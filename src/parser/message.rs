//! Whole-message decoding: header block, field interpretation and the
//! recursive walk into multipart bodies.

use std::sync::LazyLock;

use regex::bytes::Regex;
use tracing::{debug, warn};

use super::address::parse_address_list;
use super::base64::safe_decode;
use super::date::parse_date;
use super::encoded_word::unstructured_ew;
use super::engine::{parse_all, re, Cursor, Parse};
use super::flowed::decode_flowed;
use super::lexical::{crlf, unstructured, wsp_0n};
use super::multipart::split_multipart;
use super::params::{
    decode_content_id, decode_content_location, decode_params, decode_transfer_encoding,
};
use super::qp::decode_quoted_printable;
use crate::charset::{latin1_decode, latin1_encode, try_from_utf8, Transcoder};
use crate::model::{Fields, MimePart};

/// An mbox `From ` separator line (RFC 4155) ahead of the header.
static FROM_LINE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i-u)^From [ \t]*(?:[^: \t\r\n][^\r\n]*)?(?:\r\n|\r|\n)"));
static FIELD_NAME: LazyLock<Regex> = LazyLock::new(|| re(r"^[!-9;-~]+"));

/// Decode a message whose line breaks are CRLF.
///
/// Returns `None` when the header block is malformed. Multipart children
/// that fail to decode are dropped from the tree.
pub fn decode_message(input: &[u8], tc: &dyn Transcoder) -> Option<MimePart> {
    let (fields, body) = parse_all(input, message)?;
    let mut part = MimePart {
        fields,
        ..MimePart::default()
    };
    decode_fields(&mut part, tc);

    if part.is_multipart {
        let split = split_multipart(body, part.boundary.as_bytes());
        if split.corrupted {
            warn!(
                boundary = %part.boundary,
                "Multipart body has no close delimiter"
            );
        }
        part.is_corrupted = split.corrupted;
        let total = split.parts.len();
        part.parts = split
            .parts
            .into_iter()
            .filter_map(|data| decode_message(data, tc))
            .collect();
        if part.parts.len() < total {
            warn!(
                dropped = total - part.parts.len(),
                "Skipping body parts with a malformed header"
            );
        }
    } else {
        let mut body = if part.format == "flowed" {
            decode_flowed(body, part.delsp)
        } else {
            body.to_vec()
        };
        match part.content_transfer_encoding.as_str() {
            "quoted-printable" => body = decode_quoted_printable(&body, false),
            "base64" => body = safe_decode(&body),
            _ => {}
        }
        part.body = body;
    }

    Some(part)
}

/// `[From-line] *field [CRLF body]`.
fn message<'a>(c: &mut Cursor<'a>) -> Parse<(Fields, &'a [u8])> {
    c.optional(|c| c.regex(&FROM_LINE));

    let mut fields = Fields::default();
    for (name, value) in c.zero_or_more(|c| {
        let name = c.regex(&FIELD_NAME)?;
        wsp_0n(c)?;
        c.literal(b":")?;
        let value = unstructured(c)?;
        crlf(c)?;
        Ok((name, value))
    }) {
        fields.add(&latin1_decode(name), latin1_encode(&value));
    }

    let body = c
        .optional(|c| {
            crlf(c)?;
            Ok(c.rest())
        })
        .unwrap_or_default();
    Ok((fields, body))
}

/// Fill in the derived fields of `part` from its raw header fields.
fn decode_fields(part: &mut MimePart, tc: &dyn Transcoder) {
    if let Some(params) = part.fields.get("Content-Type").and_then(|v| decode_params(v, tc)) {
        part.content_type = params.kind.to_lowercase();
        part.content_subtype = params.subtype.to_lowercase();
        part.mimetype = format!("{}/{}", part.content_type, part.content_subtype);
        if let Some(charset) = params.param("charset") {
            part.charset = charset.to_string();
        }
        if let Some(format) = params.param("format") {
            part.format = format.to_lowercase();
        }
        if let Some(delsp) = params.param("delsp") {
            part.delsp = delsp.eq_ignore_ascii_case("yes");
        }
        part.content_type_params = Some(params);
    }

    if let Some(subject) = part
        .fields
        .get("Subject")
        .and_then(|v| parse_all(v, |c| unstructured_ew(c, tc)))
    {
        part.subject = try_from_utf8(&subject);
    }

    if let Some(from) = part.fields.get("From") {
        part.from = try_from_utf8(&latin1_decode(from));
        part.from_list = parse_address_list(from, tc).unwrap_or_default();
    }

    if let Some(date) = part.fields.get("Date") {
        part.date = parse_date(date);
        if part.date.is_none() {
            debug!(date = %latin1_decode(date), "Could not parse date");
        }
    }

    if let Some(location) = part
        .fields
        .get("Content-Location")
        .and_then(|v| decode_content_location(v, tc))
    {
        part.content_location = try_from_utf8(&location);
    }

    if let Some(params) = part
        .fields
        .get("Content-Disposition")
        .and_then(|v| decode_params(v, tc))
    {
        part.content_disposition_type = params.kind.to_lowercase();
        if let Some(filename) = params.param("filename") {
            part.content_disposition_filename = try_from_utf8(filename);
        }
        part.content_disposition_params = Some(params);
    }

    if let Some(id) = part.fields.get("Content-ID").and_then(decode_content_id) {
        part.content_id = id;
    }

    if part.content_type == "multipart" {
        part.is_multipart = true;
        part.is_mixed = !matches!(part.content_subtype.as_str(), "related" | "alternative");

        if let Some(params) = &part.content_type_params {
            if let Some(boundary) = params.param("boundary") {
                part.boundary = boundary.to_string();
            }
            if let Some(start) = params.param("start") {
                part.start = decode_content_id(&latin1_encode(start))
                    .unwrap_or_else(|| start.to_string());
            }
            if let Some(kind) = params.param("type") {
                part.start_mimetype = kind.to_string();
            }
        }
    } else if let Some(encoding) = part
        .fields
        .get("Content-Transfer-Encoding")
        .and_then(decode_transfer_encoding)
    {
        part.content_transfer_encoding = encoding;
    }
}

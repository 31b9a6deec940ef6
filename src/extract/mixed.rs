//! Synthesis of one HTML document per `multipart/mixed` container.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::ExtractedPart;
use crate::charset::{latin1_decode, try_from_utf8, Transcoder};

fn rx(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid built-in pattern")
}

static HTML_OR_BODY_TAG: LazyLock<Regex> = LazyLock::new(|| {
    rx(r#"(?i)</?(html|body)(\s(?:"(?:\\"|[^"])*"|'(?:\\'|[^'])*'|[^"'\\>])*)?>"#)
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    rx(r#"\s*([?A-Za-z0-9_:\-]+)\s*=\s*(?:("(?:\\"|[^"])*")|('(?:\\'|[^'])*')|([^"'\\ >]+))"#)
});

static HEAD: LazyLock<Regex> = LazyLock::new(|| rx(r"(?i)<head>([^\x00]*)</head>"));

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    rx(r#"(?i)<!([?A-Za-z0-9_:\-]+)(?:\s(?:"(?:\\"|[^"])*"|'(?:\\'|[^'])*'|[^"'\\>])*)?>"#)
});

/// Escape text for use in HTML content and attribute values.
pub fn escape_entity(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&#xa0;"),
            _ => out.push(ch),
        }
    }
    out
}

/// What the children contribute outside their body markup.
#[derive(Debug, Default)]
struct Envelope {
    charsets: BTreeSet<String>,
    doctype: String,
    html_attrs: Vec<(String, String)>,
    head: Vec<String>,
    body_attrs: Vec<(String, String)>,
}

/// Insert or overwrite `key`, keeping the position of its first insertion.
fn set_attr(attrs: &mut Vec<(String, String)>, key: String, value: String) {
    match attrs.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => attrs.push((key, value)),
    }
}

fn attr_string(attrs: &[(String, String)]) -> String {
    attrs.iter().map(|(k, v)| format!(" {k}={v}")).collect()
}

fn content_text(part: &ExtractedPart, tc: &dyn Transcoder) -> String {
    if part.charset.is_empty() {
        try_from_utf8(&latin1_decode(&part.content))
    } else {
        tc.to_unicode(&part.content, &part.charset)
    }
}

/// Reduce an HTML document to its body markup, moving the `<html>` and
/// `<body>` attributes, the `<head>` content and the doctype into `envelope`.
fn inner_body(html: &str, envelope: &mut Envelope) -> String {
    let text = HTML_OR_BODY_TAG.replace_all(html, |caps: &Captures<'_>| {
        let is_html = caps[1].eq_ignore_ascii_case("html");
        if let Some(attrs) = caps.get(2) {
            for attr in ATTRIBUTE.captures_iter(attrs.as_str()) {
                let key = attr[1].to_ascii_lowercase();
                let value = (2..=4)
                    .find_map(|i| attr.get(i))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                let target = if is_html {
                    &mut envelope.html_attrs
                } else {
                    &mut envelope.body_attrs
                };
                set_attr(target, key, value);
            }
        }
        ""
    });

    let text = HEAD.replace(&text, |caps: &Captures<'_>| {
        envelope.head.push(caps[1].to_string());
        ""
    });

    DECLARATION
        .replace_all(&text, |caps: &Captures<'_>| {
            if caps[1].eq_ignore_ascii_case("doctype") {
                envelope.doctype = caps[0].to_string();
            }
            ""
        })
        .into_owned()
}

/// Body markup standing in for `part` inside the mixed document.
fn render(part: &ExtractedPart, envelope: &mut Envelope, base_uri: &str, tc: &dyn Transcoder) -> String {
    let is_attachment = !part.disposition_type.is_empty() && part.disposition_type != "inline";

    let fragment = if (!is_attachment && part.mimetype == "text/html") || part.is_mixed {
        if !part.charset.is_empty() {
            envelope.charsets.insert(part.charset.clone());
        }
        inner_body(&content_text(part, tc), envelope)
    } else if !is_attachment && part.mimetype == "text/plain" {
        if !part.charset.is_empty() {
            envelope.charsets.insert(part.charset.clone());
        }
        let escaped = escape_entity(&content_text(part, tc)).replace([' ', '\t'], "&#xa0;");
        format!("<pre>{escaped}</pre>")
    } else {
        let href = escape_entity(&format!("{base_uri}{}", part.ref_name));
        let name = escape_entity(if part.leaf_name.is_empty() {
            "???"
        } else {
            part.leaf_name.as_str()
        });
        if !is_attachment && part.content_type == "image" {
            format!(
                r#"<div style="text-align: center;"><img src="{href}" alt="{name}" /></div>"#
            )
        } else {
            format!(r#"<a href="{href}">{name}</a>"#)
        }
    };

    if part.disposition_filename.is_empty() {
        return fragment;
    }
    format!(
        concat!(
            r#"<fieldset style="border: 1px solid graytext;">"#,
            r#"<legend style="color: graytext; font-size: 80%;">{}</legend>"#,
            "{}</fieldset>",
        ),
        escape_entity(&part.disposition_filename),
        fragment
    )
}

/// Fill in the content of every mixed part.
///
/// Parts are visited last to first so that a nested mixed container is
/// complete before its parent embeds it. Each child contributes the
/// rendering of its start part. The document is encoded in the children's
/// charset when they all declared the same one, and in UTF-8 otherwise.
pub fn synthesize(parts: &mut [ExtractedPart], base_uri: &str, tc: &dyn Transcoder) {
    for index in (0..parts.len()).rev() {
        if !parts[index].is_mixed {
            continue;
        }

        let mut envelope = Envelope::default();
        let mut body = String::new();
        let mut mixed_path = Vec::new();
        for &child in &parts[index].children {
            let child = &parts[child];
            mixed_path.push(child.path.clone());
            mixed_path.extend(child.mixed_path.iter().cloned());
            let Some(start) = child.start_part else {
                tracing::debug!(path = %child.path, "Mixed child without a start part skipped");
                continue;
            };
            mixed_path.push(parts[start].path.clone());
            body.push_str(&render(&parts[start], &mut envelope, base_uri, tc));
        }

        let mut document = String::new();
        if !envelope.doctype.is_empty() {
            document.push_str(&envelope.doctype);
            document.push_str("\r\n");
        }
        document.push_str(&format!(
            "<html{}>\r\n<head>\r\n{}</head>\r\n<body{}>\r\n{}</body>\r\n</html>\r\n",
            attr_string(&envelope.html_attrs),
            envelope.head.join("\r\n"),
            attr_string(&envelope.body_attrs),
            body
        ));

        let part = &mut parts[index];
        part.mixed_path = mixed_path;
        match envelope.charsets.iter().next() {
            Some(charset) if envelope.charsets.len() == 1 => {
                part.content = tc.from_unicode_with_entity(&document, charset);
                part.charset = charset.clone();
            }
            _ => {
                part.content = document.into_bytes();
                part.charset = "utf-8".to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::EncodingRsTranscoder;

    fn leaf(path: &str, mimetype: &str, charset: &str, content: &[u8]) -> ExtractedPart {
        ExtractedPart {
            path: path.into(),
            ref_name: format!("ref-{path}"),
            mimetype: mimetype.into(),
            content_type: mimetype.split('/').next().unwrap_or_default().into(),
            charset: charset.into(),
            content: content.to_vec(),
            ..ExtractedPart::default()
        }
    }

    fn mixed(path: &str, children: Vec<usize>) -> ExtractedPart {
        ExtractedPart {
            path: path.into(),
            mimetype: "text/html".into(),
            charset: "utf-8".into(),
            is_html: true,
            is_mixed: true,
            is_multipart: true,
            children,
            ..ExtractedPart::default()
        }
    }

    fn with_starts(mut parts: Vec<ExtractedPart>) -> Vec<ExtractedPart> {
        for (i, p) in parts.iter_mut().enumerate() {
            p.start_part = Some(i);
        }
        parts
    }

    fn text(p: &ExtractedPart) -> String {
        String::from_utf8(p.content.clone()).unwrap()
    }

    #[test]
    fn test_escape_entity() {
        assert_eq!(escape_entity(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;");
        assert_eq!(escape_entity("a\u{a0}b"), "a&#xa0;b");
    }

    #[test]
    fn test_two_plain_texts_become_two_pre_blocks() {
        let mut parts = with_starts(vec![
            mixed("1", vec![1, 2]),
            leaf("1.1", "text/plain", "us-ascii", b"first a\tb"),
            leaf("1.2", "text/plain", "us-ascii", b"<second>"),
        ]);
        synthesize(&mut parts, "http://unmht/", &EncodingRsTranscoder);
        assert_eq!(
            text(&parts[0]),
            "<html>\r\n<head>\r\n</head>\r\n<body>\r\n<pre>first&#xa0;a&#xa0;b</pre><pre>&lt;second&gt;</pre></body>\r\n</html>\r\n"
        );
        assert_eq!(parts[0].charset, "us-ascii");
        assert_eq!(parts[0].mixed_path, vec!["1.1", "1.1", "1.2", "1.2"]);
    }

    #[test]
    fn test_html_child_is_unwrapped() {
        let html = concat!(
            "<!DOCTYPE html>\n<html lang=\"en\"><head><title>T</title></head>",
            "<body class='x' onload=init()>Hello</body></html>",
        );
        let mut parts = with_starts(vec![
            mixed("1", vec![1]),
            leaf("1.1", "text/html", "utf-8", html.as_bytes()),
        ]);
        synthesize(&mut parts, "http://unmht/", &EncodingRsTranscoder);
        assert_eq!(
            text(&parts[0]),
            concat!(
                "<!DOCTYPE html>\r\n<html lang=\"en\">\r\n<head>\r\n<title>T</title></head>\r\n",
                "<body class='x' onload=init()>\r\n\nHello</body>\r\n</html>\r\n",
            )
        );
    }

    #[test]
    fn test_images_links_and_attachments() {
        let mut image = leaf("1.1", "image/png", "", b"\x89PNG");
        image.leaf_name = "a<b>.png".into();
        let mut zip = leaf("1.2", "application/zip", "", b"PK");
        zip.disposition_type = "attachment".into();
        zip.disposition_filename = "d&d.zip".into();
        let nameless = leaf("1.3", "application/pdf", "", b"%PDF");
        let mut parts = with_starts(vec![mixed("1", vec![1, 2, 3]), image, zip, nameless]);
        synthesize(&mut parts, "cid:", &EncodingRsTranscoder);

        let body = text(&parts[0]);
        assert!(body.contains(
            r#"<div style="text-align: center;"><img src="cid:ref-1.1" alt="a&lt;b&gt;.png" /></div>"#
        ));
        assert!(body.contains(concat!(
            r#"<fieldset style="border: 1px solid graytext;">"#,
            r#"<legend style="color: graytext; font-size: 80%;">d&amp;d.zip</legend>"#,
            r#"<a href="cid:ref-1.2">???</a></fieldset>"#,
        )));
        assert!(body.contains(r#"<a href="cid:ref-1.3">???</a>"#));
        assert_eq!(parts[0].charset, "utf-8");
    }

    #[test]
    fn test_mixed_charsets_fall_back_to_utf8() {
        let mut parts = with_starts(vec![
            mixed("1", vec![1, 2]),
            leaf("1.1", "text/plain", "iso-8859-1", b"caf\xe9"),
            leaf("1.2", "text/plain", "utf-8", "日本".as_bytes()),
        ]);
        synthesize(&mut parts, "http://unmht/", &EncodingRsTranscoder);
        assert_eq!(parts[0].charset, "utf-8");
        let body = text(&parts[0]);
        assert!(body.contains("<pre>café</pre><pre>日本</pre>"));
    }

    #[test]
    fn test_single_charset_uses_character_references() {
        let mut parts = with_starts(vec![
            mixed("1", vec![1]),
            leaf("1.1", "text/html", "iso-8859-1", b"<p>caf\xe9</p>"),
        ]);
        synthesize(&mut parts, "http://unmht/", &EncodingRsTranscoder);
        assert_eq!(parts[0].charset, "iso-8859-1");
        assert!(parts[0].content.windows(8).any(|w| w == b"<p>caf\xe9<"));
    }

    #[test]
    fn test_nested_mixed_is_embedded() {
        let mut parts = with_starts(vec![
            mixed("1", vec![1, 3]),
            mixed("1.1", vec![2]),
            leaf("1.1.1", "text/plain", "us-ascii", b"inner"),
            leaf("1.2", "text/plain", "us-ascii", b"outer"),
        ]);
        synthesize(&mut parts, "http://unmht/", &EncodingRsTranscoder);
        let outer = text(&parts[0]);
        assert!(outer.contains("<pre>inner</pre>"));
        assert!(outer.contains("<pre>outer</pre>"));
        assert_eq!(outer.matches("<html").count(), 1);
        assert_eq!(parts[0].mixed_path, vec!["1.1", "1.1.1", "1.1.1", "1.1", "1.2", "1.2"]);
    }
}

//! Extraction of an archive into rewritten, cross-linked parts.
//!
//! [`Extractor::extract`] decodes the message, derives one
//! [`ExtractedPart`] per node of the part tree in document order, rewrites
//! the references inside HTML and CSS parts to `<base URI><ref name>`, and
//! synthesizes a page for every `multipart/mixed` container.

pub mod mixed;
pub mod resolver;
pub mod rewrite;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::charset::{EncodingRsTranscoder, Transcoder};
use crate::error::{Result, UnmhtError};
use crate::model::MimePart;
use crate::parser::decode_message;
use crate::parser::engine::find;
use crate::path::{classify, create_path, get_base_dir, resolve, Mhtml};
use resolver::normalize_name;

/// Base directory used when the archive has no locator of its own.
const DEFAULT_BASE_DIR: &str = "thismessage:///";

/// Base URI of cid mode.
pub const CID_BASE_URI: &str = "cid:";

/// Reference name of the slide frame in PowerPoint web exports.
const PPT_FRAME_NAME: &str = "frame.htm";

/// How rewritten references are spelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Rewrite references to `cid:<ref name>`.
    pub cid_mode: bool,
    /// Prefix of rewritten references when not in cid mode.
    pub http_base_uri: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            cid_mode: false,
            http_base_uri: "http://unmht/".to_string(),
        }
    }
}

impl ExtractOptions {
    /// The prefix put in front of reference names.
    pub fn base_uri(&self) -> &str {
        if self.cid_mode {
            CID_BASE_URI
        } else {
            &self.http_base_uri
        }
    }
}

/// Content-IDs for parts that have none, unique within one extraction.
///
/// Format: `part.<counter>.<random>.<unix millis>@unmht.org`, all hex.
#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: u32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> String {
        let id = format!(
            "part.{:x}.{:08x}.{:x}@unmht.org",
            self.counter,
            rand::random::<u32>(),
            Utc::now().timestamp_millis()
        );
        self.counter = self.counter.wrapping_add(1);
        id
    }
}

/// Everything the extractor knows about one node of the part tree.
///
/// Parts live in one flat list in document order. Links between them are
/// indices into that list (`children`, `start_part`) or hierarchy paths
/// (`path`, `mixed_path`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractedPart {
    /// Hierarchy path, `"1"` for the root and `"1.2"` for its second child.
    pub path: String,
    /// Hierarchy path of the parent, `""` for the root.
    pub parent_path: String,
    /// Child positions from the root, for [`MimePart::part_at`].
    pub index: Vec<usize>,

    /// The Content-ID from the header, empty when absent.
    pub content_id: String,
    /// The Content-ID, or a generated one.
    pub cid: String,
    /// Unique name used in rewritten references.
    pub ref_name: String,

    pub mimetype: String,
    /// Primary media type of the source part (`"image"`).
    pub content_type: String,
    pub charset: String,
    pub disposition_type: String,
    pub disposition_filename: String,

    /// Absolute location of the part.
    pub location: String,
    /// Directory relative references are resolved against.
    pub base_dir: String,
    pub leaf_name: String,
    pub fragment: String,
    pub normal_location: String,
    pub normal_leaf_name: String,
    pub normal_fragment: String,
    /// Base directory of the part that last referenced this one.
    pub referred_base_dir: String,

    pub is_html: bool,
    pub is_css: bool,
    pub is_multipart: bool,
    pub is_mixed: bool,
    pub is_start_part: bool,
    /// Hierarchy paths folded into a synthesized mixed document.
    pub mixed_path: Vec<String>,

    /// Flat indices of the children.
    pub children: Vec<usize>,
    /// Flat index of the part that represents this one as a page.
    pub start_part: Option<usize>,

    /// Rewritten content in `charset`.
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// The outcome of extracting one archive.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub root: MimePart,
    /// Every part in document order; the root is first.
    pub parts: Vec<ExtractedPart>,
    /// Index of the page to show first.
    pub start: usize,
    pub refs: HashMap<String, usize>,
    pub cids: HashMap<String, usize>,
    pub subject: String,
    pub date: Option<DateTime<Utc>>,
    /// Source length plus the length of every rewritten content.
    pub size: usize,
    /// The original locator with `()'"[]` and space percent-escaped.
    pub original: String,
    pub base_uri: String,
}

impl ExtractionResult {
    pub fn start_part(&self) -> &ExtractedPart {
        &self.parts[self.start]
    }

    pub fn part_by_ref(&self, ref_name: &str) -> Option<&ExtractedPart> {
        self.refs.get(ref_name).map(|&i| &self.parts[i])
    }

    pub fn part_by_cid(&self, cid: &str) -> Option<&ExtractedPart> {
        self.cids.get(cid).map(|&i| &self.parts[i])
    }

    /// The decoded tree node behind `part`.
    pub fn mime_part(&self, part: &ExtractedPart) -> Option<&MimePart> {
        self.root.part_at(&part.index)
    }
}

/// Percent-escape the characters that break references in rewritten
/// markup.
fn escape_original(uri: &str) -> String {
    let mut out = String::with_capacity(uri.len());
    for ch in uri.chars() {
        match ch {
            '(' | ')' | '\'' | '"' | '[' | ']' | ' ' => {
                out.push_str(&format!("%{:02X}", u32::from(ch)));
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Turn every bare CR or LF into CRLF.
fn coerce_crlf(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + text.len() / 16);
    let mut i = 0;
    while i < text.len() {
        match text[i] {
            b'\r' if text.get(i + 1) == Some(&b'\n') => {
                out.extend_from_slice(b"\r\n");
                i += 2;
                continue;
            }
            b'\r' | b'\n' => out.extend_from_slice(b"\r\n"),
            b => out.push(b),
        }
        i += 1;
    }
    out
}

fn looks_like_html(original_uri: &str, text: &[u8]) -> bool {
    let lower = original_uri.to_ascii_lowercase();
    if lower.ends_with(".eml") || lower.ends_with(".mbs") {
        return false;
    }
    text.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'<')
}

/// `application/octet-stream` pages saved by CGI scripts.
fn sniff_html(body: &[u8]) -> bool {
    body[..body.len().min(32)].contains(&b'<')
        && body.windows(5).any(|w| w.eq_ignore_ascii_case(b"<html"))
}

/// Extracts archives with one set of options and one transcoder.
pub struct Extractor {
    options: ExtractOptions,
    transcoder: Box<dyn Transcoder>,
}

impl Extractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self::with_transcoder(options, EncodingRsTranscoder)
    }

    pub fn with_transcoder(options: ExtractOptions, transcoder: impl Transcoder + 'static) -> Self {
        Self {
            options,
            transcoder: Box::new(transcoder),
        }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract `text`, the raw archive, whose own locator is `original_uri`.
    ///
    /// Input that is not a MIME message is wrapped as a single HTML or
    /// plain-text page, so only empty input fails.
    pub fn extract(&self, original_uri: &str, text: &[u8]) -> Result<ExtractionResult> {
        if text.is_empty() {
            return Err(UnmhtError::EmptyInput);
        }
        let tc = self.transcoder.as_ref();
        let base_uri = self.options.base_uri().to_string();

        let root = self.decode_or_wrap(original_uri, text)?;

        let base_dir = if original_uri.is_empty() {
            DEFAULT_BASE_DIR.to_string()
        } else {
            get_base_dir(original_uri)
        };

        let mut ids = IdGenerator::new();
        let mut parts = Vec::new();
        collect(&root, Vec::new(), &base_dir, "", "1".to_string(), &mut ids, &mut parts);
        debug!(parts = parts.len(), "Collected parts");

        assign_ref_names(&mut parts, &mut ids);

        for index in 0..parts.len() {
            rewrite::rewrite_part(&mut parts, index, &base_uri, tc);
        }

        let mut start = parts[0].start_part.unwrap_or(0);
        if let Some(frame) = powerpoint_frame(&parts) {
            debug!(frame, "PowerPoint export, starting at the slide frame");
            start = frame;
        }

        mixed::synthesize(&mut parts, &base_uri, tc);

        let mut size = text.len();
        let mut refs = HashMap::with_capacity(parts.len());
        let mut cids = HashMap::with_capacity(parts.len());
        for (index, part) in parts.iter().enumerate() {
            refs.insert(part.ref_name.clone(), index);
            if !part.cid.is_empty() {
                cids.entry(part.cid.clone()).or_insert(index);
            }
            size += part.content.len();
        }
        parts[start].is_start_part = true;

        Ok(ExtractionResult {
            subject: root.subject.clone(),
            date: root.date,
            root,
            parts,
            start,
            refs,
            cids,
            size,
            original: escape_original(original_uri),
            base_uri,
        })
    }

    fn decode_or_wrap(&self, original_uri: &str, text: &[u8]) -> Result<MimePart> {
        let tc = self.transcoder.as_ref();
        let decoded = decode_message(text, tc).or_else(|| {
            debug!("Message did not parse, retrying with CRLF line breaks");
            decode_message(&coerce_crlf(text), tc)
        });
        if let Some(root) = decoded.filter(|r| r.find_start_part().is_some()) {
            return Ok(root);
        }

        let mimetype = if looks_like_html(original_uri, text) {
            r#"text/html; charset="UTF-8""#
        } else {
            r#"text/plain; charset="UTF-8""#
        };
        warn!(mimetype, "Input is not a MIME archive, wrapping it as one page");
        let mut wrapped =
            format!("From: <Created by UnMHT>\r\nContent-Type: {mimetype}\r\n\r\n").into_bytes();
        wrapped.extend_from_slice(text);
        decode_message(&wrapped, tc).ok_or(UnmhtError::EmptyInput)
    }
}

/// Append the parts of the subtree at `part` to `parts` in document
/// order and return the flat index of `part`.
fn collect(
    part: &MimePart,
    index: Vec<usize>,
    parent_location: &str,
    parent_path: &str,
    path: String,
    ids: &mut IdGenerator,
    parts: &mut Vec<ExtractedPart>,
) -> usize {
    let mut p = ExtractedPart {
        parent_path: parent_path.to_string(),
        index,
        content_id: part.content_id.clone(),
        cid: if part.content_id.is_empty() {
            ids.next_id()
        } else {
            part.content_id.clone()
        },
        content_type: part.content_type.clone(),
        disposition_type: part.content_disposition_type.clone(),
        disposition_filename: part.content_disposition_filename.clone(),
        is_multipart: part.is_multipart,
        location: resolve(&get_base_dir(parent_location), &part.content_location),
        ..ExtractedPart::default()
    };

    if part.is_mixed {
        p.is_mixed = true;
        p.mimetype = "text/html".to_string();
        p.charset = "utf-8".to_string();
        p.is_html = true;
    } else {
        p.content = part.body.clone();
        p.mimetype = part.mimetype.clone();
        p.charset = part.charset.clone();
        if p.mimetype.is_empty() {
            p.mimetype = "text/plain".to_string();
            if p.charset.is_empty() {
                p.charset = "us-ascii".to_string();
            }
        }
        match p.mimetype.as_str() {
            "text/css" => p.is_css = true,
            "text/html" | "application/xhtml+xml" => p.is_html = true,
            "application/octet-stream" if sniff_html(&part.body) => {
                p.mimetype = "text/html".to_string();
                p.is_html = true;
            }
            _ => {}
        }
    }

    fill_path_info(&mut p);
    p.path = path;

    let flat = parts.len();
    let location = p.location.clone();
    let own_path = p.path.clone();
    parts.push(p);

    for (i, child) in part.parts.iter().enumerate() {
        let mut child_index = parts[flat].index.clone();
        child_index.push(i);
        let c = collect(
            child,
            child_index,
            &location,
            &own_path,
            format!("{own_path}.{}", i + 1),
            ids,
            parts,
        );
        parts[flat].children.push(c);
    }

    let start_part = part.find_start_index().map(|relative| {
        relative
            .into_iter()
            .fold(flat, |current, i| parts[current].children[i])
    });
    parts[flat].start_part = start_part;
    flat
}

/// Name every part after its Content-ID. A Content-ID that an earlier part
/// already carries gets a generated name instead, so names stay unique.
fn assign_ref_names(parts: &mut [ExtractedPart], ids: &mut IdGenerator) {
    let mut seen = HashSet::with_capacity(parts.len());
    for part in parts.iter_mut() {
        if seen.insert(part.cid.clone()) {
            part.ref_name = part.cid.clone();
        } else {
            part.ref_name = ids.next_id();
            warn!(
                path = %part.path,
                cid = %part.cid,
                ref_name = %part.ref_name,
                "Duplicate Content-ID, part renamed"
            );
            seen.insert(part.ref_name.clone());
        }
    }
}

/// Derive the directory, leaf name, fragment and comparison keys from
/// `part.location`.
fn fill_path_info(part: &mut ExtractedPart) {
    let info = classify(&part.location);

    if let Some(envelope) = &info.mhtml {
        part.leaf_name = envelope.filename.clone().unwrap_or_default();
        part.fragment = envelope.fragment.clone().unwrap_or_default();
        let mut base = info.clone();
        base.mhtml = Some(Mhtml::default());
        part.base_dir = create_path(&base, false);
    } else if info.dialect.is_data() {
        part.base_dir = part.location.clone();
        part.leaf_name = String::new();
        part.fragment = String::new();
    } else {
        part.leaf_name = info.leaf().to_string();
        part.fragment = info.fragment.clone().unwrap_or_default();
        let mut base = info.clone();
        base.components.pop();
        base.query = None;
        base.fragment = None;
        part.base_dir = create_path(&base, false);
    }

    if !part.disposition_filename.is_empty() {
        part.leaf_name = part.disposition_filename.clone();
    }

    let mut whole = info;
    whole.fragment = None;
    if let Some(envelope) = whole.mhtml.as_mut() {
        envelope.fragment = None;
    }
    part.normal_location = normalize_name(&create_path(&whole, false));
    part.normal_leaf_name = normalize_name(&part.leaf_name);
    part.normal_fragment = normalize_name(&part.fragment);
}

/// The slide frame of a PowerPoint web export, which should be shown
/// instead of the export's browser warning page.
fn powerpoint_frame(parts: &[ExtractedPart]) -> Option<usize> {
    let is_ppt = parts
        .iter()
        .any(|p| p.is_html && find(&p.content, rewrite::VML_MARKER).is_some());
    if !is_ppt {
        return None;
    }
    parts.iter().rposition(|p| p.ref_name == PPT_FRAME_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> ExtractionResult {
        Extractor::new(ExtractOptions::default())
            .extract("file:///tmp/page.mht", text.as_bytes())
            .unwrap()
    }

    fn content(p: &ExtractedPart) -> String {
        String::from_utf8_lossy(&p.content).into_owned()
    }

    const RELATED: &str = concat!(
        "Subject: Page\r\n",
        "Date: Tue, 1 Jul 2003 10:52:37 +0200\r\n",
        "MIME-Version: 1.0\r\n",
        "Content-Type: multipart/related; boundary=\"b\"; type=\"text/html\"\r\n",
        "\r\n",
        "--b\r\n",
        "Content-Type: text/html; charset=utf-8\r\n",
        "Content-Location: http://x/y/a.html\r\n",
        "\r\n",
        "<html><body><img src=\"b.png\"></body></html>\r\n",
        "--b\r\n",
        "Content-Type: image/png\r\n",
        "Content-Location: http://x/y/b.png\r\n",
        "Content-ID: <img1@x>\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "\r\n",
        "iVBORw0KGgo=\r\n",
        "--b--\r\n",
    );

    #[test]
    fn test_related_page_is_rewritten() {
        let r = extract(RELATED);
        assert_eq!(r.parts.len(), 3);
        assert_eq!(r.subject, "Page");
        assert!(r.date.is_some());
        assert_eq!(r.start, 1);
        assert!(r.parts[1].is_start_part);
        assert!(!r.parts[0].is_start_part);

        let image = &r.parts[2];
        assert_eq!(image.ref_name, "img1@x");
        assert_eq!(image.content, b"\x89PNG\r\n\x1a\n");
        assert_eq!(
            content(&r.parts[1]),
            "<html><body><img src=\"http://unmht/img1@x\"></body></html>"
        );
        assert_eq!(r.part_by_cid("img1@x").map(|p| p.path.as_str()), Some("1.2"));
        assert_eq!(r.part_by_ref(&r.parts[1].ref_name).map(|p| p.path.as_str()), Some("1.1"));
    }

    #[test]
    fn test_paths_locations_and_names() {
        let r = extract(RELATED);
        let page = &r.parts[1];
        assert_eq!(page.path, "1.1");
        assert_eq!(page.parent_path, "1");
        assert_eq!(page.index, vec![0]);
        assert_eq!(page.location, "http://x/y/a.html");
        assert_eq!(page.base_dir, "http://x/y");
        assert_eq!(page.leaf_name, "a.html");
        assert!(page.is_html);
        assert_eq!(r.parts[0].children, vec![1, 2]);
        assert_eq!(r.mime_part(page).map(|p| p.mimetype.as_str()), Some("text/html"));
    }

    #[test]
    fn test_size_counts_source_and_contents() {
        let r = extract(RELATED);
        let contents: usize = r.parts.iter().map(|p| p.content.len()).sum();
        assert_eq!(r.size, RELATED.len() + contents);
    }

    #[test]
    fn test_cid_mode() {
        let options = ExtractOptions {
            cid_mode: true,
            ..ExtractOptions::default()
        };
        let r = Extractor::new(options).extract("", RELATED.as_bytes()).unwrap();
        assert_eq!(r.base_uri, "cid:");
        assert!(content(&r.parts[1]).contains("src=\"cid:img1@x\""));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let mut ids = IdGenerator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(a.starts_with("part.0."));
        assert!(b.starts_with("part.1."));
        assert!(a.ends_with("@unmht.org"));
        assert_eq!(a.split('.').nth(2).map(str::len), Some(8));

        let r = extract(RELATED);
        assert_eq!(r.refs.len(), r.parts.len());
        assert!(r.parts[0].ref_name.starts_with("part."));
    }

    #[test]
    fn test_duplicate_content_ids_get_distinct_names() {
        let r = extract(concat!(
            "Content-Type: multipart/related; boundary=b\r\n\r\n",
            "--b\r\nContent-Type: text/html\r\nContent-ID: <page@x>\r\n\r\n",
            "<img src=\"cid:same@x\">\r\n",
            "--b\r\nContent-Type: image/png\r\nContent-ID: <same@x>\r\n\r\none\r\n",
            "--b\r\nContent-Type: image/png\r\nContent-ID: <same@x>\r\n\r\ntwo\r\n",
            "--b--\r\n",
        ));
        assert_eq!(r.parts[2].ref_name, "same@x");
        assert_ne!(r.parts[3].ref_name, "same@x");
        assert!(r.parts[3].ref_name.ends_with("@unmht.org"));
        assert_eq!(r.parts[3].cid, "same@x");
        assert_eq!(r.refs.len(), r.parts.len());
        assert_eq!(r.part_by_cid("same@x").map(|p| p.path.as_str()), Some("1.2"));
        assert_eq!(content(&r.parts[1]), "<img src=\"http://unmht/same@x\">");
    }

    #[test]
    fn test_original_is_escaped() {
        let r = Extractor::new(ExtractOptions::default())
            .extract("file:///tmp/my page (1).mht", RELATED.as_bytes())
            .unwrap();
        assert_eq!(r.original, "file:///tmp/my%20page%20%281%29.mht");
    }

    #[test]
    fn test_empty_input_fails() {
        let err = Extractor::new(ExtractOptions::default()).extract("", b"");
        assert!(matches!(err, Err(UnmhtError::EmptyInput)));
    }

    #[test]
    fn test_non_mime_input_is_wrapped() {
        let r = extract("  <html><body>hi</body></html>");
        assert_eq!(r.parts.len(), 1);
        assert_eq!(r.parts[0].mimetype, "text/html");
        assert_eq!(r.parts[0].charset, "UTF-8");
        assert_eq!(content(&r.parts[0]), "  <html><body>hi</body></html>");

        let r = Extractor::new(ExtractOptions::default())
            .extract("file:///tmp/mail.EML", b"<not a header>")
            .unwrap();
        assert_eq!(r.parts[0].mimetype, "text/plain");

        let r = extract("just some words");
        assert_eq!(r.parts[0].mimetype, "text/plain");
    }

    #[test]
    fn test_bare_line_feeds_are_retried() {
        let r = extract("Content-Type: text/html\nSubject: LF\n\n<p>x</p>\n");
        assert_eq!(r.subject, "LF");
        assert_eq!(r.parts[0].mimetype, "text/html");
        assert_eq!(content(&r.parts[0]), "<p>x</p>\r\n");
    }

    #[test]
    fn test_coerce_crlf() {
        assert_eq!(coerce_crlf(b"a\nb\rc\r\nd"), b"a\r\nb\r\nc\r\nd");
    }

    #[test]
    fn test_missing_type_defaults_to_plain_ascii() {
        let r = extract("Subject: x\r\n\r\nbody");
        assert_eq!(r.parts[0].mimetype, "text/plain");
        assert_eq!(r.parts[0].charset, "us-ascii");
    }

    #[test]
    fn test_octet_stream_html_is_sniffed() {
        let r = extract(concat!(
            "Content-Type: application/octet-stream\r\n\r\n",
            "<!DOCTYPE html><HTML><body>x</body></HTML>",
        ));
        assert_eq!(r.parts[0].mimetype, "text/html");
        assert!(r.parts[0].is_html);

        let r = extract(concat!(
            "Content-Type: application/octet-stream\r\n\r\n",
            "no markup in the first thirty-two bytes <html>",
        ));
        assert_eq!(r.parts[0].mimetype, "application/octet-stream");
    }

    #[test]
    fn test_mhtml_location() {
        let r = extract(concat!(
            "Content-Type: text/html\r\n",
            "Content-Location: mhtml:file:///C:/a.mht!page.html#top\r\n\r\n",
            "<p>x</p>",
        ));
        let p = &r.parts[0];
        assert_eq!(p.leaf_name, "page.html");
        assert_eq!(p.fragment, "top");
        assert_eq!(p.base_dir, "mhtml:file:///C:/a.mht");
        assert_eq!(p.normal_fragment, "top");
    }

    #[test]
    fn test_disposition_filename_overrides_leaf() {
        let r = extract(concat!(
            "Content-Type: application/pdf\r\n",
            "Content-Disposition: attachment; filename=\"report.pdf\"\r\n",
            "Content-Location: http://x/dl?id=3\r\n\r\n",
            "%PDF",
        ));
        assert_eq!(r.parts[0].leaf_name, "report.pdf");
        assert_eq!(r.parts[0].normal_leaf_name, "report.pdf");
    }

    #[test]
    fn test_mixed_message_synthesizes_page() {
        let r = extract(concat!(
            "Content-Type: multipart/mixed; boundary=m\r\n\r\n",
            "--m\r\nContent-Type: text/plain; charset=us-ascii\r\n\r\none\r\n",
            "--m\r\nContent-Type: text/plain; charset=us-ascii\r\n\r\ntwo\r\n",
            "--m--\r\n",
        ));
        assert_eq!(r.start, 0);
        let page = content(&r.parts[0]);
        let first = page.find("<pre>one</pre>").unwrap();
        let second = page.find("<pre>two</pre>").unwrap();
        assert!(first < second);
        assert_eq!(r.parts[0].mixed_path, vec!["1.1", "1.1", "1.2", "1.2"]);
    }

    #[test]
    fn test_powerpoint_frame_becomes_start() {
        let r = extract(concat!(
            "Content-Type: multipart/related; boundary=p\r\n\r\n",
            "--p\r\nContent-Type: text/html\r\nContent-Location: file:///C:/s/warn.htm\r\n\r\n",
            "<html xmlns:v=\"urn:schemas-microsoft-com:vml\"><o:p></o:p></html>\r\n",
            "--p\r\nContent-Type: text/html\r\nContent-ID: <frame.htm>\r\n",
            "Content-Location: file:///C:/s/frame.htm\r\n\r\n<p>slides</p>\r\n",
            "--p--\r\n",
        ));
        assert_eq!(r.start, 2);
        assert!(r.start_part().is_start_part);
        assert_eq!(
            content(&r.parts[1]),
            "<html xmlns:v=\"urn:schemas-microsoft-com:vml\"></html>"
        );
    }

    #[test]
    fn test_nested_location_resolves_against_parent() {
        let r = extract(concat!(
            "Content-Type: multipart/related; boundary=o\r\n",
            "Content-Location: http://x/dir/index.html\r\n\r\n",
            "--o\r\nContent-Type: text/css\r\nContent-Location: s.css\r\n\r\n",
            "a { background: url(i.png) }\r\n",
            "--o\r\nContent-Type: image/png\r\nContent-Location: i.png\r\n\r\n",
            "PNG\r\n",
            "--o--\r\n",
        ));
        assert_eq!(r.parts[1].location, "http://x/dir/s.css");
        assert_eq!(r.parts[2].location, "http://x/dir/i.png");
        let expected = format!("a {{ background: url(http://unmht/{}) }}", r.parts[2].ref_name);
        assert_eq!(content(&r.parts[1]), expected);
    }
}

//! The MIME part tree.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::address::Mailbox;
use super::params::MimeParams;

/// Raw header fields of one part, unfolded.
///
/// Lookup is case-insensitive. When a name occurs more than once the first
/// occurrence wins; the spelling of that occurrence is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    map: BTreeMap<String, (String, Vec<u8>)>,
}

impl Fields {
    pub fn has(&self, name: &str) -> bool {
        self.map.contains_key(&name.to_ascii_lowercase())
    }

    /// The unfolded raw octets of a field value.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.map
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value.as_slice())
    }

    pub fn add(&mut self, name: &str, value: Vec<u8>) {
        self.map
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| (name.to_string(), value));
    }

    /// Fields as `(name as first written, raw value)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.map
            .values()
            .map(|(name, value)| (name.as_str(), value.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// One node of a decoded message.
///
/// A leaf carries its transfer-decoded `body`; a multipart carries its
/// children in `parts`. The derived fields are filled in from the raw
/// header `fields` when the message is decoded and fall back to empty
/// values when a header is missing or malformed.
#[derive(Debug, Clone, Default)]
pub struct MimePart {
    pub fields: Fields,

    // ── Content-Type ──
    pub content_type_params: Option<MimeParams>,
    /// Primary media type, lowercased (`"text"`).
    pub content_type: String,
    /// Media subtype, lowercased (`"html"`).
    pub content_subtype: String,
    /// `type/subtype`, or empty when there is no usable `Content-Type`.
    pub mimetype: String,
    pub charset: String,
    /// The `format` parameter, lowercased (`"flowed"`).
    pub format: String,
    pub delsp: bool,

    pub is_multipart: bool,
    /// The multipart body ended without a close delimiter.
    pub is_corrupted: bool,
    /// A multipart that is neither `related` nor `alternative`.
    pub is_mixed: bool,
    pub boundary: String,
    /// Content-ID of the root part of a `multipart/related`.
    pub start: String,
    /// The `type` parameter of a `multipart/related`.
    pub start_mimetype: String,

    // ── Other fields ──
    pub content_location: String,
    pub content_disposition_params: Option<MimeParams>,
    pub content_disposition_type: String,
    pub content_disposition_filename: String,
    pub date: Option<DateTime<Utc>>,
    pub subject: String,
    /// `From` as decoded text.
    pub from: String,
    /// `From` parsed as an address list, empty when it does not parse.
    pub from_list: Vec<Mailbox>,
    pub content_id: String,
    /// Lowercased transfer encoding (`"base64"`), empty when absent.
    pub content_transfer_encoding: String,

    // ── Body ──
    pub body: Vec<u8>,
    pub parts: Vec<MimePart>,
}

impl MimePart {
    /// The part at `index` below this one, where `index` lists child
    /// positions from the top. An empty index is this part.
    pub fn part_at(&self, index: &[usize]) -> Option<&MimePart> {
        index.iter().try_fold(self, |part, &i| part.parts.get(i))
    }

    /// Select the part that represents this container as a page.
    ///
    /// - a leaf, or a mixed multipart, is its own start part;
    /// - a child whose Content-ID equals `start` wins next;
    /// - for `related`, a child whose type equals the `type` parameter;
    /// - for `alternative`, the last `text/html` child, then the last
    ///   `text/plain` child, where a nested multipart counts as its own
    ///   start part's type;
    /// - otherwise the first child's start part.
    pub fn find_start_part(&self) -> Option<&MimePart> {
        let index = self.find_start_index()?;
        self.part_at(&index)
    }

    /// Like [`MimePart::find_start_part`] but returns the child index path
    /// of the start part relative to this part.
    pub fn find_start_index(&self) -> Option<Vec<usize>> {
        if !self.is_multipart || self.is_mixed {
            return Some(Vec::new());
        }

        let descend = |i: usize| -> Option<Vec<usize>> {
            let mut index = vec![i];
            index.extend(self.parts[i].find_start_index()?);
            Some(index)
        };

        if !self.start.is_empty() {
            if let Some(i) = self.parts.iter().position(|p| p.content_id == self.start) {
                return descend(i);
            }
        }

        if self.content_subtype == "related" && !self.start_mimetype.is_empty() {
            if let Some(i) = self
                .parts
                .iter()
                .position(|p| p.mimetype == self.start_mimetype)
            {
                return descend(i);
            }
        }

        if self.content_subtype == "alternative" {
            for wanted in ["text/html", "text/plain"] {
                if let Some(i) = self.parts.iter().rposition(|p| p.mimetype == wanted) {
                    return Some(vec![i]);
                }
                if let Some(i) = self.parts.iter().rposition(|p| {
                    p.is_multipart
                        && p.find_start_part().is_some_and(|s| s.mimetype == wanted)
                }) {
                    return descend(i);
                }
            }
        }

        if self.parts.is_empty() {
            return None;
        }
        descend(0)
    }
}

//! Reference resolution between extracted parts.
//!
//! References are compared only through [`normalize_name`] keys, never as
//! raw strings.

use std::borrow::Cow;
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;

use super::ExtractedPart;
use crate::path::{resolve, unique};

static UNICODE_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%u([A-Fa-f0-9]{4})").expect("valid built-in pattern"));
static EXT_OCTET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([A-Fa-f0-9]{2})").expect("valid built-in pattern"));

/// Passes of decoding applied at most by [`normalize_name`].
const MAX_DECODE_PASSES: usize = 10;

/// Comparison key for a location, leaf name or fragment.
///
/// Each pass makes the path canonical with [`unique`], then decodes percent
/// escapes, `%uXXXX` escapes and the common HTML entities. Passes repeat
/// until the value stops changing, so a key normalizes to itself.
pub fn normalize_name(original: &str) -> String {
    if original.is_empty() {
        return String::new();
    }

    let mut name = original.to_string();
    for _ in 0..MAX_DECODE_PASSES {
        let next = decode_once(&unique(&name));
        if next == name {
            break;
        }
        name = next;
    }
    name
}

/// One round of percent, `%uXXXX` and entity decoding.
fn decode_once(name: &str) -> String {
    let decoded = match percent_decode_str(name).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => decode_ext_octets(name).into_owned(),
    };
    let decoded = UNICODE_ESCAPE
        .replace_all(&decoded, |caps: &regex::Captures<'_>| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned();
    unescape_entity(&decoded)
}

/// Decode `%XX` escapes one octet per character.
fn decode_ext_octets(s: &str) -> Cow<'_, str> {
    EXT_OCTET.replace_all(s, |caps: &regex::Captures<'_>| {
        u8::from_str_radix(&caps[1], 16)
            .map(|b| char::from(b).to_string())
            .unwrap_or_else(|_| caps[0].to_string())
    })
}

/// Undo the entity escaping HTML authors apply to attribute values.
pub fn unescape_entity(text: &str) -> String {
    text.replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#xa0;", "\u{a0}")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

/// A resolved reference: the target part and the `#fragment` to append
/// to its reference name (empty when the fragment is part of the match).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub index: usize,
    pub fragment: String,
}

/// Whether hierarchy path `path` lies below `parent` (`""` is the root's
/// parent and contains everything).
fn is_within(path: &str, parent: &str) -> bool {
    parent.is_empty()
        || path
            .strip_prefix(parent)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Resolve `reference`, found in the content of `parts[origin]`.
///
/// On top of [`find_part_simple`], a target outside the origin's own
/// subtree is rejected (for a mixed origin, outside every subtree folded
/// into it), and a multipart target is replaced by its start part.
pub fn find_part(
    parts: &[ExtractedPart],
    origin: usize,
    reference: &str,
    check_referred: bool,
) -> Option<Target> {
    let mut target = find_part_simple(parts, origin, reference, check_referred)?;

    let parent = &parts[target.index].parent_path;
    let origin_part = &parts[origin];
    let contained = if origin_part.is_mixed {
        origin_part.mixed_path.iter().any(|p| is_within(p, parent))
    } else {
        is_within(&origin_part.path, parent)
    };
    if !contained {
        return None;
    }

    if parts[target.index].is_multipart {
        target.index = parts[target.index].start_part?;
    }
    Some(target)
}

/// Resolve `reference` against every part's location without looking at
/// the tree shape.
///
/// Tried in order: `cid:` against Content-IDs, the reference as an
/// absolute location, the reference resolved against the origin's base
/// directory, and with `check_referred` the reference resolved against the
/// base directory of whoever last referenced the origin.
pub fn find_part_simple(
    parts: &[ExtractedPart],
    origin: usize,
    reference: &str,
    check_referred: bool,
) -> Option<Target> {
    let (path, fragment) = reference.split_once('#').unwrap_or((reference, ""));
    let sharp_fragment = if fragment.is_empty() {
        String::new()
    } else {
        format!("#{fragment}")
    };
    if !fragment.is_empty() && path.is_empty() {
        return Some(Target {
            index: origin,
            fragment: sharp_fragment,
        });
    }

    let normal_fragment = normalize_name(fragment);
    let normal_path = normalize_name(path);

    if let Some(cid) = normal_path.strip_prefix("cid:").filter(|c| !c.is_empty()) {
        if let Some(index) = parts.iter().position(|p| p.content_id == cid) {
            return Some(Target {
                index,
                fragment: sharp_fragment,
            });
        }
    }

    let lookup = |key: &str| -> Option<Target> {
        if !normal_fragment.is_empty() {
            if let Some(index) = parts
                .iter()
                .position(|p| p.normal_location == key && p.normal_fragment == normal_fragment)
            {
                return Some(Target {
                    index,
                    fragment: String::new(),
                });
            }
        }
        parts
            .iter()
            .position(|p| p.normal_location == key)
            .map(|index| Target {
                index,
                fragment: sharp_fragment.clone(),
            })
    };

    if let Some(found) = lookup(&normal_path) {
        return Some(found);
    }

    let origin_part = &parts[origin];
    if !origin_part.base_dir.is_empty() {
        let resolved = normalize_name(&resolve(&origin_part.base_dir, &normal_path));
        if let Some(found) = lookup(&resolved) {
            return Some(found);
        }
    }

    if check_referred && !origin_part.referred_base_dir.is_empty() {
        let referred = normalize_name(&resolve(&origin_part.referred_base_dir, &normal_path));
        if let Some(index) = parts.iter().position(|p| p.normal_location == referred) {
            return Some(Target {
                index,
                fragment: sharp_fragment,
            });
        }
    }

    None
}

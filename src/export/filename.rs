//! File names for bundle entries.

use std::collections::HashSet;

/// Longest file name produced by [`sanitize_filename_part`].
pub const MAX_FILENAME_LEN: usize = 150;

/// Replace every character outside `[A-Za-z0-9._@-]` with `_`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    // "." and ".." would name directories
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "unknown".to_string()
    } else {
        sanitized
    }
}

/// Longest extension taken over from a part's leaf name.
const MAX_EXTENSION_LEN: usize = 8;

/// Extension of `leaf_name` (`"png"` for `"logo.png"`), lowercased.
///
/// Only short ASCII alphanumeric extensions count.
pub fn leaf_extension(leaf_name: &str) -> Option<String> {
    let (_, ext) = leaf_name.rsplit_once('.')?;
    (!ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
    .then(|| ext.to_ascii_lowercase())
}

/// Usual file extension of a MIME type.
pub fn mimetype_extension(mimetype: &str) -> Option<&'static str> {
    let ext = match mimetype.to_ascii_lowercase().as_str() {
        "text/html" => "html",
        "application/xhtml+xml" => "xhtml",
        "text/css" => "css",
        "text/plain" => "txt",
        "text/xml" | "application/xml" => "xml",
        "text/javascript" | "application/javascript" | "application/x-javascript" => "js",
        "application/json" => "json",
        "image/png" => "png",
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/bmp" => "bmp",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        "application/pdf" => "pdf",
        "font/woff" | "application/font-woff" => "woff",
        "font/woff2" => "woff2",
        _ => return None,
    };
    Some(ext)
}

/// Hands out names that are unique within one bundle.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `name` as taken, e.g. for a file the bundle always writes.
    pub fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_ascii_lowercase());
    }

    /// `name`, or `stem_N.ext` with the first free `N` when `name` is taken.
    ///
    /// Names are compared case-insensitively so bundles survive
    /// case-insensitive file systems.
    pub fn allocate(&mut self, name: &str) -> String {
        if self.used.insert(name.to_ascii_lowercase()) {
            return name.to_string();
        }

        let (stem, ext) = match name.rfind('.') {
            Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
            _ => (name, ""),
        };
        let mut i = 1usize;
        loop {
            let candidate = format!("{stem}_{i}{ext}");
            if self.used.insert(candidate.to_ascii_lowercase()) {
                return candidate;
            }
            i += 1;
        }
    }
}

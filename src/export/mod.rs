//! Writing an extraction result to a directory as a browsable bundle.
//!
//! Every part becomes one file named after its reference name, with an
//! extension browsers recognize. References
//! between parts, which the extractor spelled `<base URI><ref name>`, are
//! relinked to `<link prefix><file name>` so the bundle works from disk.

pub mod filename;
pub mod manifest;

use std::path::{Path, PathBuf};

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, UnmhtError};
use crate::extract::{ExtractedPart, ExtractionResult, CID_BASE_URI};
use filename::{
    leaf_extension, mimetype_extension, sanitize_filename_part, NameAllocator, MAX_FILENAME_LEN,
};
use manifest::{Manifest, MANIFEST_NAME};

/// How a bundle is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Prefix of relinked references, e.g. `""` for sibling files.
    pub link_prefix: String,
    /// Write `manifest.json` next to the parts.
    pub write_manifest: bool,
    /// Name of an extra copy of the start part, empty for none.
    pub index_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            link_prefix: String::new(),
            write_manifest: true,
            index_name: "index.html".to_string(),
        }
    }
}

/// What [`write_bundle`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub files: usize,
    pub bytes: u64,
    /// File holding the start part.
    pub start_file: Option<String>,
    pub index_file: Option<PathBuf>,
    pub manifest_file: Option<PathBuf>,
}

/// Choose a file name for every part that has content of its own.
///
/// Multipart containers other than mixed ones get `None`.
pub fn plan_files(result: &ExtractionResult, options: &ExportOptions) -> Vec<Option<String>> {
    let mut names = NameAllocator::new();
    if !options.index_name.is_empty() {
        names.reserve(&options.index_name);
    }
    if options.write_manifest {
        names.reserve(MANIFEST_NAME);
    }

    result
        .parts
        .iter()
        .map(|p| (!p.is_multipart || p.is_mixed).then(|| names.allocate(&file_name(p))))
        .collect()
}

/// Extension for the file of `part`.
///
/// HTML and CSS always get one browsers render from disk. Other parts keep
/// the extension of their leaf name, else the usual one for their type.
fn file_extension(part: &ExtractedPart) -> Option<String> {
    let leaf = leaf_extension(&part.leaf_name);
    if part.is_html {
        let keep = matches!(leaf.as_deref(), Some("htm" | "html" | "xhtml" | "xht"));
        return Some(if keep {
            leaf.unwrap_or_default()
        } else {
            "html".to_string()
        });
    }
    if part.is_css {
        return Some("css".to_string());
    }
    leaf.or_else(|| mimetype_extension(&part.mimetype).map(str::to_string))
}

/// Sanitized reference name of `part` plus its extension.
fn file_name(part: &ExtractedPart) -> String {
    let Some(ext) = file_extension(part) else {
        return sanitize_filename_part(&part.ref_name, MAX_FILENAME_LEN);
    };
    let suffix = format!(".{ext}");
    let stem = sanitize_filename_part(&part.ref_name, MAX_FILENAME_LEN - suffix.len());
    if stem.to_ascii_lowercase().ends_with(&suffix) {
        stem
    } else {
        stem + &suffix
    }
}

/// Rewrite `<base URI><ref name>` to `<link prefix><file>` in `content`.
struct Relinker {
    pattern: Option<Regex>,
    targets: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Relinker {
    fn new(result: &ExtractionResult, files: &[Option<String>], link_prefix: &str) -> Self {
        let mut targets: Vec<(Vec<u8>, Vec<u8>)> = result
            .parts
            .iter()
            .zip(files)
            .filter_map(|(p, file)| {
                let file = file.as_ref()?;
                Some((
                    format!("{}{}", result.base_uri, p.ref_name).into_bytes(),
                    format!("{link_prefix}{file}").into_bytes(),
                ))
            })
            .collect();
        // Leftmost-first alternation: longer names must be tried first.
        targets.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let alternatives: Vec<String> = targets
            .iter()
            .map(|(from, _)| regex::escape(&String::from_utf8_lossy(from)))
            .collect();
        let pattern = if alternatives.is_empty() {
            None
        } else {
            Regex::new(&alternatives.join("|")).ok()
        };
        Self { pattern, targets }
    }

    fn relink(&self, content: &[u8]) -> Vec<u8> {
        let Some(pattern) = &self.pattern else {
            return content.to_vec();
        };
        pattern
            .replace_all(content, |caps: &regex::bytes::Captures<'_>| {
                let matched = &caps[0];
                self.targets
                    .iter()
                    .find(|(from, _)| from.as_slice() == matched)
                    .map_or_else(|| matched.to_vec(), |(_, to)| to.clone())
            })
            .into_owned()
    }
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data).map_err(|e| UnmhtError::io(path, e))
}

/// Write `result` into `dir`, creating it if needed.
///
/// `progress` is called with `(done, total)` as parts are written. In cid
/// mode references are left as `cid:` links.
pub fn write_bundle(
    result: &ExtractionResult,
    dir: &Path,
    options: &ExportOptions,
    progress: &dyn Fn(usize, usize),
) -> Result<ExportSummary> {
    if dir.exists() && !dir.is_dir() {
        return Err(UnmhtError::ExportError(format!(
            "{} exists and is not a directory",
            dir.display()
        )));
    }
    std::fs::create_dir_all(dir).map_err(|e| UnmhtError::io(dir, e))?;

    let files = plan_files(result, options);
    let relinker = (result.base_uri != CID_BASE_URI)
        .then(|| Relinker::new(result, &files, &options.link_prefix));

    let mut summary = ExportSummary::default();
    let total = result.parts.len();
    let mut start_content = None;

    for (i, (part, file)) in result.parts.iter().zip(&files).enumerate() {
        progress(i, total);
        let Some(file) = file else {
            continue;
        };

        let content = match &relinker {
            Some(r) if part.is_html || part.is_css => r.relink(&part.content),
            _ => part.content.clone(),
        };
        write_file(&dir.join(file), &content)?;
        tracing::debug!(file = %file, bytes = content.len(), "Wrote part");

        summary.files += 1;
        summary.bytes += content.len() as u64;
        if i == result.start {
            summary.start_file = Some(file.clone());
            start_content = Some(content);
        }
    }
    progress(total, total);

    if !options.index_name.is_empty() {
        if let Some(content) = &start_content {
            let path = dir.join(&options.index_name);
            write_file(&path, content)?;
            summary.files += 1;
            summary.bytes += content.len() as u64;
            summary.index_file = Some(path);
        }
    }

    if options.write_manifest {
        let json = Manifest::new(result, &files).to_json()?;
        let path = dir.join(MANIFEST_NAME);
        write_file(&path, json.as_bytes())?;
        summary.files += 1;
        summary.bytes += json.len() as u64;
        summary.manifest_file = Some(path);
    }

    tracing::info!(
        dir = %dir.display(),
        files = summary.files,
        bytes = summary.bytes,
        "Bundle written"
    );
    Ok(summary)
}

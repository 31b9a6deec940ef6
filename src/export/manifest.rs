//! `manifest.json`: what a bundle contains and where each part went.

use serde::{Deserialize, Serialize};

use crate::extract::ExtractionResult;

pub const MANIFEST_NAME: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub subject: String,
    /// RFC 3339.
    pub date: Option<String>,
    /// Reference name of the start part.
    pub start: String,
    pub base_uri: String,
    pub size: usize,
    pub parts: Vec<ManifestPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestPart {
    pub path: String,
    pub ref_name: String,
    /// File written for the part, `None` for containers.
    pub file: Option<String>,
    pub mimetype: String,
    pub charset: String,
    pub location: String,
    pub leaf_name: String,
    pub size: usize,
    pub is_start: bool,
}

impl Manifest {
    /// Describe `result`; `files[i]` is the file written for part `i`.
    pub fn new(result: &ExtractionResult, files: &[Option<String>]) -> Self {
        let parts = result
            .parts
            .iter()
            .zip(files)
            .map(|(p, file)| ManifestPart {
                path: p.path.clone(),
                ref_name: p.ref_name.clone(),
                file: file.clone(),
                mimetype: p.mimetype.clone(),
                charset: p.charset.clone(),
                location: p.location.clone(),
                leaf_name: p.leaf_name.clone(),
                size: p.content.len(),
                is_start: p.is_start_part,
            })
            .collect();

        Self {
            subject: result.subject.clone(),
            date: result.date.map(|d| d.to_rfc3339()),
            start: result.start_part().ref_name.clone(),
            base_uri: result.base_uri.clone(),
            size: result.size,
            parts,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

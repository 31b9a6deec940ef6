//! `unmht` — unpack MHT/MHTML web archives.
//!
//! This crate provides the core library for decoding a MIME web archive,
//! resolving the references between its parts, rewriting them to stable
//! reference names, and writing the result out as a browsable bundle.
//!
//! ```no_run
//! use unmht::extract::{ExtractOptions, Extractor};
//!
//! let data = std::fs::read("page.mht")?;
//! let result = Extractor::new(ExtractOptions::default()).extract("file:///page.mht", &data)?;
//! println!("{} parts, start page {}", result.parts.len(), result.start_part().ref_name);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod charset;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod model;
pub mod parser;
pub mod path;

pub use error::{Result, UnmhtError};
pub use extract::{ExtractOptions, ExtractionResult, Extractor};

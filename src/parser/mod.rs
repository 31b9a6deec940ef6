//! MIME message parsing: RFC 5322 header grammar, RFC 2045-2047 and 2231
//! field values, transfer decodings, `format=flowed` and multipart bodies.
//!
//! All productions run over raw bytes through the backtracking
//! [`engine::Cursor`]. Charset conversion is delegated to a
//! [`crate::charset::Transcoder`].

pub mod address;
pub mod base64;
pub mod date;
pub mod encoded_word;
pub mod engine;
pub mod flowed;
pub mod lexical;
pub mod message;
pub mod multipart;
pub mod params;
pub mod qp;

pub use message::decode_message;

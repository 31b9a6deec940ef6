//! Decoded message data: the part tree, structured parameters, and addresses.

pub mod address;
pub mod params;
pub mod part;

pub use address::Mailbox;
pub use params::MimeParams;
pub use part::{Fields, MimePart};

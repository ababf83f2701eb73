//! Codec layer for decryption and decompression.
//!
//! Pure data transformations with no knowledge of framing or content.
//!
//! # Submodules
//!
//! - [`crypto`][]: AES-256-CBC body decryption and the stream start check
//! - [`compression`][]: Gzip inflation of the reassembled payload

pub mod compression;
pub mod crypto;

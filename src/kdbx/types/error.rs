//! Custom error types for the kdbx-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
///
/// Each variant maps to exactly one pipeline stage, so callers can tell a wrong
/// master key apart from a damaged file or an unsupported layout.
#[derive(Debug, Error)]
pub enum KdbxError {
    /// An error originating from I/O operations on the byte source.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The master key does not have the length required by the cipher.
    #[error("Invalid master key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// The initialization vector from the header has the wrong length.
    #[error("Invalid IV length: expected {expected} bytes, got {actual}")]
    InvalidIvLength { expected: usize, actual: usize },

    /// The encrypted body is empty or not a whole number of cipher blocks.
    #[error("Encrypted body length {len} is not a positive multiple of the cipher block size")]
    InvalidBlockAlignment { len: usize },

    /// The decrypted body does not start with the expected stream start bytes.
    #[error("Database integrity check failed: wrong master key or corrupt file")]
    IntegrityCheckFailed,

    /// A hashed block's stored SHA-256 does not match its data.
    #[error("Hash mismatch. Database seems to be corrupt at block index {index}")]
    BlockHashMismatch { index: u32 },

    /// The hashed block stream ended in the middle of a field or block.
    #[error("Truncated frame while reading {context}: needed {needed} bytes, {remaining} remaining")]
    TruncatedFrame {
        context: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// The gzip payload could not be inflated.
    #[error("Decompression failed: {0}")]
    DecompressionError(String),

    /// The header declared a compression algorithm this crate does not know.
    #[error("Unsupported compression flag: {0}")]
    UnsupportedCompressionFlag(u32),

    /// The decompressed payload is not well-formed XML.
    #[error("Malformed content: {0}")]
    MalformedContent(String),
}

impl KdbxError {
    /// Returns `true` for failures that indicate a wrong key or a damaged file
    /// rather than a caller or configuration mistake.
    pub fn is_wrong_key_or_corrupt(&self) -> bool {
        matches!(
            self,
            Self::IntegrityCheckFailed
                | Self::BlockHashMismatch { .. }
                | Self::TruncatedFrame { .. }
                | Self::DecompressionError(_)
                | Self::MalformedContent(_)
        )
    }
}

/// A convenience `Result` type alias using the crate's `KdbxError` type.
pub type Result<T> = std::result::Result<T, KdbxError>;

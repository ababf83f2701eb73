//! Data model shared by the decode pipeline stages.

use std::fmt;

use zeroize::{Zeroize, Zeroizing};

use crate::kdbx::types::error::{KdbxError, Result};

/// Key length required by AES-256.
pub const MASTER_KEY_LEN: usize = 32;
/// AES block size, which is also the CBC IV length.
pub const CIPHER_BLOCK_LEN: usize = 16;
/// Length of the SHA-256 digest stored in every hashed block.
pub const BLOCK_HASH_LEN: usize = 32;

/// Symmetric key derived from the user's credentials.
///
/// The bytes are wiped when the key is dropped and never appear in `Debug` output.
#[derive(Clone)]
pub struct MasterKey(Zeroizing<Vec<u8>>);

impl MasterKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Zeroizing<Vec<u8>>> for MasterKey {
    fn from(bytes: Zeroizing<Vec<u8>>) -> Self {
        Self(bytes)
    }
}

/// Copies the array into the key and wipes this copy of it.
///
/// Arrays are `Copy`, so the caller's own binding is left for the caller to
/// zeroize.
impl From<[u8; MASTER_KEY_LEN]> for MasterKey {
    fn from(mut bytes: [u8; MASTER_KEY_LEN]) -> Self {
        let key = Self::new(bytes.to_vec());
        bytes.zeroize();
        key
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterKey(<{} bytes redacted>)", self.0.len())
    }
}

/// Compression applied to the payload before it was framed and encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionFlag {
    #[default]
    None,
    Gzip,
}

impl TryFrom<u32> for CompressionFlag {
    type Error = KdbxError;
    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Gzip),
            _ => Err(KdbxError::UnsupportedCompressionFlag(value)),
        }
    }
}

impl fmt::Display for CompressionFlag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompressionFlag::None => write!(f, "none"),
            CompressionFlag::Gzip => write!(f, "gzip"),
        }
    }
}

/// The header fields the body decoder depends on.
///
/// Produced by whatever parsed the signature and header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMetadata {
    pub encryption_iv: Vec<u8>,
    pub stream_start_bytes: Vec<u8>,
    pub compression: CompressionFlag,
}

impl HeaderMetadata {
    pub fn new(
        encryption_iv: impl Into<Vec<u8>>,
        stream_start_bytes: impl Into<Vec<u8>>,
        compression: CompressionFlag,
    ) -> Self {
        Self {
            encryption_iv: encryption_iv.into(),
            stream_start_bytes: stream_start_bytes.into(),
            compression,
        }
    }
}

/// When the decrypted remainder is treated as a hashed block stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramingPolicy {
    /// Every payload is framed, whatever the compression flag says.
    #[default]
    AlwaysFramed,
    /// Only gzip payloads are framed; uncompressed ones go straight to the
    /// content decoder.
    FramedWhenCompressed,
}

impl FramingPolicy {
    /// Whether a payload with the given compression goes through the reframer.
    pub fn is_framed(self, compression: CompressionFlag) -> bool {
        match self {
            FramingPolicy::AlwaysFramed => true,
            FramingPolicy::FramedWhenCompressed => compression == CompressionFlag::Gzip,
        }
    }
}

/// What to do when the hashed block stream ends without a zero-length block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminatorPolicy {
    /// A missing terminator is reported as a truncated frame.
    #[default]
    Required,
    /// Running out of input on a block boundary ends the stream.
    Optional,
}

/// Options controlling how a body is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    pub framing: FramingPolicy,
    pub terminator: TerminatorPolicy,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_framing(mut self, framing: FramingPolicy) -> Self {
        self.framing = framing;
        self
    }

    #[must_use]
    pub fn with_terminator(mut self, terminator: TerminatorPolicy) -> Self {
        self.terminator = terminator;
        self
    }
}

/// One framing unit of the hashed block stream, borrowed from the decrypted body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashedBlock<'a> {
    pub index: u32,
    pub hash: [u8; BLOCK_HASH_LEN],
    pub data: &'a [u8],
}

impl HashedBlock<'_> {
    /// A zero-length block ends the stream.
    pub fn is_terminator(&self) -> bool {
        self.data.is_empty()
    }
}

//! The body decode pipeline.
//!
//! ```text
//! ciphertext ─► decrypt ─► stream start check ─► reframe ─► decompress ─► XML
//! ```
//!
//! Each stage either hands an owned buffer to the next or fails, and the first
//! failure is returned unchanged. Intermediate buffers are wiped when dropped.

use log::{debug, info};
use zeroize::Zeroizing;

use crate::kdbx::codec::{compression, crypto};
use crate::kdbx::format::content::{self, DecodedContent};
use crate::kdbx::format::hashed_blocks;
use crate::kdbx::types::error::Result;
use crate::kdbx::types::models::{DecodeOptions, HeaderMetadata, MasterKey};

/// Runs every stage except content decoding and returns the payload bytes.
///
/// Useful for comparing payloads across compression settings or for dumping
/// the raw XML.
///
/// # Arguments
/// * `body` - Encrypted bytes following the header block
/// * `key` - Derived master key (32 bytes)
/// * `header` - IV, stream start bytes and compression flag from the header
/// * `options` - Framing and terminator policies
///
/// # Errors
/// Any error from decryption, the stream start check, reframing or decompression.
pub fn decode_payload(
    body: &[u8],
    key: &MasterKey,
    header: &HeaderMetadata,
    options: &DecodeOptions,
) -> Result<Zeroizing<Vec<u8>>> {
    debug!(
        "Decoding body: {} bytes, compression={}, framing={:?}",
        body.len(),
        header.compression,
        options.framing
    );

    let plaintext = crypto::decrypt_body(body, key, &header.encryption_iv)?;
    let remainder = crypto::verify_stream_start(&plaintext, &header.stream_start_bytes)?;

    let payload = if options.framing.is_framed(header.compression) {
        hashed_blocks::reframe(remainder, options.terminator)?
    } else {
        let unpadded = crypto::strip_padding(remainder)?;
        debug!("Payload is not framed, using {} bytes directly", unpadded.len());
        Zeroizing::new(unpadded.to_vec())
    };
    drop(plaintext);

    compression::maybe_decompress(payload, header.compression)
}

/// Decrypts, verifies, decompresses and parses an encrypted body.
///
/// # Errors
/// The first error raised by any stage; see [`KdbxError`](crate::KdbxError).
pub fn decode_body(
    body: &[u8],
    key: &MasterKey,
    header: &HeaderMetadata,
    options: &DecodeOptions,
) -> Result<DecodedContent> {
    info!("Decoding KDBX body ({} bytes)", body.len());
    let payload = decode_payload(body, key, header, options)?;
    let decoded = content::decode(&payload)?;
    info!(
        "KDBX body decoded: root <{}>, {} elements",
        decoded.root().name,
        decoded.element_count()
    );
    Ok(decoded)
}

//! # Hashed Block Stream
//!
//! After the stream start bytes, the payload is split into self-describing
//! blocks, each carrying the SHA-256 of its own data:
//!
//! ```text
//! ┌───────────┬──────────────┬────────────┬──────────────┐
//! │ index u32 │ sha256 [32]  │ length u32 │ data[length] │
//! └───────────┴──────────────┴────────────┴──────────────┘
//! ```
//!
//! Integers are little-endian. A block with length 0 ends the stream and
//! anything after it is ignored.
//!
//! Reframing runs in two passes. The first walks the block headers and checks
//! every declared length against the remaining input, so the output buffer can
//! be allocated once at its final size. The second verifies each block's hash
//! in encounter order and appends the data.

use log::{debug, trace, warn};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::kdbx::codec::crypto::ct_eq;
use crate::kdbx::types::error::{KdbxError, Result};
use crate::kdbx::types::models::{HashedBlock, TerminatorPolicy, BLOCK_HASH_LEN};
use crate::kdbx::utils::ByteCursor;

/// Splits the framed stream into its data blocks, stopping at the terminator.
///
/// Hashes are not checked here. The terminator is not included in the result.
///
/// # Errors
/// `TruncatedFrame` if a header field or a block's data runs past the end of
/// the input, or if the input ends without a terminator under
/// [`TerminatorPolicy::Required`].
pub fn parse_blocks(framed: &[u8], terminator: TerminatorPolicy) -> Result<Vec<HashedBlock<'_>>> {
    let mut cursor = ByteCursor::new(framed);
    let mut blocks = Vec::new();

    loop {
        if cursor.is_exhausted() {
            match terminator {
                TerminatorPolicy::Optional => {
                    debug!("Hashed block stream ended without terminator after {} blocks", blocks.len());
                    break;
                }
                TerminatorPolicy::Required => {
                    return Err(KdbxError::TruncatedFrame {
                        context: "terminator block",
                        needed: 4 + BLOCK_HASH_LEN + 4,
                        remaining: 0,
                    });
                }
            }
        }

        let index = cursor.read_u32_le("block index")?;
        let hash = cursor.read_array::<BLOCK_HASH_LEN>("block hash")?;
        let length = cursor.read_u32_le("block length")? as usize;

        if length == 0 {
            trace!(
                "Terminator block {} reached, {} trailing bytes ignored",
                index,
                cursor.remaining()
            );
            break;
        }

        let data = cursor.take(length, "block data")?;
        let expected_index = blocks.len() as u32;
        if index != expected_index {
            warn!("Hashed block index {} out of sequence, expected {}", index, expected_index);
        }
        trace!("Block {}: {} bytes", index, length);
        blocks.push(HashedBlock { index, hash, data });
    }

    Ok(blocks)
}

/// Verifies every block hash and concatenates the block data in order.
///
/// # Errors
/// - `TruncatedFrame` from [`parse_blocks`]
/// - `BlockHashMismatch` with the declared index of the first block whose data
///   does not hash to its stored digest
pub fn reframe(framed: &[u8], terminator: TerminatorPolicy) -> Result<Zeroizing<Vec<u8>>> {
    let blocks = parse_blocks(framed, terminator)?;
    let total: usize = blocks.iter().map(|b| b.data.len()).sum();

    let mut payload = Zeroizing::new(Vec::with_capacity(total));
    for block in &blocks {
        verify_block(block)?;
        payload.extend_from_slice(block.data);
    }

    debug!("Reassembled {} bytes from {} hashed blocks", payload.len(), blocks.len());
    Ok(payload)
}

fn verify_block(block: &HashedBlock<'_>) -> Result<()> {
    let actual = Sha256::digest(block.data);
    if !ct_eq(actual.as_slice(), &block.hash) {
        debug!("Hash mismatch in block {}", block.index);
        return Err(KdbxError::BlockHashMismatch { index: block.index });
    }
    Ok(())
}

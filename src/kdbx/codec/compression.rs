//! Decompression of the reassembled payload.
//!
//! KDBX bodies are either stored as-is (flag 0) or gzip compressed (flag 1).

use std::io::Read;

use flate2::read::GzDecoder;
use log::{debug, trace};
use zeroize::Zeroizing;

use crate::kdbx::types::error::{KdbxError, Result};
use crate::kdbx::types::models::CompressionFlag;

/// Inflates the payload when the header says it is compressed.
///
/// `None` hands the buffer back untouched. `Gzip` inflates the whole stream
/// into memory; the decoder is dropped before returning on every path.
///
/// # Errors
/// `DecompressionError` if the gzip stream is malformed or truncated.
pub fn maybe_decompress(
    payload: Zeroizing<Vec<u8>>,
    flag: CompressionFlag,
) -> Result<Zeroizing<Vec<u8>>> {
    match flag {
        CompressionFlag::None => {
            trace!("No compression, passing {} bytes through", payload.len());
            Ok(payload)
        }
        CompressionFlag::Gzip => {
            trace!("Decompressing with gzip: {} bytes in", payload.len());
            let inflated = gunzip(&payload)?;
            debug!("Gzip payload inflated: {} -> {} bytes", payload.len(), inflated.len());
            Ok(inflated)
        }
    }
}

fn gunzip(compressed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if compressed.is_empty() {
        return Err(KdbxError::DecompressionError("Empty gzip stream".to_string()));
    }
    let mut decoder = GzDecoder::new(compressed);
    let mut out = Zeroizing::new(Vec::with_capacity(compressed.len().saturating_mul(4)));
    decoder
        .read_to_end(&mut out)
        .map_err(|e| KdbxError::DecompressionError(format!("Gzip decompression failed: {}", e)))?;
    Ok(out)
}

//! Low-level byte reading utilities

use byteorder::{ByteOrder, LittleEndian};

use crate::kdbx::types::error::{KdbxError, Result};

/// Forward-only view over a byte slice.
///
/// Every read is bounds-checked and fails with `TruncatedFrame` naming the
/// field being read, instead of panicking on short input.
pub(crate) struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn take(&mut self, needed: usize, context: &'static str) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(KdbxError::TruncatedFrame { context, needed, remaining });
        }
        let out = &self.bytes[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(out)
    }

    pub(crate) fn read_u32_le(&mut self, context: &'static str) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4, context)?))
    }

    pub(crate) fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, context)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_fields_in_order() {
        let bytes = [0x01, 0x00, 0x00, 0x00, 0xFF, 0xEE, 0x10, 0x20];
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(cursor.read_u32_le("index").unwrap(), 1);
        assert_eq!(cursor.read_array::<2>("pair").unwrap(), [0xFF, 0xEE]);
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.take(2, "tail").unwrap(), &[0x10, 0x20]);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn short_read_reports_context() {
        let mut cursor = ByteCursor::new(&[0u8; 3]);
        match cursor.read_u32_le("block length") {
            Err(KdbxError::TruncatedFrame { context, needed, remaining }) => {
                assert_eq!(context, "block length");
                assert_eq!(needed, 4);
                assert_eq!(remaining, 3);
            }
            other => panic!("expected TruncatedFrame, got {other:?}"),
        }
    }
}

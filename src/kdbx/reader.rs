//! Decoding straight from a byte source.

use std::io::Read;

use log::trace;
use zeroize::Zeroizing;

use crate::kdbx::decoder;
use crate::kdbx::format::content::DecodedContent;
use crate::kdbx::types::error::Result;
use crate::kdbx::types::models::{DecodeOptions, HeaderMetadata, MasterKey};

/// Decodes the encrypted body read from `R`.
///
/// The source must already be positioned just past the header block. Decoding
/// consumes the decoder, so one source is never shared between two decodes.
///
/// ```no_run
/// use std::fs::File;
/// use kdbx_reader::{CompressionFlag, HeaderMetadata, KdbxDecoder, MasterKey};
///
/// # fn main() -> kdbx_reader::Result<()> {
/// let header = HeaderMetadata::new([0u8; 16], [0u8; 32], CompressionFlag::Gzip);
/// let key = MasterKey::new(vec![0u8; 32]);
/// let content = KdbxDecoder::new(File::open("body.bin")?).decode(&header, &key)?;
/// println!("{}", content.root().name);
/// # Ok(())
/// # }
/// ```
pub struct KdbxDecoder<R> {
    source: R,
    options: DecodeOptions,
}

impl<R: Read> KdbxDecoder<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            options: DecodeOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Reads the source to its end and runs the full pipeline.
    ///
    /// # Errors
    /// `Io` if reading fails, otherwise whatever [`decode_body`](crate::decode_body) returns.
    pub fn decode(self, header: &HeaderMetadata, key: &MasterKey) -> Result<DecodedContent> {
        let options = self.options;
        let body = self.read_body()?;
        decoder::decode_body(&body, key, header, &options)
    }

    /// Like [`decode`](Self::decode) but stops before parsing the XML.
    pub fn decode_payload(self, header: &HeaderMetadata, key: &MasterKey) -> Result<Zeroizing<Vec<u8>>> {
        let options = self.options;
        let body = self.read_body()?;
        decoder::decode_payload(&body, key, header, &options)
    }

    fn read_body(mut self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        self.source.read_to_end(&mut body)?;
        trace!("Read {} body bytes from source", body.len());
        Ok(body)
    }
}

//! Core KDBX body decoding module

pub mod codec;
pub mod format;
pub mod types;
mod decoder;
mod reader;
mod utils;

pub use decoder::{decode_body, decode_payload};
pub use reader::KdbxDecoder;
pub use types::error::{KdbxError, Result};

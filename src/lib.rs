//! # kdbx-reader
//!
//! Decrypts and decodes the body of KDBX-style password database containers.
//!
//! The body that follows the signature and header block is AES-256-CBC encrypted,
//! prefixed with known "stream start bytes", split into SHA-256 verified hashed
//! blocks, optionally gzip compressed, and finally XML. This crate runs that
//! pipeline given the header fields and an already-derived master key.
//!
//! **Note:** Header parsing and key derivation are left to the caller.
pub mod kdbx;

// Re-export the main types for convenience
pub use kdbx::{
    decode_body,
    decode_payload,
    KdbxDecoder,
    types::{
        error::{KdbxError, Result},
        models::{
            CompressionFlag,
            DecodeOptions,
            FramingPolicy,
            HeaderMetadata,
            MasterKey,
            TerminatorPolicy,
        },
    },
    format::content::{DecodedContent, Element, Node},
};

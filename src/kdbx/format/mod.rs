//! Format parsing layer for the decrypted KDBX body.
//!
//! Sits between the `codec` primitives and the pipeline in `decoder`.
//!
//! # Module Organization
//!
//! - [`hashed_blocks`]: Verifies and strips the hashed block framing
//! - [`content`]: Parses the XML payload into an owned tree
//!
//! # Architecture
//!
//! ```text
//! Decrypted body:
//! ┌──────────────────────┐
//! │  Stream start bytes  │ ← codec::crypto::verify_stream_start()
//! ├──────────────────────┤
//! │  Hashed block 0      │ ← hashed_blocks::reframe()
//! │  Hashed block 1      │
//! │  ...                 │
//! │  Terminator (len 0)  │
//! ├──────────────────────┤
//! │  Ignored trailer     │
//! └──────────────────────┘
//!            │
//!            ▼  codec::compression::maybe_decompress()
//!      XML payload        ← content::decode()
//! ```

pub mod content;
pub mod hashed_blocks;

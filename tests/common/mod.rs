//! Fixture builders: produce encrypted bodies the way a KDBX 3.x writer does.
#![allow(dead_code)]

use std::io::Write;

use aes::Aes256;
use cbc::Encryptor;
use cipher::block_padding::{NoPadding, Pkcs7};
use cipher::{BlockEncryptMut, KeyIvInit};
use flate2::write::GzEncoder;
use flate2::Compression;
use kdbx_reader::{CompressionFlag, HeaderMetadata, MasterKey};
use sha2::{Digest, Sha256};

pub const KEY: [u8; 32] = [
    0x3c, 0x91, 0x5e, 0x07, 0xa2, 0x6b, 0xd4, 0x18, 0x7f, 0x20, 0xc5, 0x9e, 0x41, 0x0a, 0xb3, 0x66,
    0xe8, 0x15, 0x52, 0xfd, 0x09, 0x77, 0x3a, 0xcc, 0x84, 0x2e, 0x6f, 0xb0, 0x1d, 0x93, 0x58, 0xe1,
];

pub const IV: [u8; 16] = [
    0x10, 0x32, 0x54, 0x76, 0x98, 0xba, 0xdc, 0xfe, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef,
];

pub const START_BYTES: [u8; 32] = [
    0xa5, 0x5a, 0x0f, 0xf0, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc,
    0xdd, 0xee, 0xff, 0x00, 0x13, 0x37, 0xc0, 0xde, 0xfa, 0xce, 0xb0, 0x0c, 0x42, 0x24, 0x81, 0x18,
];

pub const SAMPLE_XML: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>
<KeePassFile>
    <Meta>
        <Generator>KeePass</Generator>
        <DatabaseName>Fixture</DatabaseName>
    </Meta>
    <Root>
        <Group>
            <Name>General</Name>
            <Entry>
                <String><Key>Title</Key><Value>Mail &amp; Calendar</Value></String>
                <String><Key>Password</Key><Value Protected="True">cGFzc3dvcmQ=</Value></String>
            </Entry>
        </Group>
    </Root>
</KeePassFile>"#;

pub fn master_key() -> MasterKey {
    MasterKey::from(KEY)
}

pub fn header(compression: CompressionFlag) -> HeaderMetadata {
    HeaderMetadata::new(IV, START_BYTES, compression)
}

pub fn hashed_block(index: u32, data: &[u8]) -> Vec<u8> {
    let mut out = index.to_le_bytes().to_vec();
    out.extend_from_slice(&Sha256::digest(data));
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    out
}

pub fn terminator_block(index: u32) -> Vec<u8> {
    let mut out = index.to_le_bytes().to_vec();
    out.extend_from_slice(&[0u8; 32]);
    out.extend_from_slice(&0u32.to_le_bytes());
    out
}

/// Splits `payload` into hashed blocks of `block_size` bytes and appends the terminator.
pub fn frame(payload: &[u8], block_size: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut index = 0u32;
    for chunk in payload.chunks(block_size) {
        out.extend(hashed_block(index, chunk));
        index += 1;
    }
    out.extend(terminator_block(index));
    out
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// AES-256-CBC with PKCS#7 padding, as KeePass writes the body.
pub fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let mut buf = plaintext.to_vec();
    buf.resize(plaintext.len() + 16, 0);
    let ciphertext = Encryptor::<Aes256>::new_from_slices(key, iv)
        .unwrap()
        .encrypt_padded_mut::<Pkcs7>(&mut buf, plaintext.len())
        .unwrap();
    ciphertext.to_vec()
}

/// AES-256-CBC without padding; `plaintext` must already be block aligned.
pub fn encrypt_unpadded(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Vec<u8> {
    assert_eq!(plaintext.len() % 16, 0, "plaintext must be block aligned");
    let mut buf = plaintext.to_vec();
    let len = buf.len();
    Encryptor::<Aes256>::new_from_slices(key, iv)
        .unwrap()
        .encrypt_padded_mut::<NoPadding>(&mut buf, len)
        .unwrap();
    buf
}

/// Stream start bytes followed by `rest`, encrypted with the fixture key and IV.
pub fn seal(rest: &[u8]) -> Vec<u8> {
    let mut plaintext = START_BYTES.to_vec();
    plaintext.extend_from_slice(rest);
    encrypt(&KEY, &IV, &plaintext)
}

/// A complete framed body for `xml`, compressed when `compression` asks for it.
pub fn framed_body(xml: &[u8], compression: CompressionFlag, block_size: usize) -> Vec<u8> {
    let payload = match compression {
        CompressionFlag::None => xml.to_vec(),
        CompressionFlag::Gzip => gzip(xml),
    };
    seal(&frame(&payload, block_size))
}

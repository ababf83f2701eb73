//! Body decryption and the stream start integrity check.
//!
//! KDBX 3.x encrypts the whole body with AES-256 in CBC mode. The plaintext is
//! kept at its full ciphertext length here. A framed payload stops at its
//! terminator block, so the padding is only stripped for unframed payloads.

use aes::Aes256;
use cbc::Decryptor;
use cipher::block_padding::NoPadding;
use cipher::{BlockDecryptMut, KeyIvInit};
use log::{debug, trace};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::kdbx::types::error::{KdbxError, Result};
use crate::kdbx::types::models::{MasterKey, CIPHER_BLOCK_LEN, MASTER_KEY_LEN};

/// Decrypts the encrypted body into a fresh buffer of identical length.
///
/// No padding is removed and nothing about the plaintext is validated.
///
/// # Errors
/// - `InvalidKeyLength` if the key is not 32 bytes
/// - `InvalidIvLength` if the IV is not 16 bytes
/// - `InvalidBlockAlignment` if the body is empty or not a multiple of 16 bytes
pub fn decrypt_body(body: &[u8], key: &MasterKey, iv: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if key.len() != MASTER_KEY_LEN {
        return Err(KdbxError::InvalidKeyLength {
            expected: MASTER_KEY_LEN,
            actual: key.len(),
        });
    }
    if iv.len() != CIPHER_BLOCK_LEN {
        return Err(KdbxError::InvalidIvLength {
            expected: CIPHER_BLOCK_LEN,
            actual: iv.len(),
        });
    }
    if body.is_empty() || body.len() % CIPHER_BLOCK_LEN != 0 {
        return Err(KdbxError::InvalidBlockAlignment { len: body.len() });
    }

    trace!("Decrypting {} bytes ({} cipher blocks)", body.len(), body.len() / CIPHER_BLOCK_LEN);

    let mut plaintext = Zeroizing::new(body.to_vec());
    let decryptor = Decryptor::<Aes256>::new_from_slices(key.as_bytes(), iv).map_err(|_| {
        KdbxError::InvalidKeyLength {
            expected: MASTER_KEY_LEN,
            actual: key.len(),
        }
    })?;
    decryptor
        .decrypt_padded_mut::<NoPadding>(&mut plaintext[..])
        .map_err(|_| KdbxError::InvalidBlockAlignment { len: body.len() })?;

    debug!("Decrypted body: {} bytes", plaintext.len());
    Ok(plaintext)
}

/// Checks that the plaintext starts with the header's stream start bytes and
/// returns what follows them.
///
/// The comparison runs in constant time over the prefix length.
///
/// # Errors
/// `IntegrityCheckFailed` if the plaintext is shorter than the prefix or differs from it.
/// This is what a wrong master key looks like.
pub fn verify_stream_start<'a>(plaintext: &'a [u8], expected: &[u8]) -> Result<&'a [u8]> {
    if plaintext.len() < expected.len() {
        debug!(
            "Plaintext ({} bytes) shorter than stream start bytes ({} bytes)",
            plaintext.len(),
            expected.len()
        );
        return Err(KdbxError::IntegrityCheckFailed);
    }

    let (prefix, remainder) = plaintext.split_at(expected.len());
    if !ct_eq(prefix, expected) {
        debug!("Stream start bytes mismatch");
        return Err(KdbxError::IntegrityCheckFailed);
    }

    trace!("Stream start bytes verified, {} bytes follow", remainder.len());
    Ok(remainder)
}

/// Removes the PKCS#7 padding KeePass appends before encrypting the body.
///
/// Only needed when the payload is not framed; a framed payload ends at its
/// terminator block and the padding is never reached.
///
/// # Errors
/// `IntegrityCheckFailed` if the input is empty, the pad length is outside
/// 1..=16 or longer than the input, or the pad bytes differ.
pub fn strip_padding(remainder: &[u8]) -> Result<&[u8]> {
    let pad_len = match remainder.last() {
        Some(&last) => last as usize,
        None => {
            debug!("No padding present after stream start bytes");
            return Err(KdbxError::IntegrityCheckFailed);
        }
    };
    if pad_len == 0 || pad_len > CIPHER_BLOCK_LEN || pad_len > remainder.len() {
        debug!("Invalid padding length {}", pad_len);
        return Err(KdbxError::IntegrityCheckFailed);
    }

    let (data, padding) = remainder.split_at(remainder.len() - pad_len);
    let expected = [pad_len as u8; CIPHER_BLOCK_LEN];
    if !ct_eq(padding, &expected[..pad_len]) {
        debug!("Padding bytes do not match pad length {}", pad_len);
        return Err(KdbxError::IntegrityCheckFailed);
    }

    trace!("Stripped {} padding bytes", pad_len);
    Ok(data)
}

pub(crate) fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    bool::from(a.ct_eq(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nist_key() -> MasterKey {
        MasterKey::new(
            hex::decode("603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4").unwrap(),
        )
    }

    fn nist_iv() -> Vec<u8> {
        hex::decode("000102030405060708090a0b0c0d0e0f").unwrap()
    }

    #[test]
    fn decrypts_nist_sp800_38a_aes256_cbc_vector() {
        let ciphertext = hex::decode(
            "f58c4c04d6e5f1ba779eabfb5f7bfbd69cfc4e967edb808d679f777bc6702c7d\
             39f23369a9d9bacfa530e26304231461b2eb05e2c39be9fcda6c19078c6a9d1b",
        )
        .unwrap();
        let expected = hex::decode(
            "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51\
             30c81c46a35ce411e5fbc1191a0a52eff69f2445df4f9b17ad2b417be66c3710",
        )
        .unwrap();

        let plaintext = decrypt_body(&ciphertext, &nist_key(), &nist_iv()).unwrap();
        assert_eq!(plaintext.as_slice(), expected.as_slice());
    }

    #[test]
    fn rejects_short_key_before_touching_body() {
        let err = decrypt_body(&[0u8; 16], &MasterKey::new(vec![0u8; 16]), &nist_iv()).unwrap_err();
        assert!(matches!(err, KdbxError::InvalidKeyLength { expected: 32, actual: 16 }));
    }

    #[test]
    fn rejects_bad_iv_length() {
        let err = decrypt_body(&[0u8; 16], &nist_key(), &[0u8; 8]).unwrap_err();
        assert!(matches!(err, KdbxError::InvalidIvLength { expected: 16, actual: 8 }));
    }

    #[test]
    fn rejects_misaligned_and_empty_bodies() {
        for len in [0usize, 1, 15, 17, 33] {
            let err = decrypt_body(&vec![0u8; len], &nist_key(), &nist_iv()).unwrap_err();
            assert!(
                matches!(err, KdbxError::InvalidBlockAlignment { len: l } if l == len),
                "len {len}: {err:?}"
            );
        }
    }

    #[test]
    fn stream_start_returns_remainder() {
        let plaintext = [3u8, 0, 0, 0, b'r', b'e', b's', b't'];
        let rest = verify_stream_start(&plaintext, &[3, 0, 0, 0]).unwrap();
        assert_eq!(rest, b"rest");
    }

    #[test]
    fn stream_start_mismatch_and_short_input_fail() {
        assert!(matches!(
            verify_stream_start(&[3, 0, 0, 1, 9], &[3, 0, 0, 0]),
            Err(KdbxError::IntegrityCheckFailed)
        ));
        assert!(matches!(
            verify_stream_start(&[3, 0], &[3, 0, 0, 0]),
            Err(KdbxError::IntegrityCheckFailed)
        ));
    }

    #[test]
    fn strip_padding_removes_pkcs7_tail() {
        assert_eq!(strip_padding(b"<a/>\x03\x03\x03").unwrap(), b"<a/>");
        assert_eq!(strip_padding(&[0x10; 16]).unwrap(), b"");
        assert_eq!(strip_padding(b"x\x01").unwrap(), b"x");
    }

    #[test]
    fn strip_padding_rejects_bad_pads() {
        let cases: &[&[u8]] = &[
            b"",
            b"<a/>\x00",
            b"<a/>",
            b"<a/>\x11",
            b"\x05\x05\x05",
            b"<a/>\x02\x03\x03",
        ];
        for case in cases {
            assert!(
                matches!(strip_padding(case), Err(KdbxError::IntegrityCheckFailed)),
                "{case:?}"
            );
        }
    }

    #[test]
    fn ct_eq_matches_plain_equality() {
        assert!(ct_eq(b"", b""));
        assert!(ct_eq(b"abc", b"abc"));
        assert!(!ct_eq(b"abc", b"abd"));
        assert!(!ct_eq(b"abc", b"ab"));
    }
}

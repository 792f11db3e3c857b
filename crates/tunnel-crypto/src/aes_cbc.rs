//! AES-256-CBC with PKCS#7 padding.
//!
//! The key doubles as the IV: the first [`aes::Aes256`] block size (16
//! bytes) of the 32-byte key is reused as the CBC initialization vector.
//! This is a deliberate simplification inherited from the original
//! protocol and must be reproduced exactly, not "fixed", or peers running
//! the unmodified implementation will fail to decrypt.

use crate::{CryptoError, AES_KEY_LEN};
use aes::Aes256;
use cbc::{Decryptor, Encryptor};
use cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

type Aes256CbcEnc = Encryptor<Aes256>;
type Aes256CbcDec = Decryptor<Aes256>;

fn iv_from_key(key: &[u8]) -> &[u8] {
    &key[..16]
}

/// Encrypt `plaintext` under `key`, padding with PKCS#7.
pub fn aes_encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key.len() != AES_KEY_LEN {
        return Err(CryptoError::BadKeyLen(key.len()));
    }
    let iv = iv_from_key(key);
    Ok(Aes256CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypt `ciphertext` under `key`, stripping PKCS#7 padding.
///
/// Any failure (wrong key, truncated ciphertext, bad padding) collapses
/// into [`CryptoError::DecryptFail`] so callers can't distinguish attack
/// attempts from corruption.
pub fn aes_decrypt(key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key.len() != AES_KEY_LEN {
        return Err(CryptoError::BadKeyLen(key.len()));
    }
    let iv = iv_from_key(key);
    Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::DecryptFail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> [u8; 32] {
        let mut k = [0u8; 32];
        for (i, b) in k.iter_mut().enumerate() {
            *b = i as u8;
        }
        k
    }

    #[test]
    fn round_trips_arbitrary_payloads() {
        for len in [0usize, 1, 15, 16, 17, 1024, 4096] {
            let data = vec![0xABu8; len];
            let ct = aes_encrypt(&key(), &data).unwrap();
            let pt = aes_decrypt(&key(), &ct).unwrap();
            assert_eq!(pt, data, "len={len}");
        }
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let ct = aes_encrypt(&key(), b"hello world").unwrap();
        let mut other = key();
        other[0] ^= 0xFF;
        assert!(matches!(aes_decrypt(&other, &ct), Err(CryptoError::DecryptFail)));
    }
}

//! RSA/PKCS#1 v1.5 chunked encrypt/decrypt.
//!
//! PKCS#1 v1.5 can only encrypt messages up to `key_size_bytes - 11`
//! bytes at a time. Longer payloads (the handshake's JSON metadata) are
//! split into chunks, each encrypted independently, and the ciphertext
//! chunks (each exactly `key_size_bytes` long) are concatenated.

use crate::CryptoError;
use rand::rngs::OsRng;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

fn key_size_bytes(n_bits: usize) -> usize {
    n_bits / 8
}

/// Encrypt `plaintext`, chunking into `key_size_bytes - 11`-byte blocks.
pub fn rsa_encrypt(pubkey: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let n_bits = pubkey.size() * 8;
    let chunk_len = key_size_bytes(n_bits) - 11;
    let mut out = Vec::with_capacity(plaintext.len() + 11 * plaintext.len() / chunk_len.max(1) + 11);
    let mut rng = OsRng;

    if plaintext.is_empty() {
        let ct = pubkey.encrypt(&mut rng, Pkcs1v15Encrypt, &[])?;
        out.extend_from_slice(&ct);
        return Ok(out);
    }

    for chunk in plaintext.chunks(chunk_len) {
        let ct = pubkey.encrypt(&mut rng, Pkcs1v15Encrypt, chunk)?;
        out.extend_from_slice(&ct);
    }
    Ok(out)
}

/// Decrypt `ciphertext`, chunking into `key_size_bytes`-byte blocks.
pub fn rsa_decrypt(privkey: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let chunk_len = privkey.size();
    if chunk_len == 0 || ciphertext.len() % chunk_len != 0 {
        return Err(CryptoError::DecryptFail);
    }

    let mut out = Vec::with_capacity(ciphertext.len());
    for chunk in ciphertext.chunks(chunk_len) {
        let pt = privkey
            .decrypt(Pkcs1v15Encrypt, chunk)
            .map_err(|_| CryptoError::DecryptFail)?;
        out.extend_from_slice(&pt);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;

    fn test_keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let mut rng = OsRng;
        let sk = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let pk = RsaPublicKey::from(&sk);
        (sk, pk)
    }

    #[test]
    fn round_trips_payloads_larger_than_one_block() {
        let (sk, pk) = test_keypair();
        let payload = vec![0x5Au8; 500];
        let ct = rsa_encrypt(&pk, &payload).unwrap();
        let pt = rsa_decrypt(&sk, &ct).unwrap();
        assert_eq!(pt, payload);
    }

    #[test]
    fn round_trips_empty_payload() {
        let (sk, pk) = test_keypair();
        let ct = rsa_encrypt(&pk, &[]).unwrap();
        let pt = rsa_decrypt(&sk, &ct).unwrap();
        assert!(pt.is_empty());
    }
}

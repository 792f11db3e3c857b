//! Base64 envelope around the AES and RSA primitives. Every control-plane
//! line on the wire is one of these two envelopes.

use crate::{aes_decrypt, aes_encrypt, rsa_decrypt, rsa_encrypt, CryptoError};
use base64::{engine::general_purpose::STANDARD, Engine};
use rsa::{RsaPrivateKey, RsaPublicKey};

pub fn aes_encrypt_b64(key: &[u8], plaintext: &[u8]) -> Result<String, CryptoError> {
    Ok(STANDARD.encode(aes_encrypt(key, plaintext)?))
}

pub fn aes_decrypt_b64(key: &[u8], envelope: &str) -> Result<Vec<u8>, CryptoError> {
    let raw = STANDARD.decode(envelope.trim())?;
    aes_decrypt(key, &raw)
}

pub fn rsa_encrypt_b64(pubkey: &RsaPublicKey, plaintext: &[u8]) -> Result<String, CryptoError> {
    Ok(STANDARD.encode(rsa_encrypt(pubkey, plaintext)?))
}

pub fn rsa_decrypt_b64(privkey: &RsaPrivateKey, envelope: &str) -> Result<Vec<u8>, CryptoError> {
    let raw = STANDARD.decode(envelope.trim())?;
    rsa_decrypt(privkey, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn aes_envelope_round_trips() {
        let key = [7u8; 32];
        let env = aes_encrypt_b64(&key, b"{\"a\":1}").unwrap();
        assert!(!env.contains('\n'));
        let back = aes_decrypt_b64(&key, &env).unwrap();
        assert_eq!(back, b"{\"a\":1}");
    }

    #[test]
    fn rsa_envelope_round_trips() {
        let sk = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let pk = RsaPublicKey::from(&sk);
        let env = rsa_encrypt_b64(&pk, b"session-key-material").unwrap();
        let back = rsa_decrypt_b64(&sk, &env).unwrap();
        assert_eq!(back, b"session-key-material");
    }

    #[test]
    fn bad_base64_fails() {
        let key = [1u8; 32];
        assert!(matches!(aes_decrypt_b64(&key, "not base64!!"), Err(CryptoError::Base64(_))));
    }
}

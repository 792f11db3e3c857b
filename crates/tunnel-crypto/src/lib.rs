//! Crypto primitives for the control and handshake protocol.
//!
//! * RSA/PKCS#1 v1.5, chunked, used once per tunnel session to carry the
//!   AES key from client to server.
//! * AES-256-CBC/PKCS#7 for every message after that, keyed by a 32-byte
//!   shared secret. The construction reuses the key's first block as the
//!   IV rather than carrying an explicit one; this is weak but must be
//!   reproduced exactly for interoperability with existing deployments.
//! * A Base64 envelope wraps every ciphertext before it goes on the wire.

pub mod aes_cbc;
pub mod envelope;
pub mod keys;
pub mod rsa_chunked;

pub use aes_cbc::{aes_decrypt, aes_encrypt};
pub use envelope::{aes_decrypt_b64, aes_encrypt_b64, rsa_decrypt_b64, rsa_encrypt_b64};
pub use keys::{generate_keypair, load_private_key, load_public_key, RsaKeyPair};
pub use rsa_chunked::{rsa_decrypt, rsa_encrypt};

use thiserror::Error;

/// Size of the shared AES session key in bytes.
pub const AES_KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("DECRYPT_FAIL")]
    DecryptFail,
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("rsa error: {0}")]
    Rsa(#[from] rsa::Error),
    #[error("rsa key encoding error: {0}")]
    Pkcs8Spki(#[from] pkcs8::spki::Error),
    #[error("pkcs8 error: {0}")]
    Pkcs8(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("key must be {AES_KEY_LEN} bytes, got {0}")]
    BadKeyLen(usize),
}

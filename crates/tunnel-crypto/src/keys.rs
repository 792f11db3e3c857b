//! RSA key-pair generation and the three-file on-disk layout used by
//! `pTunnelGenRSAKey`: `PrivateKey.pem` (PKCS#8), `PublicKey.pem`
//! (SubjectPublicKeyInfo), and `NBits.txt` (decimal ASCII key length).

use crate::CryptoError;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKeyPem, DecodePublicKeyPem, EncodePrivateKeyPem, EncodePublicKeyPem, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::path::Path;

pub struct RsaKeyPair {
    pub private: RsaPrivateKey,
    pub public: RsaPublicKey,
    pub n_bits: usize,
}

/// Generate a fresh RSA key pair of the given modulus size.
pub fn generate_keypair(n_bits: usize) -> Result<RsaKeyPair, CryptoError> {
    let private = RsaPrivateKey::new(&mut OsRng, n_bits)?;
    let public = RsaPublicKey::from(&private);
    Ok(RsaKeyPair { private, public, n_bits })
}

impl RsaKeyPair {
    /// Write `PrivateKey.pem`, `PublicKey.pem`, and `NBits.txt` into `dir`.
    pub fn write_to_dir(&self, dir: &Path) -> Result<(), CryptoError> {
        std::fs::create_dir_all(dir)?;

        let private_pem = self
            .private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::Pkcs8(e.to_string()))?;
        std::fs::write(dir.join("PrivateKey.pem"), private_pem.as_bytes())?;

        let public_pem = self
            .public
            .to_public_key_pem(LineEnding::LF)
            .map_err(CryptoError::Pkcs8Spki)?;
        std::fs::write(dir.join("PublicKey.pem"), public_pem.as_bytes())?;

        std::fs::write(dir.join("NBits.txt"), self.n_bits.to_string())?;
        Ok(())
    }
}

/// Load a PKCS#8 PEM-encoded private key from a file.
pub fn load_private_key(path: &Path) -> Result<RsaPrivateKey, CryptoError> {
    let pem = std::fs::read_to_string(path)?;
    RsaPrivateKey::from_pkcs8_pem(&pem).map_err(|e| CryptoError::Pkcs8(e.to_string()))
}

/// Load a SubjectPublicKeyInfo PEM-encoded public key from a file.
pub fn load_public_key(path: &Path) -> Result<RsaPublicKey, CryptoError> {
    let pem = std::fs::read_to_string(path)?;
    RsaPublicKey::from_public_key_pem(&pem).map_err(CryptoError::Pkcs8Spki)
}

/// Read the decimal `NBits.txt` sibling of a key pair directory.
pub fn load_n_bits(path: &Path) -> Result<usize, CryptoError> {
    let s = std::fs::read_to_string(path)?;
    s.trim()
        .parse()
        .map_err(|_| CryptoError::Pkcs8("NBits.txt does not contain a decimal integer".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_reloads_a_keypair() {
        let dir = tempdir();
        let pair = generate_keypair(1024).unwrap();
        pair.write_to_dir(&dir).unwrap();

        let reloaded_private = load_private_key(&dir.join("PrivateKey.pem")).unwrap();
        let reloaded_public = load_public_key(&dir.join("PublicKey.pem")).unwrap();
        let n_bits = load_n_bits(&dir.join("NBits.txt")).unwrap();

        assert_eq!(n_bits, 1024);
        assert_eq!(reloaded_private.to_public_key(), pair.public);
        assert_eq!(reloaded_public, pair.public);

        std::fs::remove_dir_all(&dir).ok();
    }

    fn tempdir() -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("ptunnel-keytest-{}", std::process::id()));
        p
    }
}

//! Two-way safety handshake that opens every data-plane tunnel. Both
//! sides already share the session's AES key (carried over the control
//! plane during registration or rendezvous); this exchange proves it
//! before either side trusts the socket with real traffic.
//!
//! The client sends `{SecretKey, Salt}` AES-encrypted with the shared
//! key; the server checks `SecretKey` against its own copy and echoes
//! an analogous line back. Either side aborts on any mismatch rather
//! than falling back to the older one-way form.

use rand::RngCore;
use tunnel_crypto::{aes_decrypt_b64, aes_encrypt_b64};
use tunnel_proto::metadata::keys;
use tunnel_proto::Metadata;
use tunnel_transport::Socket;

use crate::DataplaneError;

const SALT_LEN: usize = 16;

fn random_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    hex::encode(salt)
}

/// Client side: send the safety-check line and require a matching echo.
pub async fn client_handshake(
    socket: &mut dyn Socket,
    secret_key: &[u8],
) -> Result<(), DataplaneError> {
    let secret_hex = hex::encode(secret_key);
    let mut out = Metadata::new();
    out.set(keys::SECRET_KEY, secret_hex.clone());
    out.set(keys::SALT, random_salt());
    let line = aes_encrypt_b64(secret_key, out.to_json()?.as_bytes())?;
    socket.write_line(&line).await?;

    let reply = socket.read_line().await?;
    let plaintext = aes_decrypt_b64(secret_key, &reply)?;
    let meta = Metadata::from_json(std::str::from_utf8(&plaintext)?)?;
    if meta.get_str(keys::SECRET_KEY)? != secret_hex {
        return Err(DataplaneError::SafetyCheckFailed);
    }
    Ok(())
}

/// Server side: verify the client's line against `expected_key`, then
/// echo an analogous line back.
pub async fn server_handshake(
    socket: &mut dyn Socket,
    expected_key: &[u8],
) -> Result<(), DataplaneError> {
    let line = socket.read_line().await?;
    let plaintext = aes_decrypt_b64(expected_key, &line)?;
    let meta = Metadata::from_json(std::str::from_utf8(&plaintext)?)?;
    let expected_hex = hex::encode(expected_key);
    if meta.get_str(keys::SECRET_KEY)? != expected_hex {
        return Err(DataplaneError::SafetyCheckFailed);
    }

    let mut out = Metadata::new();
    out.set(keys::SECRET_KEY, expected_hex);
    out.set(keys::SALT, random_salt());
    let reply = aes_encrypt_b64(expected_key, out.to_json()?.as_bytes())?;
    socket.write_line(&reply).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunnel_transport::tcp::{TcpListener, TcpSocket};
    use tunnel_transport::Listener;

    #[tokio::test]
    async fn two_way_handshake_succeeds_with_matching_keys() {
        let mut listener = TcpListener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr();
        let key = [9u8; 32];

        let server = tokio::spawn(async move {
            let mut socket = listener.accept().await.unwrap();
            server_handshake(socket.as_mut(), &key).await
        });

        let mut client = TcpSocket::dial(addr).await.unwrap();
        let client_res = client_handshake(&mut client, &key).await;

        assert!(client_res.is_ok());
        assert!(server.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn mismatched_key_is_rejected() {
        let mut listener = TcpListener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr();

        let server = tokio::spawn(async move {
            let mut socket = listener.accept().await.unwrap();
            server_handshake(socket.as_mut(), &[1u8; 32]).await
        });

        let mut client = TcpSocket::dial(addr).await.unwrap();
        let client_res = client_handshake(&mut client, &[2u8; 32]).await;

        assert!(client_res.is_err());
        assert!(server.await.unwrap().is_err());
    }
}

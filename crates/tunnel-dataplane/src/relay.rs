//! Bidirectional relay between a tunnel socket and the paired
//! application socket, run only once [`crate::handshake`] has passed.
//!
//! Two concurrent copy tasks run per pair; whichever hits a read/write
//! error first closes both sockets, which unblocks the other
//! (pair-close).

use tunnel_transport::{BoxedSocket, Socket};

use crate::DataplaneError;

const SCRATCH_LEN: usize = 10 * 1024;

/// Plain byte-for-byte relay: used when the service's tunnel is
/// unencrypted.
pub async fn relay_raw(mut a: BoxedSocket, mut b: BoxedSocket) {
    let (a_to_b, b_to_a) = tokio::join!(copy_raw(&mut *a, &mut *b), copy_raw(&mut *b, &mut *a));
    if let Err(e) = a_to_b {
        tracing::debug!(error = %e, "dataplane relay leg closed");
    }
    if let Err(e) = b_to_a {
        tracing::debug!(error = %e, "dataplane relay leg closed");
    }
    let _ = a.close().await;
    let _ = b.close().await;
}

async fn copy_raw(src: &mut dyn Socket, dst: &mut dyn Socket) -> Result<(), DataplaneError> {
    let mut buf = vec![0u8; SCRATCH_LEN];
    loop {
        let n = src.read_bytes(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        dst.write_bytes(&buf[..n]).await?;
    }
}

/// Encrypted relay: `plain` carries raw application bytes, `encrypted`
/// carries AES+Base64+newline-framed chunks. `ingress` reads from
/// `plain` and writes framed ciphertext to `encrypted`; `egress` does
/// the reverse.
pub async fn relay_encrypted(mut plain: BoxedSocket, mut encrypted: BoxedSocket, key: [u8; 32]) {
    let (ingress, egress) = tokio::join!(
        ingress(&mut *plain, &mut *encrypted, &key),
        egress(&mut *encrypted, &mut *plain, &key)
    );
    if let Err(e) = ingress {
        tracing::debug!(error = %e, "dataplane ingress leg closed");
    }
    if let Err(e) = egress {
        tracing::debug!(error = %e, "dataplane egress leg closed");
    }
    let _ = plain.close().await;
    let _ = encrypted.close().await;
}

async fn ingress(plain: &mut dyn Socket, encrypted: &mut dyn Socket, key: &[u8; 32]) -> Result<(), DataplaneError> {
    let mut buf = vec![0u8; SCRATCH_LEN];
    loop {
        let n = plain.read_bytes(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        let line = tunnel_crypto::aes_encrypt_b64(key, &buf[..n])?;
        encrypted.write_line(&line).await?;
    }
}

async fn egress(encrypted: &mut dyn Socket, plain: &mut dyn Socket, key: &[u8; 32]) -> Result<(), DataplaneError> {
    loop {
        let line = encrypted.read_line().await?;
        let raw = tunnel_crypto::aes_decrypt_b64(key, &line)?;
        plain.write_bytes(&raw).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunnel_transport::tcp::{TcpListener, TcpSocket};
    use tunnel_transport::Listener;

    async fn pair() -> (BoxedSocket, BoxedSocket) {
        let mut listener = TcpListener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr();
        let accepted = tokio::spawn(async move { listener.accept().await.unwrap() });
        let dialed: BoxedSocket = Box::new(TcpSocket::dial(addr).await.unwrap());
        (accepted.await.unwrap(), dialed)
    }

    #[tokio::test]
    async fn raw_relay_copies_bytes_both_ways() {
        let (a1, a2) = pair().await;
        let (b1, b2) = pair().await;

        tokio::spawn(relay_raw(a2, b2));

        let mut a1 = a1;
        let mut b1 = b1;
        a1.write_bytes(b"hello from a").await.unwrap();
        let mut buf = [0u8; 64];
        let n = b1.read_bytes(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello from a");

        b1.write_bytes(b"hello from b").await.unwrap();
        let n = a1.read_bytes(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello from b");
    }

    #[tokio::test]
    async fn encrypted_relay_round_trips_plaintext() {
        let (plain1, plain2) = pair().await;
        let (enc1, enc2) = pair().await;
        let key = [5u8; 32];

        tokio::spawn(relay_encrypted(plain2, enc2, key));

        let mut enc1 = enc1;
        let mut plain1 = plain1;

        plain1.write_bytes(b"application data").await.unwrap();
        let line = enc1.read_line().await.unwrap();
        let decoded = tunnel_crypto::aes_decrypt_b64(&key, &line).unwrap();
        assert_eq!(decoded, b"application data");

        let reply = tunnel_crypto::aes_encrypt_b64(&key, b"server reply").unwrap();
        enc1.write_line(&reply).await.unwrap();
        let mut buf = [0u8; 64];
        let n = plain1.read_bytes(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"server reply");
    }
}

//! Control-message sender/reader pair run alongside every control loop.
//! The sender drains a bounded queue of outbound [`ControlCode`]s,
//! AES-encrypting each as decimal ASCII before writing one line; the
//! reader decodes incoming lines the same way and, on a received
//! `Heartbeat`, resets the caller's [`crate::heartbeat::HeartbeatWatchdog`].
//!
//! Both halves share one control socket behind a mutex: the wire
//! protocol is still one full-duplex stream, this only serializes the
//! two tasks' access to it rather than giving each an independent half.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tunnel_crypto::{aes_decrypt_b64, aes_encrypt_b64};
use tunnel_proto::ControlCode;
use tunnel_transport::BoxedSocket;

use crate::heartbeat::HeartbeatWatchdog;
use crate::ControlError;

pub type SharedControlSocket = Arc<Mutex<BoxedSocket>>;

/// Drains `rx` until it closes or a write fails, encrypting and sending
/// each control code as one line.
pub async fn run_control_msg_sender(
    socket: SharedControlSocket,
    mut rx: mpsc::Receiver<ControlCode>,
    key: [u8; 32],
) -> Result<(), ControlError> {
    while let Some(code) = rx.recv().await {
        let line = aes_encrypt_b64(&key, (code as i64).to_string().as_bytes())?;
        socket.lock().await.write_line(&line).await?;
    }
    Ok(())
}

/// Reads control-code lines until the socket closes or a decode error
/// occurs. Every `Heartbeat` resets `watchdog`; every other code is
/// forwarded to `on_code`.
pub async fn run_control_msg_reader<F>(
    socket: SharedControlSocket,
    key: [u8; 32],
    watchdog: Arc<HeartbeatWatchdog>,
    mut on_code: F,
) -> Result<(), ControlError>
where
    F: FnMut(ControlCode),
{
    loop {
        let line = socket.lock().await.read_line().await?;
        let plaintext = aes_decrypt_b64(&key, &line)?;
        let text = std::str::from_utf8(&plaintext).map_err(|_| ControlError::BadControlCode)?;
        let code: i64 = text.trim().parse().map_err(|_| ControlError::BadControlCode)?;
        let code = ControlCode::try_from(code).map_err(|_| ControlError::BadControlCode)?;

        if code == ControlCode::Heartbeat {
            watchdog.reset();
        }
        on_code(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunnel_transport::tcp::{TcpListener, TcpSocket};
    use tunnel_transport::Listener;

    #[tokio::test]
    async fn sender_encrypts_and_reader_decodes_control_codes() {
        let mut listener = TcpListener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr();
        let key = [3u8; 32];

        let server_task = tokio::spawn(async move {
            let sock: BoxedSocket = listener.accept().await.unwrap();
            let sock = Arc::new(Mutex::new(sock));
            let watchdog = Arc::new(HeartbeatWatchdog::spawn(std::time::Duration::from_secs(30), || async {}));
            let mut received = Vec::new();
            let _ = tokio::time::timeout(
                std::time::Duration::from_millis(200),
                run_control_msg_reader(sock, key, watchdog, |c| received.push(c)),
            )
            .await;
            received
        });

        let client_sock: BoxedSocket = Box::new(TcpSocket::dial(addr).await.unwrap());
        let client_sock = Arc::new(Mutex::new(client_sock));
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(run_control_msg_sender(client_sock, rx, key));

        tx.send(ControlCode::Heartbeat).await.unwrap();
        tx.send(ControlCode::CreateTunnel).await.unwrap();
        drop(tx);

        let received = server_task.await.unwrap();
        assert_eq!(received, vec![ControlCode::Heartbeat, ControlCode::CreateTunnel]);
    }
}

//! Classic (non-P2P) pairing: the tunnel listener's sockets become
//! workers, the external listener's sockets become requests (each one
//! also signalling the client to dial a fresh tunnel via `CreateTunnel`),
//! and a pairing loop joins one of each and runs the data-plane
//! handshake and relay between them.

use std::sync::Arc;
use tokio::sync::Mutex;
use tunnel_control::{ControlMsgSender, PendingPeer, RequestChan, RequestChanRx, WorkerChan, WorkerChanRx};
use tunnel_dataplane::{relay_encrypted, relay_raw, server_handshake};
use tunnel_proto::ControlCode;
use tunnel_transport::{BoxedListener, Listener};

use crate::error::ServerError;

pub async fn run_worker_listener(
    tunnel_listener: Arc<Mutex<BoxedListener>>,
    worker_tx: WorkerChan<()>,
) -> Result<(), ServerError> {
    loop {
        let socket = tunnel_listener.lock().await.accept().await?;
        if worker_tx.send(PendingPeer { socket, metadata: () }).await.is_err() {
            return Ok(());
        }
    }
}

pub async fn run_request_listener(
    external_listener: Arc<Mutex<BoxedListener>>,
    request_tx: RequestChan<()>,
    control_tx: ControlMsgSender,
) -> Result<(), ServerError> {
    loop {
        let socket = external_listener.lock().await.accept().await?;
        if request_tx.send(PendingPeer { socket, metadata: () }).await.is_err() {
            return Ok(());
        }
        let _ = control_tx.send(ControlCode::CreateTunnel).await;
    }
}

pub async fn run_pairing(
    mut request_rx: RequestChanRx<()>,
    mut worker_rx: WorkerChanRx<()>,
    session_key: [u8; 32],
    tunnel_encrypt: bool,
) -> Result<(), ServerError> {
    loop {
        let Some(request) = request_rx.recv().await else {
            return Ok(());
        };
        let Some(mut worker) = worker_rx.recv().await else {
            return Ok(());
        };
        tokio::spawn(async move {
            if let Err(e) = server_handshake(worker.socket.as_mut(), &session_key).await {
                tracing::warn!(error = %e, "tunnel safety handshake failed");
                return;
            }
            if tunnel_encrypt {
                relay_encrypted(request.socket, worker.socket, session_key).await;
            } else {
                relay_raw(request.socket, worker.socket).await;
            }
        });
    }
}

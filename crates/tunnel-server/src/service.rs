//! Per-connection control loop: register one client, bind the listeners
//! its `ClientHello` asked for, then run heartbeat/control-msg/pairing
//! siblings until the control socket closes.

use std::sync::Arc;
use std::time::Duration;

use rsa::RsaPrivateKey;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tunnel_config::CommonConfig;
use tunnel_control::{
    control_msg_channel, pairing_channel, run_control_msg_reader, run_control_msg_sender, HeartbeatWatchdog,
};
use tunnel_crypto::{aes_encrypt_b64, rsa_decrypt_b64};
use tunnel_proto::messages::{ClientHello, ServerHello};
use tunnel_proto::{Metadata, TransportKind};
use tunnel_transport::{listen, wildcard_addr, BoxedListener, BoxedSocket, Listener, Socket};

use crate::error::ServerError;
use crate::{p2p, pairing};

pub struct ServiceContext {
    pub common: CommonConfig,
    pub private_key: RsaPrivateKey,
}

/// Drive one accepted control connection end-to-end: the RSA/AES
/// handshake, then the sibling tasks, until the control socket closes.
pub async fn run_service(ctx: ServiceContext, mut control_socket: BoxedSocket) -> Result<(), ServerError> {
    let line = control_socket.read_line().await?;
    let plaintext = rsa_decrypt_b64(&ctx.private_key, &line)?;
    let meta = Metadata::from_json(std::str::from_utf8(&plaintext)?)?;
    let hello = ClientHello::from_metadata(&meta)?;
    let session_key = parse_secret_key(&hello.secret_key)?;
    let is_p2p = hello.tunnel_type.is_p2p();

    let tunnel_addr = wildcard_addr(hello.tunnel_type, hello.tunnel_port);
    let tunnel_listener = Arc::new(Mutex::new(listen(hello.tunnel_type, tunnel_addr).await?));
    let tunnel_port = tunnel_listener.lock().await.local_addr().port();

    let external_listener: Option<Arc<Mutex<BoxedListener>>> = if is_p2p {
        None
    } else {
        let ext_addr = wildcard_addr(hello.external_type, hello.external_port);
        Some(Arc::new(Mutex::new(listen(hello.external_type, ext_addr).await?)))
    };

    let (ssh_port, ssh_user) = if hello.tunnel_type == TransportKind::Ssh {
        (ctx.common.ssh_port, ctx.common.ssh_user.clone())
    } else {
        (None, None)
    };
    let server_hello = ServerHello {
        status: ServerHello::STATUS_OK,
        tunnel_port,
        heartbeat_timeout_secs: ctx.common.heartbeat_timeout_secs,
        ssh_port,
        ssh_user,
    };
    let reply_line = aes_encrypt_b64(&session_key, server_hello.to_metadata().to_json()?.as_bytes())?;
    control_socket.write_line(&reply_line).await?;

    tracing::info!(tunnel_port, is_p2p, "client registered");

    let shared_socket: Arc<Mutex<BoxedSocket>> = Arc::new(Mutex::new(control_socket));
    let (control_tx, control_rx) = control_msg_channel();

    let watchdog_socket = shared_socket.clone();
    let watchdog_tunnel_listener = tunnel_listener.clone();
    let watchdog_external_listener = external_listener.clone();
    let watchdog = Arc::new(HeartbeatWatchdog::spawn(
        Duration::from_secs(ctx.common.heartbeat_timeout_secs.max(1)),
        move || async move {
            let _ = watchdog_socket.lock().await.close().await;
            let _ = watchdog_tunnel_listener.lock().await.close().await;
            if let Some(l) = watchdog_external_listener {
                let _ = l.lock().await.close().await;
            }
        },
    ));

    let mut tasks: JoinSet<Result<(), ServerError>> = JoinSet::new();

    let sender_socket = shared_socket.clone();
    tasks.spawn(async move { run_control_msg_sender(sender_socket, control_rx, session_key).await.map_err(ServerError::from) });

    let reader_socket = shared_socket.clone();
    let reader_watchdog = watchdog.clone();
    tasks.spawn(async move {
        run_control_msg_reader(reader_socket, session_key, reader_watchdog, |_code| {})
            .await
            .map_err(ServerError::from)
    });

    if is_p2p {
        let (request_tx, request_rx) = pairing_channel();
        let (worker_tx, worker_rx) = pairing_channel();

        let listener = tunnel_listener.clone();
        let listener_control_tx = control_tx.clone();
        let private_key = ctx.private_key.clone();
        tasks.spawn(async move { p2p::run_tunnel_listener(listener, request_tx, worker_tx, listener_control_tx, private_key).await });

        let tunnel_encrypt = hello.tunnel_encrypt;
        tasks.spawn(async move { p2p::run_pairing(request_rx, worker_rx, tunnel_encrypt).await });
    } else {
        let (request_tx, request_rx) = pairing_channel();
        let (worker_tx, worker_rx) = pairing_channel();

        let worker_listener = tunnel_listener.clone();
        tasks.spawn(async move { pairing::run_worker_listener(worker_listener, worker_tx).await });

        let ext_listener = external_listener.clone().expect("classic service always binds an external listener");
        let ext_control_tx = control_tx.clone();
        tasks.spawn(async move { pairing::run_request_listener(ext_listener, request_tx, ext_control_tx).await });

        let tunnel_encrypt = hello.tunnel_encrypt;
        tasks.spawn(async move { pairing::run_pairing(request_rx, worker_rx, session_key, tunnel_encrypt).await });
    }

    let result = match tasks.join_next().await {
        Some(Ok(r)) => r,
        Some(Err(e)) => Err(ServerError::ConfigInvalid(e.to_string())),
        None => Ok(()),
    };
    tasks.shutdown().await;
    result
}

fn parse_secret_key(hex_str: &str) -> Result<[u8; 32], ServerError> {
    let bytes = hex::decode(hex_str).map_err(|e| ServerError::ConfigInvalid(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| ServerError::ConfigInvalid(format!("secret key has {} bytes, want 32", v.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_secret_key_accepts_32_bytes() {
        let key = [7u8; 32];
        let hex_str = hex::encode(key);
        assert_eq!(parse_secret_key(&hex_str).unwrap(), key);
    }

    #[test]
    fn parse_secret_key_rejects_wrong_length() {
        let short = hex::encode([1u8; 16]);
        assert!(parse_secret_key(&short).is_err());
    }

    #[test]
    fn parse_secret_key_rejects_invalid_hex() {
        assert!(parse_secret_key("not hex!!").is_err());
    }
}

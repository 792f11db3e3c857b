//! One service's control loop: dial the control socket, register with
//! the server, then run heartbeat/control-msg/tunnel-creation siblings
//! until the control socket closes.

use rand::RngCore;
use rsa::RsaPublicKey;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tunnel_config::{ClientServiceConfig, CommonConfig};
use tunnel_control::{
    control_msg_channel, run_control_msg_reader, run_control_msg_sender, HeartbeatWatchdog,
};
use tunnel_crypto::{aes_decrypt_b64, rsa_encrypt_b64};
use tunnel_proto::messages::{ClientHello, ControlCode, ServerHello};
use tunnel_proto::{Metadata, TransportKind};
use tunnel_transport::{dial, BoxedSocket, Socket};

use crate::error::ClientError;
use crate::p2p;
use crate::tunnel_creator;

pub const SESSION_KEY_LEN: usize = 32;

pub struct ServiceContext {
    pub common: CommonConfig,
    pub service: ClientServiceConfig,
    pub server_pubkey: RsaPublicKey,
    /// Resolved NAT classification (already auto-classified if the
    /// config asked for `-1`), used to advertise on P2P services.
    pub nat_type: i32,
}

fn resolve_server_addr(common: &CommonConfig, kind: TransportKind) -> Result<SocketAddr, ClientError> {
    let host = if kind.is_ipv6() {
        common.server_addr_v6.as_deref()
    } else {
        common.server_addr_v4.as_deref()
    }
    .ok_or_else(|| {
        ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(format!(
            "no server address configured for {kind}"
        )))
    })?;
    format!("{host}:{}", common.server_port)
        .parse()
        .map_err(|_| ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(format!("bad server address '{host}'"))))
}

fn generate_session_key() -> [u8; SESSION_KEY_LEN] {
    let mut key = [0u8; SESSION_KEY_LEN];
    rand::rngs::OsRng.fill_bytes(&mut key);
    key
}

/// Drive one service end-to-end: registration, then the sibling tasks,
/// until the control socket closes (by heartbeat expiry or an I/O
/// error). Returns once the service is fully torn down.
pub async fn run_service(ctx: ServiceContext) -> Result<(), ClientError> {
    let server_type = TransportKind::from_str(&ctx.common.server_type)
        .map_err(|e| ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(e)))?;
    let server_addr = resolve_server_addr(&ctx.common, server_type)?;

    let mut control_socket = dial(server_type, server_addr).await?;

    let session_key = generate_session_key();
    let is_p2p = ctx.service.is_p2p();

    let hello = ClientHello {
        secret_key: hex::encode(session_key),
        external_port: ctx.service.external_port.unwrap_or(0),
        external_type: parse_kind(ctx.service.external_type.as_deref().unwrap_or("tcp4"))?,
        tunnel_type: parse_kind(&ctx.service.tunnel_type)?,
        tunnel_encrypt: ctx.service.tunnel_encrypt,
        tunnel_port: ctx.service.tunnel_port,
    };
    let rsa_line = rsa_encrypt_b64(&ctx.server_pubkey, hello.to_metadata().to_json()?.as_bytes())?;
    control_socket.write_line(&rsa_line).await?;

    let reply_line = control_socket.read_line().await?;
    let reply_plain = aes_decrypt_b64(&session_key, &reply_line)?;
    let reply = Metadata::from_json(std::str::from_utf8(&reply_plain).map_err(|_| ClientError::HandshakeFail(0))?)?;
    let server_hello = ServerHello::from_metadata(&reply)?;
    if server_hello.status != ServerHello::STATUS_OK {
        return Err(ClientError::HandshakeFail(server_hello.status));
    }

    tracing::info!(
        service = %ctx.service.name,
        tunnel_port = server_hello.tunnel_port,
        heartbeat_timeout = server_hello.heartbeat_timeout_secs,
        "registered with server"
    );

    let shared_socket: Arc<Mutex<BoxedSocket>> = Arc::new(Mutex::new(control_socket));
    let (control_tx, control_rx) = control_msg_channel();
    let (create_tunnel_tx, mut create_tunnel_rx) = mpsc::channel::<()>(tunnel_control::CHANNEL_CAPACITY);

    let watchdog_socket = shared_socket.clone();
    let watchdog = Arc::new(HeartbeatWatchdog::spawn(
        Duration::from_secs(server_hello.heartbeat_timeout_secs.max(1)),
        move || async move {
            let _ = watchdog_socket.lock().await.close().await;
        },
    ));

    let mut tasks: JoinSet<Result<(), ClientError>> = JoinSet::new();

    let heartbeat_tx = control_tx.clone();
    let heartbeat_period = Duration::from_secs((server_hello.heartbeat_timeout_secs / 2).max(1));
    tasks.spawn(async move {
        let mut ticker = tokio::time::interval(heartbeat_period);
        loop {
            ticker.tick().await;
            if heartbeat_tx.send(ControlCode::Heartbeat).await.is_err() {
                return Ok(());
            }
        }
    });

    let sender_socket = shared_socket.clone();
    tasks.spawn(async move { run_control_msg_sender(sender_socket, control_rx, session_key).await.map_err(ClientError::from) });

    let reader_socket = shared_socket.clone();
    let reader_watchdog = watchdog.clone();
    tasks.spawn(async move {
        run_control_msg_reader(reader_socket, session_key, reader_watchdog, |code| {
            if code == ControlCode::CreateTunnel {
                let _ = create_tunnel_tx.try_send(());
            }
        })
        .await
        .map_err(ClientError::from)
    });

    let creator_common = ctx.common.clone();
    let creator_service = ctx.service.clone();
    let creator_server_addr = server_addr;
    let creator_tunnel_port = server_hello.tunnel_port;
    let creator_session_key = session_key;
    let creator_nat_type = ctx.nat_type;
    let creator_server_pubkey = ctx.server_pubkey.clone();
    tasks.spawn(async move {
        while create_tunnel_rx.recv().await.is_some() {
            let common = creator_common.clone();
            let service = creator_service.clone();
            let tunnel_addr = SocketAddr::new(creator_server_addr.ip(), creator_tunnel_port);
            let server_pubkey = creator_server_pubkey.clone();
            tokio::spawn(async move {
                let result = if is_p2p {
                    p2p::run_p2p_tunnel(common, service, tunnel_addr, creator_nat_type, creator_session_key, server_pubkey).await
                } else {
                    tunnel_creator::run_classic_tunnel(service, tunnel_addr, creator_session_key).await
                };
                if let Err(e) = result {
                    tracing::warn!(error = %e, "tunnel creation failed");
                }
            });
        }
        Ok(())
    });

    let result = match tasks.join_next().await {
        Some(Ok(r)) => r,
        Some(Err(e)) => Err(ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(e.to_string()))),
        None => Ok(()),
    };
    tasks.shutdown().await;
    result
}

fn parse_kind(s: &str) -> Result<TransportKind, ClientError> {
    TransportKind::from_str(s).map_err(|e| ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common(v4: Option<&str>, v6: Option<&str>) -> CommonConfig {
        CommonConfig {
            server_addr_v4: v4.map(String::from),
            server_addr_v6: v6.map(String::from),
            server_port: 7000,
            ..CommonConfig::default()
        }
    }

    #[test]
    fn resolve_server_addr_picks_v4_for_non_ipv6_kind() {
        let cfg = common(Some("192.168.1.10"), Some("::1"));
        let addr = resolve_server_addr(&cfg, TransportKind::Tcp4).unwrap();
        assert_eq!(addr, "192.168.1.10:7000".parse().unwrap());
    }

    #[test]
    fn resolve_server_addr_picks_v6_for_ipv6_kind() {
        let cfg = common(Some("192.168.1.10"), Some("::1"));
        let addr = resolve_server_addr(&cfg, TransportKind::Tcp6).unwrap();
        assert_eq!(addr, "[::1]:7000".parse().unwrap());
    }

    #[test]
    fn resolve_server_addr_fails_when_unset() {
        let cfg = common(None, None);
        assert!(resolve_server_addr(&cfg, TransportKind::Tcp4).is_err());
    }

    #[test]
    fn parse_kind_accepts_every_configured_transport() {
        for s in ["tcp4", "tcp6", "kcp4", "kcp6", "ssh", "p2p-kcp4", "p2p-kcp6"] {
            assert!(parse_kind(s).is_ok(), "expected {s} to parse");
        }
        assert!(parse_kind("bogus").is_err());
    }
}

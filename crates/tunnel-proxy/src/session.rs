//! One proxy service's accept loop: bind the local listener, and splice
//! every accepted application connection onto its own P2P rendezvous
//! with the server.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use rand::RngCore;
use rsa::RsaPublicKey;
use tokio::net::UdpSocket;
use tunnel_config::{ClientServiceConfig, CommonConfig};
use tunnel_crypto::{aes_decrypt_b64, rsa_encrypt_b64};
use tunnel_dataplane::run_fsm_and_handshake;
use tunnel_dataplane::{relay_encrypted, relay_raw};
use tunnel_fsm::{FsmName, SocketWrapper};
use tunnel_proto::{Metadata, ProxyHello, Rendezvous, TransportKind};
use tunnel_transport::{dial, listen, BoxedSocket, Listener, Socket};

use crate::error::ProxyError;

const SESSION_KEY_LEN: usize = 32;
const REBIND_ATTEMPTS: u32 = 5;
const REBIND_BACKOFF: Duration = Duration::from_secs(1);

pub struct ProxyContext {
    pub common: CommonConfig,
    pub service: ClientServiceConfig,
    pub server_pubkey: RsaPublicKey,
    /// Resolved NAT classification (already auto-classified if the
    /// config asked for `-1`).
    pub nat_type: i32,
}

/// Bind the local listener and forward every accepted connection
/// through its own P2P hole-punched session, forever.
pub async fn run_proxy(ctx: ProxyContext) -> Result<(), ProxyError> {
    let listen_kind = parse_kind(&ctx.service.internal_type)?;
    let listen_addr: SocketAddr = format!("{}:{}", ctx.service.internal_addr, ctx.service.internal_port)
        .parse()
        .map_err(|_| {
            ProxyError::ConfigInvalid(format!(
                "bad local listen address '{}:{}'",
                ctx.service.internal_addr, ctx.service.internal_port
            ))
        })?;
    let mut listener = listen(listen_kind, listen_addr).await?;

    tracing::info!(addr = %listen_addr, "proxy listening for local applications");

    let server_addr = resolve_server_addr(&ctx.common, &ctx.service)?;

    loop {
        let app_socket = listener.accept().await?;
        let service = ctx.service.clone();
        let server_pubkey = ctx.server_pubkey.clone();
        let nat_type = ctx.nat_type;
        tokio::spawn(async move {
            if let Err(e) = handle_connection(app_socket, service, server_addr, nat_type, server_pubkey).await {
                tracing::warn!(error = %e, "proxy session failed");
            }
        });
    }
}

fn resolve_server_addr(common: &CommonConfig, service: &ClientServiceConfig) -> Result<SocketAddr, ProxyError> {
    let kind = parse_kind(&service.tunnel_type)?;
    let host = if kind.is_ipv6() {
        common.server_addr_v6.as_deref()
    } else {
        common.server_addr_v4.as_deref()
    }
    .ok_or_else(|| ProxyError::ConfigInvalid(format!("no server address configured for {kind}")))?;
    format!("{host}:{}", service.tunnel_port)
        .parse()
        .map_err(|_| ProxyError::ConfigInvalid(format!("bad server address '{host}'")))
}

async fn handle_connection(
    app_socket: BoxedSocket,
    service: ClientServiceConfig,
    server_addr: SocketAddr,
    nat_type: i32,
    server_pubkey: RsaPublicKey,
) -> Result<(), ProxyError> {
    let tunnel_kind = parse_kind(&service.tunnel_type)?;
    let mut tunnel_socket = dial(tunnel_kind, server_addr).await?;

    let mut secret_key = [0u8; SESSION_KEY_LEN];
    rand::rngs::OsRng.fill_bytes(&mut secret_key);

    let advertised_addr = if tunnel_kind.is_ipv6() {
        service.p2p_addr_v6.clone()
    } else {
        service.p2p_addr_v4.clone()
    };
    let hello = ProxyHello {
        nat_type: nat_type as i64,
        addr: advertised_addr,
        port: service.p2p_port,
        network: None,
        secret_key: hex::encode(secret_key),
    };
    let line = rsa_encrypt_b64(&server_pubkey, hello.to_metadata().to_json()?.as_bytes())?;
    tunnel_socket.write_line(&line).await?;

    let reply_line = tunnel_socket.read_line().await?;
    let reply_plain = aes_decrypt_b64(&secret_key, &reply_line)?;
    let reply = Metadata::from_json(std::str::from_utf8(&reply_plain)?)?;
    let rendezvous = Rendezvous::from_metadata(&reply)?;
    if rendezvous.status != Rendezvous::STATUS_OK {
        return Err(ProxyError::HandshakeFail(rendezvous.status));
    }

    let local_addr = tunnel_socket.local_addr();
    let remote_addr: SocketAddr = format!("{}:{}", rendezvous.raddr, rendezvous.rport)
        .parse()
        .map_err(|_| ProxyError::ConfigInvalid(format!("bad rendezvous peer address '{}:{}'", rendezvous.raddr, rendezvous.rport)))?;
    tunnel_socket.close().await?;
    drop(tunnel_socket);

    let udp = rebind_with_retry(local_addr, REBIND_ATTEMPTS)
        .await
        .map_err(|e| ProxyError::ConfigInvalid(format!("could not rebind UDP port {}: {e}", local_addr.port())))?;
    let mut wrapper = SocketWrapper::new(udp, remote_addr).map_err(|e| ProxyError::ConfigInvalid(e.to_string()))?;

    let fsm_name = FsmName::from_str(&rendezvous.fsm_type).map_err(ProxyError::ConfigInvalid)?;
    let p2p_secret_key = parse_secret_key(&rendezvous.secret_key)?;

    let p2p_socket = run_fsm_and_handshake(fsm_name, &mut wrapper, &p2p_secret_key).await?;

    if rendezvous.tunnel_encrypt {
        relay_encrypted(app_socket, p2p_socket, p2p_secret_key).await;
    } else {
        relay_raw(app_socket, p2p_socket).await;
    }
    Ok(())
}

fn parse_kind(s: &str) -> Result<TransportKind, ProxyError> {
    TransportKind::from_str(s).map_err(ProxyError::ConfigInvalid)
}

fn parse_secret_key(hex_str: &str) -> Result<[u8; 32], ProxyError> {
    let bytes = hex::decode(hex_str).map_err(|e| ProxyError::ConfigInvalid(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| ProxyError::ConfigInvalid(format!("rendezvous secret key has {} bytes, want 32", v.len())))
}

async fn rebind_with_retry(addr: SocketAddr, max_attempts: u32) -> std::io::Result<UdpSocket> {
    let mut last_err = None;
    for attempt in 0..max_attempts {
        match UdpSocket::bind(addr).await {
            Ok(udp) => return Ok(udp),
            Err(e) => {
                last_err = Some(e);
                if attempt + 1 < max_attempts {
                    tokio::time::sleep(REBIND_BACKOFF).await;
                }
            }
        }
    }
    Err(last_err.unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(tunnel_type: &str, tunnel_port: u16) -> ClientServiceConfig {
        ClientServiceConfig {
            name: "test-service".into(),
            internal_addr: "127.0.0.1".into(),
            internal_port: 8080,
            internal_type: "tcp4".into(),
            tunnel_type: tunnel_type.into(),
            tunnel_encrypt: true,
            external_port: None,
            external_type: None,
            tunnel_port,
            p2p_addr_v4: None,
            p2p_addr_v6: None,
            p2p_port: None,
        }
    }

    fn common(v4: Option<&str>, v6: Option<&str>) -> CommonConfig {
        CommonConfig {
            server_addr_v4: v4.map(String::from),
            server_addr_v6: v6.map(String::from),
            ..CommonConfig::default()
        }
    }

    #[test]
    fn resolve_server_addr_uses_service_tunnel_port_not_common_server_port() {
        let cfg = common(Some("203.0.113.5"), None);
        let svc = service("p2p-kcp4", 9001);
        let addr = resolve_server_addr(&cfg, &svc).unwrap();
        assert_eq!(addr, "203.0.113.5:9001".parse().unwrap());
    }

    #[test]
    fn resolve_server_addr_picks_v6_for_ipv6_tunnel_type() {
        let cfg = common(Some("203.0.113.5"), Some("::1"));
        let svc = service("p2p-kcp6", 9001);
        let addr = resolve_server_addr(&cfg, &svc).unwrap();
        assert_eq!(addr, "[::1]:9001".parse().unwrap());
    }

    #[test]
    fn resolve_server_addr_fails_when_unset() {
        let cfg = common(None, None);
        let svc = service("p2p-kcp4", 9001);
        assert!(resolve_server_addr(&cfg, &svc).is_err());
    }

    #[test]
    fn parse_secret_key_round_trips_hex() {
        let key = [9u8; SESSION_KEY_LEN];
        let hex_str = hex::encode(key);
        assert_eq!(parse_secret_key(&hex_str).unwrap(), key);
    }

    #[test]
    fn parse_secret_key_rejects_wrong_length() {
        assert!(parse_secret_key(&hex::encode([1u8; 8])).is_err());
    }
}

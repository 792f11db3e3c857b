//! P2P tunnel creation: the tunnel socket carries only a metadata
//! exchange (advertise NAT type and optional public address, receive the
//! rendezvous), after which it is torn down and its local UDP port is
//! reused by the hole-punching FSM. Once the FSM hands back a
//! reliable-UDP session the internal service is spliced onto it with the
//! ordinary data-plane contract.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use rsa::RsaPublicKey;
use tokio::net::UdpSocket;
use tunnel_config::{ClientServiceConfig, CommonConfig};
use tunnel_crypto::{aes_decrypt_b64, rsa_encrypt_b64};
use tunnel_dataplane::run_fsm_and_handshake;
use tunnel_dataplane::{relay_encrypted, relay_raw};
use tunnel_fsm::{FsmName, SocketWrapper};
use tunnel_proto::{Metadata, Rendezvous, TransportKind, WorkerHello};
use tunnel_transport::{dial, Socket};

use crate::error::ClientError;

const REBIND_ATTEMPTS: u32 = 5;
const REBIND_BACKOFF: Duration = Duration::from_secs(1);

/// Handle one `CreateTunnel` signal for a P2P-typed service. The tunnel
/// socket's first line is RSA-encrypted with the server's public key,
/// matching every other first-contact message on this connection's
/// listener (the server cannot yet know which client's session key
/// applies); the reply comes back AES-encrypted with `session_key`,
/// the client's own control-plane handshake secret.
pub async fn run_p2p_tunnel(
    _common: CommonConfig,
    service: ClientServiceConfig,
    tunnel_addr: SocketAddr,
    nat_type: i32,
    session_key: [u8; 32],
    server_pubkey: RsaPublicKey,
) -> Result<(), ClientError> {
    let tunnel_kind = TransportKind::from_str(&service.tunnel_type)
        .map_err(|e| ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(e)))?;

    let mut tunnel_socket = dial(tunnel_kind, tunnel_addr).await?;

    let advertised_addr = if tunnel_kind.is_ipv6() {
        service.p2p_addr_v6.clone()
    } else {
        service.p2p_addr_v4.clone()
    };
    let hello = WorkerHello {
        nat_type: nat_type as i64,
        addr: advertised_addr,
        port: service.p2p_port,
        network: None,
        secret_key: hex::encode(session_key),
    };
    let line = rsa_encrypt_b64(&server_pubkey, hello.to_metadata().to_json()?.as_bytes())?;
    tunnel_socket.write_line(&line).await?;

    let reply_line = tunnel_socket.read_line().await?;
    let reply_plain = aes_decrypt_b64(&session_key, &reply_line)?;
    let reply = Metadata::from_json(std::str::from_utf8(&reply_plain)?)?;
    let rendezvous = Rendezvous::from_metadata(&reply)?;
    if rendezvous.status != Rendezvous::STATUS_OK {
        return Err(ClientError::HandshakeFail(rendezvous.status));
    }

    let local_addr = tunnel_socket.local_addr();
    let remote_addr: SocketAddr = format!("{}:{}", rendezvous.raddr, rendezvous.rport)
        .parse()
        .map_err(|_| {
            ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(format!(
                "bad rendezvous peer address '{}:{}'",
                rendezvous.raddr, rendezvous.rport
            )))
        })?;
    tunnel_socket.close().await?;
    drop(tunnel_socket);

    let udp = rebind_with_retry(local_addr, REBIND_ATTEMPTS).await.map_err(|e| {
        ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(format!(
            "could not rebind UDP port {}: {e}",
            local_addr.port()
        )))
    })?;
    let mut wrapper = SocketWrapper::new(udp, remote_addr)
        .map_err(|e| ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(e.to_string())))?;

    let fsm_name = FsmName::from_str(&rendezvous.fsm_type)
        .map_err(|e| ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(e)))?;
    let p2p_secret_key = parse_secret_key(&rendezvous.secret_key)?;

    let p2p_socket = run_fsm_and_handshake(fsm_name, &mut wrapper, &p2p_secret_key).await?;

    let internal_kind = TransportKind::from_str(&service.internal_type)
        .map_err(|e| ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(e)))?;
    let internal_addr: SocketAddr = format!("{}:{}", service.internal_addr, service.internal_port)
        .parse()
        .map_err(|_| {
            ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(format!(
                "bad internal address '{}:{}'",
                service.internal_addr, service.internal_port
            )))
        })?;
    let internal_socket = dial(internal_kind, internal_addr).await?;

    if rendezvous.tunnel_encrypt {
        relay_encrypted(internal_socket, p2p_socket, p2p_secret_key).await;
    } else {
        relay_raw(internal_socket, p2p_socket).await;
    }
    Ok(())
}

fn parse_secret_key(hex_str: &str) -> Result<[u8; 32], ClientError> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(e.to_string())))?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(format!(
            "rendezvous secret key has {} bytes, want 32",
            v.len()
        )))
    })
}

/// Rebind a raw UDP socket on `addr`, retrying through `TIME_WAIT` with a
/// 1s back-off: the tunnel socket just vacated this port and the kernel
/// may not release it immediately.
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

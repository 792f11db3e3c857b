//! Classic (non-P2P) tunnel creation: dial a fresh tunnel socket to the
//! server's assigned port, run the safety handshake, then splice it with
//! the internal service.

use std::net::SocketAddr;
use std::str::FromStr;

use tunnel_config::ClientServiceConfig;
use tunnel_dataplane::{client_handshake, relay_encrypted, relay_raw};
use tunnel_proto::TransportKind;
use tunnel_transport::dial;

use crate::error::ClientError;

/// Handle one `CreateTunnel` signal: dial the tunnel socket, prove
/// possession of the service's session key, dial the internal service,
/// and relay between the two until either side closes.
pub async fn run_classic_tunnel(
    service: ClientServiceConfig,
    tunnel_addr: SocketAddr,
    session_key: [u8; 32],
) -> Result<(), ClientError> {
    let tunnel_kind = TransportKind::from_str(&service.tunnel_type)
        .map_err(|e| ClientError::ConfigInvalid(tunnel_config::ConfigError::Invalid(e)))?;
    let mut tunnel_socket = dial(tunnel_kind, tunnel_addr).await?;
    client_handshake(tunnel_socket.as_mut(), &session_key).await?;

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

    if service.tunnel_encrypt {
        relay_encrypted(internal_socket, tunnel_socket, session_key).await;
    } else {
        relay_raw(internal_socket, tunnel_socket).await;
    }
    Ok(())
}

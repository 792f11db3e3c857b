//! Ephemeral port allocation shared by TCP4/TCP6/UDP4/UDP6 listeners.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tunnel_proto::TransportKind;

/// Quiescence observed after releasing a probed port, before a caller is
/// allowed to rebind it (gives the OS time to fully tear the socket down).
pub const PORT_QUIESCENCE: Duration = Duration::from_millis(100);

/// Open an ephemeral-port listener of the given kind, immediately close
/// it, sleep out the quiescence window, and return the port that was
/// assigned.
pub async fn get_available_port(kind: TransportKind) -> std::io::Result<u16> {
    let wildcard: SocketAddr = if kind.is_ipv6() {
        "[::]:0".parse().unwrap()
    } else {
        "0.0.0.0:0".parse().unwrap()
    };

    let port = match kind {
        TransportKind::Tcp4 | TransportKind::Tcp6 | TransportKind::Ssh => {
            let listener = TcpListener::bind(wildcard).await?;
            listener.local_addr()?.port()
        }
        TransportKind::Kcp4 | TransportKind::Kcp6 | TransportKind::P2pKcp4 | TransportKind::P2pKcp6 => {
            let socket = UdpSocket::bind(wildcard).await?;
            socket.local_addr()?.port()
        }
    };

    tokio::time::sleep(PORT_QUIESCENCE).await;
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_a_port_that_can_be_rebound() {
        let port = get_available_port(TransportKind::Tcp4).await.unwrap();
        let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
        let listener = TcpListener::bind(addr).await;
        assert!(listener.is_ok(), "expected to rebind freed port {port}");
    }
}

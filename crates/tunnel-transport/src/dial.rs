//! Dispatch helpers that pick a concrete transport from a
//! [`TransportKind`] at the call sites that only know the kind a config
//! file or handshake told them to use (control socket, tunnel socket,
//! external/proxy listener).

use std::net::SocketAddr;
use std::sync::Arc;
use tunnel_proto::TransportKind;

use crate::kcp::{KcpListenerSocket, KcpSocket};
use crate::socket::{BoxedListener, BoxedSocket, TransportError};
use crate::ssh::SshSocket;
use crate::tcp::{TcpListener, TcpSocket};

/// Dial `addr` with the transport `kind` names. `kind` must not be
/// [`TransportKind::Ssh`] here — SSH dials need the extra user/key
/// parameters [`dial_ssh`] takes.
pub async fn dial(kind: TransportKind, addr: SocketAddr) -> Result<BoxedSocket, TransportError> {
    match kind {
        TransportKind::Tcp4 | TransportKind::Tcp6 => Ok(Box::new(TcpSocket::dial(addr).await?)),
        TransportKind::Kcp4 | TransportKind::Kcp6 | TransportKind::P2pKcp4 | TransportKind::P2pKcp6 => {
            Ok(Box::new(KcpSocket::dial(addr).await?))
        }
        TransportKind::Ssh => Err(TransportError::Ssh("use dial_ssh for an SSH transport".into())),
    }
}

pub async fn dial_ssh(
    ssh_addr: SocketAddr,
    user: &str,
    signer: Arc<russh_keys::key::KeyPair>,
    target: SocketAddr,
) -> Result<BoxedSocket, TransportError> {
    Ok(Box::new(SshSocket::dial(ssh_addr, user, signer, target).await?))
}

/// Bind a listener of the given `kind` on `addr`.
pub async fn listen(kind: TransportKind, addr: SocketAddr) -> Result<BoxedListener, TransportError> {
    match kind {
        TransportKind::Tcp4 | TransportKind::Tcp6 | TransportKind::Ssh => {
            Ok(Box::new(TcpListener::bind(addr).await?))
        }
        TransportKind::Kcp4 | TransportKind::Kcp6 | TransportKind::P2pKcp4 | TransportKind::P2pKcp6 => {
            Ok(Box::new(KcpListenerSocket::bind(addr).await?))
        }
    }
}

/// Parse a `TransportKind` plus host into a wildcard bind address for
/// the given port (`0.0.0.0`/`[::]` by kind's address family).
pub fn wildcard_addr(kind: TransportKind, port: u16) -> SocketAddr {
    if kind.is_ipv6() {
        SocketAddr::new(std::net::Ipv6Addr::UNSPECIFIED.into(), port)
    } else {
        SocketAddr::new(std::net::Ipv4Addr::UNSPECIFIED.into(), port)
    }
}

//! Per-session scratch state shared by every FSM: a raw UDP socket used
//! for the SYN exchange, and the local/remote addresses that exchange
//! operates on. Once an FSM reaches its terminal state it hands off a
//! [`tunnel_transport::BoxedSocket`] (a KCP stream or listener-accepted
//! stream) as the data plane and relinquishes the raw socket.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tunnel_transport::kcp::KcpListenerSocket;
use tunnel_transport::{KcpSocket, TransportError};

use crate::tokens::KILL_KCP_BACKOFF;

pub struct SocketWrapper {
    pub local_addr: SocketAddr,
    pub remote_addr: SocketAddr,
    udp: Option<UdpSocket>,
    scratch: [u8; 1500],
}

impl SocketWrapper {
    pub fn new(udp: UdpSocket, remote_addr: SocketAddr) -> std::io::Result<Self> {
        let local_addr = udp.local_addr()?;
        Ok(Self {
            local_addr,
            remote_addr,
            udp: Some(udp),
            scratch: [0u8; 1500],
        })
    }

    pub async fn bind(local_addr: SocketAddr, remote_addr: SocketAddr) -> std::io::Result<Self> {
        let udp = UdpSocket::bind(local_addr).await?;
        Self::new(udp, remote_addr)
    }

    pub async fn send_token(&self, token: &[u8]) -> std::io::Result<()> {
        let udp = self.udp.as_ref().expect("raw UDP socket already relinquished");
        udp.send_to(token, self.remote_addr).await?;
        Ok(())
    }

    pub async fn send_to(&self, token: &[u8], dest: SocketAddr) -> std::io::Result<()> {
        let udp = self.udp.as_ref().expect("raw UDP socket already relinquished");
        udp.send_to(token, dest).await?;
        Ok(())
    }

    /// Wait up to `deadline` for one datagram. `Ok(None)` means the
    /// deadline elapsed with nothing received.
    pub async fn recv_token(&mut self, deadline: Duration) -> std::io::Result<Option<(Vec<u8>, SocketAddr)>> {
        let udp = self.udp.as_ref().expect("raw UDP socket already relinquished");
        match timeout(deadline, udp.recv_from(&mut self.scratch)).await {
            Ok(Ok((n, from))) => Ok(Some((self.scratch[..n].to_vec(), from))),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Ok(None),
        }
    }

    /// Close the raw UDP socket; the caller is about to promote the
    /// local port to a reliable-UDP (KCP) listener or stream.
    pub fn close_raw(&mut self) {
        self.udp = None;
    }

    /// `KILL_KCP_SOCKET`: drop and recreate the raw UDP socket bound to
    /// the same local port, retrying through `TIME_WAIT` with a 1s
    /// back-off, as the FSM retry paths require.
    pub async fn kill_and_recreate_raw(&mut self, max_attempts: u32) -> std::io::Result<()> {
        self.udp = None;
        let mut last_err = None;
        for attempt in 0..max_attempts {
            match UdpSocket::bind(self.local_addr).await {
                Ok(udp) => {
                    self.udp = Some(udp);
                    return Ok(());
                }
                Err(e) => {
                    last_err = Some(e);
                    if attempt + 1 < max_attempts {
                        tokio::time::sleep(KILL_KCP_BACKOFF).await;
                    }
                }
            }
        }
        Err(last_err.unwrap())
    }

    /// Bind a reliable-UDP listener on the same local port the raw
    /// socket just vacated. Callers should have called
    /// [`close_raw`](Self::close_raw) first.
    pub async fn promote_to_kcp_listener(&self) -> Result<KcpListenerSocket, TransportError> {
        KcpListenerSocket::bind_with_retry(self.local_addr, 5).await
    }

    /// Dial a reliable-UDP session to the peer from the same local port
    /// the raw socket just vacated.
    pub async fn promote_to_kcp_dial(&self) -> Result<KcpSocket, TransportError> {
        KcpSocket::dial(self.remote_addr).await
    }
}

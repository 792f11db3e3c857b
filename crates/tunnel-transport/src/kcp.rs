//! KCP4/KCP6: a reliable, ordered stream layered over UDP via
//! [`tokio_kcp`], multiplexed by a 32-bit conversation ID.
//!
//! The hole-punching FSMs (see `tunnel-fsm`) hand off their raw UDP
//! exchange to this transport once a peer has been confirmed reachable.
//! `tokio_kcp` binds its own UDP socket per session rather than taking
//! an already-bound one, so the FSMs close their raw probe socket first
//! and rebind a KCP listener/stream on the *same local port number*;
//! [`rebind_with_retry`] implements the TIME_WAIT back-off that requires
//! (see the FSM library's `KILL_KCP_*` states).

use crate::socket::{BoxedSocket, Listener, Socket, TransportError};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_kcp::{KcpConfig, KcpListener as TokioKcpListener, KcpStream};
use tunnel_proto::framing;

fn kcp_config() -> KcpConfig {
    // Fast-mode defaults: low latency at the cost of a bit more
    // bandwidth, matching what a NAT-traversal data plane wants.
    let mut config = KcpConfig::default();
    config.nodelay.nodelay = true;
    config.nodelay.interval = 10;
    config.nodelay.resend = 2;
    config.nodelay.nc = true;
    config.stream = true;
    config
}

pub struct KcpSocket {
    stream: KcpStream,
    local: SocketAddr,
    remote: SocketAddr,
    ipv6: bool,
}

impl KcpSocket {
    fn wrap(stream: KcpStream, ipv6: bool) -> std::io::Result<Self> {
        let local = stream.local_addr()?;
        let remote = stream.peer_addr()?;
        Ok(Self { stream, local, remote, ipv6 })
    }

    pub async fn dial(addr: SocketAddr) -> Result<Self, TransportError> {
        let ipv6 = addr.is_ipv6();
        let stream = KcpStream::connect(&kcp_config(), addr)
            .await
            .map_err(TransportError::DialFail)?;
        Self::wrap(stream, ipv6).map_err(TransportError::DialFail)
    }
}

#[async_trait]
impl Socket for KcpSocket {
    async fn read_line(&mut self) -> Result<String, TransportError> {
        let mut buffered = tokio::io::BufReader::new(&mut self.stream);
        Ok(framing::read_line(&mut buffered).await?)
    }

    async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        Ok(framing::write_line(&mut self.stream, line).await?)
    }

    async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(self.stream.read(buf).await?)
    }

    async fn write_bytes(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(buf).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let _ = self.stream.shutdown().await;
        Ok(())
    }

    fn local_addr(&self) -> SocketAddr {
        self.local
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    fn network(&self) -> &'static str {
        if self.ipv6 {
            "kcp6"
        } else {
            "kcp4"
        }
    }
}

pub struct KcpListenerSocket {
    inner: TokioKcpListener,
    local: SocketAddr,
    ipv6: bool,
}

impl KcpListenerSocket {
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let inner = TokioKcpListener::bind(kcp_config(), addr)
            .await
            .map_err(TransportError::BindFail)?;
        let local = inner.local_addr().map_err(TransportError::BindFail)?;
        Ok(Self { inner, local, ipv6: addr.is_ipv6() })
    }

    /// Bind a listener on `addr`, retrying on `AddrInUse` (TIME_WAIT)
    /// with a 1s back-off, matching the FSM library's `KILL_KCP_*` retry
    /// path.
    pub async fn bind_with_retry(addr: SocketAddr, max_attempts: u32) -> Result<Self, TransportError> {
        let mut last_err = None;
        for attempt in 0..max_attempts {
            match Self::bind(addr).await {
                Ok(listener) => return Ok(listener),
                Err(e) => {
                    last_err = Some(e);
                    if attempt + 1 < max_attempts {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or(TransportError::Closed))
    }
}

#[async_trait]
impl Listener for KcpListenerSocket {
    async fn accept(&mut self) -> Result<BoxedSocket, TransportError> {
        let (stream, _peer) = self.inner.accept().await.map_err(TransportError::Io)?;
        let sock = KcpSocket::wrap(stream, self.ipv6).map_err(TransportError::Io)?;
        Ok(Box::new(sock))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn network(&self) -> &'static str {
        if self.ipv6 {
            "kcp6"
        } else {
            "kcp4"
        }
    }

    fn local_addr(&self) -> SocketAddr {
        self.local
    }
}

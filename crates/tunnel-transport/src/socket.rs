//! The `Socket`/`Listener` capability traits every concrete transport
//! (TCP, KCP-over-UDP, SSH-tunnelled TCP) implements. Callers of the
//! control-plane and data-plane code talk only to these traits, never to
//! a concrete transport type.

use async_trait::async_trait;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("DIAL_FAIL: {0}")]
    DialFail(std::io::Error),
    #[error("BIND_FAIL: {0}")]
    BindFail(std::io::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("framing error: {0}")]
    Framing(#[from] tunnel_proto::FramingError),
    #[error("ssh error: {0}")]
    Ssh(String),
    #[error("socket closed")]
    Closed,
}

/// A byte-stream socket with newline-delimited line framing layered on
/// top, matching every transport variant the protocol runs over.
#[async_trait]
pub trait Socket: Send + Sync {
    /// Read one newline-terminated line (the envelope stripped of `\n`).
    async fn read_line(&mut self) -> Result<String, TransportError>;

    /// Write one line followed by `\n`.
    async fn write_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Read raw bytes into `buf`, returning the number of bytes read.
    /// `0` means the peer closed its write side.
    async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write raw bytes, blocking until the full buffer is accepted.
    async fn write_bytes(&mut self, buf: &[u8]) -> Result<(), TransportError>;

    /// Close both directions of the socket.
    async fn close(&mut self) -> Result<(), TransportError>;

    fn local_addr(&self) -> SocketAddr;
    fn remote_addr(&self) -> SocketAddr;
    fn network(&self) -> &'static str;
}

pub type BoxedSocket = Box<dyn Socket>;

/// A listening endpoint that accepts new [`Socket`]s.
#[async_trait]
pub trait Listener: Send + Sync {
    async fn accept(&mut self) -> Result<BoxedSocket, TransportError>;
    async fn close(&mut self) -> Result<(), TransportError>;
    fn network(&self) -> &'static str;
    fn local_addr(&self) -> SocketAddr;
}

pub type BoxedListener = Box<dyn Listener>;

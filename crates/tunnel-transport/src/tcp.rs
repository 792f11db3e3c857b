//! TCP4/TCP6 transport.

use crate::socket::{BoxedSocket, Listener, Socket, TransportError};
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener as TokioTcpListener, TcpStream};
use tunnel_proto::framing;

pub struct TcpSocket {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    local: SocketAddr,
    remote: SocketAddr,
    ipv6: bool,
}

impl TcpSocket {
    fn from_stream(stream: TcpStream) -> std::io::Result<Self> {
        let local = stream.local_addr()?;
        let remote = stream.peer_addr()?;
        let ipv6 = local.is_ipv6();
        let (read_half, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer,
            local,
            remote,
            ipv6,
        })
    }

    pub async fn dial(addr: SocketAddr) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await.map_err(TransportError::DialFail)?;
        Self::from_stream(stream).map_err(TransportError::DialFail)
    }
}

#[async_trait]
impl Socket for TcpSocket {
    async fn read_line(&mut self) -> Result<String, TransportError> {
        Ok(framing::read_line(&mut self.reader).await?)
    }

    async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        Ok(framing::write_line(&mut self.writer, line).await?)
    }

    async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(self.reader.read(buf).await?)
    }

    async fn write_bytes(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        self.writer.write_all(buf).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let _ = self.writer.shutdown().await;
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
            "tcp6"
        } else {
            "tcp4"
        }
    }
}

pub struct TcpListener {
    inner: TokioTcpListener,
    local: SocketAddr,
    ipv6: bool,
}

impl TcpListener {
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let inner = TokioTcpListener::bind(addr).await.map_err(TransportError::BindFail)?;
        let local = inner.local_addr().map_err(TransportError::BindFail)?;
        Ok(Self {
            inner,
            local,
            ipv6: addr.is_ipv6(),
        })
    }
}

#[async_trait]
impl Listener for TcpListener {
    async fn accept(&mut self) -> Result<BoxedSocket, TransportError> {
        let (stream, _peer) = self.inner.accept().await?;
        let sock = TcpSocket::from_stream(stream)?;
        Ok(Box::new(sock))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        // tokio's TcpListener has no explicit close; dropping it releases
        // the fd. Accept loops observe this as a stream of `Err`/`Closed`.
        Ok(())
    }

    fn network(&self) -> &'static str {
        if self.ipv6 {
            "tcp6"
        } else {
            "tcp4"
        }
    }

    fn local_addr(&self) -> SocketAddr {
        self.local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dial_and_accept_round_trip_a_line() {
        let mut listener = TcpListener::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr();

        let server = tokio::spawn(async move {
            let mut sock = listener.accept().await.unwrap();
            let line = sock.read_line().await.unwrap();
            sock.write_line(&format!("echo:{line}")).await.unwrap();
        });

        let mut client = TcpSocket::dial(addr).await.unwrap();
        client.write_line("hello").await.unwrap();
        let reply = client.read_line().await.unwrap();
        assert_eq!(reply, "echo:hello");

        server.await.unwrap();
    }
}

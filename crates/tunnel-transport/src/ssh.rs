//! SSH-tunnelled TCP: establish an SSH session, open a remote
//! direct-tcpip channel, and treat the channel as a plain stream socket.
//! Used when a service's tunnel type is configured as `ssh` so that the
//! tunnel leg rides over a channel on a single long-lived SSH connection
//! instead of a bare TCP/KCP socket.

use crate::socket::{Socket, TransportError};
use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{Channel, ChannelMsg};
use russh_keys::key::KeyPair;
use std::net::SocketAddr;
use std::sync::Arc;
use tunnel_proto::framing;

struct AcceptAllServerKeys;

#[async_trait]
impl client::Handler for AcceptAllServerKeys {
    type Error = russh::Error;

    async fn check_server_key(&mut self, _key: &russh_keys::key::PublicKey) -> Result<bool, Self::Error> {
        // Trust is anchored by the RSA control-plane handshake, not by
        // the SSH host key; this transport only ever carries a tunnel
        // leg the control plane has already authenticated.
        Ok(true)
    }
}

pub struct SshSocket {
    channel: Channel<client::Msg>,
    _session: Handle<AcceptAllServerKeys>,
    local: SocketAddr,
    remote: SocketAddr,
    read_buf: Vec<u8>,
}

impl SshSocket {
    /// Open an SSH session to `ssh_addr` authenticating as `user` with
    /// `signer`, then open a direct-tcpip channel to `target` (the
    /// server's tunnel port, reachable from the SSH host).
    pub async fn dial(
        ssh_addr: SocketAddr,
        user: &str,
        signer: Arc<KeyPair>,
        target: SocketAddr,
    ) -> Result<Self, TransportError> {
        let config = Arc::new(client::Config::default());
        let mut session = client::connect(config, ssh_addr, AcceptAllServerKeys)
            .await
            .map_err(|e| TransportError::Ssh(e.to_string()))?;

        let authenticated = session
            .authenticate_publickey(user, signer)
            .await
            .map_err(|e| TransportError::Ssh(e.to_string()))?;
        if !authenticated {
            return Err(TransportError::Ssh("SSH public-key authentication rejected".into()));
        }

        let channel = session
            .channel_open_direct_tcpip(
                target.ip().to_string(),
                target.port() as u32,
                "127.0.0.1",
                0,
            )
            .await
            .map_err(|e| TransportError::Ssh(e.to_string()))?;

        Ok(Self {
            channel,
            _session: session,
            local: "0.0.0.0:0".parse().unwrap(),
            remote: target,
            read_buf: Vec::new(),
        })
    }
}

#[async_trait]
impl Socket for SshSocket {
    async fn read_line(&mut self) -> Result<String, TransportError> {
        loop {
            if let Some(pos) = self.read_buf.iter().position(|&b| b == b'\n') {
                let line = self.read_buf.drain(..=pos).collect::<Vec<u8>>();
                let line = String::from_utf8_lossy(&line).trim_end().to_string();
                return Ok(line);
            }
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => self.read_buf.extend_from_slice(&data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(TransportError::Closed)
                }
                _ => {}
            }
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let mut framed = Vec::with_capacity(line.len() + 1);
        framed.extend_from_slice(line.as_bytes());
        framed.push(b'\n');
        self.channel
            .data(&framed[..])
            .await
            .map_err(|e| TransportError::Ssh(e.to_string()))
    }

    async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if !self.read_buf.is_empty() {
            let n = self.read_buf.len().min(buf.len());
            buf[..n].copy_from_slice(&self.read_buf[..n]);
            self.read_buf.drain(..n);
            return Ok(n);
        }
        match self.channel.wait().await {
            Some(ChannelMsg::Data { data }) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if data.len() > n {
                    self.read_buf.extend_from_slice(&data[n..]);
                }
                Ok(n)
            }
            Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => Ok(0),
            _ => Ok(0),
        }
    }

    async fn write_bytes(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        self.channel
            .data(buf)
            .await
            .map_err(|e| TransportError::Ssh(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let _ = self.channel.close().await;
        Ok(())
    }

    fn local_addr(&self) -> SocketAddr {
        self.local
    }

    fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    fn network(&self) -> &'static str {
        "ssh"
    }
}

//! Tagged control-plane message shapes.
//!
//! The wire format stays an open `Metadata` map for interop, but every
//! exchange in this codebase has a fixed shape. These structs give call
//! sites real fields instead of stringly-typed lookups, while still
//! round-tripping through [`Metadata`]/JSON underneath.

use crate::metadata::{keys, Metadata, MetadataError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Control codes sent on the control channel after the handshake.
///
/// Values are part of the wire contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum ControlCode {
    Heartbeat = 1,
    CreateTunnel = 2,
}

impl TryFrom<i64> for ControlCode {
    type Error = MetadataError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ControlCode::Heartbeat),
            2 => Ok(ControlCode::CreateTunnel),
            _ => Err(MetadataError::WrongType("ControlCode")),
        }
    }
}

/// Transport kind used for a listener, tunnel, or control socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    Tcp4,
    Tcp6,
    Kcp4,
    Kcp6,
    Ssh,
    P2pKcp4,
    P2pKcp6,
}

impl TransportKind {
    pub fn is_p2p(self) -> bool {
        matches!(self, TransportKind::P2pKcp4 | TransportKind::P2pKcp6)
    }

    pub fn is_ipv6(self) -> bool {
        matches!(self, TransportKind::Tcp6 | TransportKind::Kcp6 | TransportKind::P2pKcp6)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportKind::Tcp4 => "tcp4",
            TransportKind::Tcp6 => "tcp6",
            TransportKind::Kcp4 => "kcp4",
            TransportKind::Kcp6 => "kcp6",
            TransportKind::Ssh => "ssh",
            TransportKind::P2pKcp4 => "p2p-kcp4",
            TransportKind::P2pKcp6 => "p2p-kcp6",
        };
        f.write_str(s)
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" | "tcp4" => Ok(TransportKind::Tcp4),
            "tcp6" => Ok(TransportKind::Tcp6),
            "kcp" | "kcp4" => Ok(TransportKind::Kcp4),
            "kcp6" => Ok(TransportKind::Kcp6),
            "ssh" => Ok(TransportKind::Ssh),
            "p2p" | "p2p-kcp4" => Ok(TransportKind::P2pKcp4),
            "p2p-kcp6" => Ok(TransportKind::P2pKcp6),
            other => Err(format!("unknown transport type '{other}'")),
        }
    }
}

/// First client -> server packet. RSA-encrypted on the wire; every
/// later control-plane message uses AES instead.
#[derive(Debug, Clone)]
pub struct ClientHello {
    pub secret_key: String,
    pub external_port: u16,
    pub external_type: TransportKind,
    pub tunnel_type: TransportKind,
    pub tunnel_encrypt: bool,
    /// 0 means "server assigns a tunnel port".
    pub tunnel_port: u16,
}

impl ClientHello {
    pub fn to_metadata(&self) -> Metadata {
        let mut m = Metadata::new();
        m.set(keys::SECRET_KEY, self.secret_key.clone())
            .set_u16(keys::EXTERNAL_PORT, self.external_port)
            .set(keys::EXTERNAL_TYPE, self.external_type.to_string())
            .set(keys::TUNNEL_TYPE, self.tunnel_type.to_string())
            .set(keys::TUNNEL_ENCRYPT, self.tunnel_encrypt)
            .set_u16(keys::TUNNEL_PORT, self.tunnel_port);
        m
    }

    pub fn from_metadata(m: &Metadata) -> Result<Self, MetadataError> {
        Ok(Self {
            secret_key: m.get_str(keys::SECRET_KEY)?.to_string(),
            external_port: m.get_u16(keys::EXTERNAL_PORT)?,
            external_type: parse_transport(m.get_str(keys::EXTERNAL_TYPE)?)?,
            tunnel_type: parse_transport(m.get_str(keys::TUNNEL_TYPE)?)?,
            tunnel_encrypt: m.get_bool(keys::TUNNEL_ENCRYPT)?,
            tunnel_port: m.get_u16_opt(keys::TUNNEL_PORT).unwrap_or(0),
        })
    }
}

/// Server -> client handshake reply. AES-encrypted.
#[derive(Debug, Clone)]
pub struct ServerHello {
    pub status: u16,
    pub tunnel_port: u16,
    pub heartbeat_timeout_secs: u64,
    pub ssh_port: Option<u16>,
    pub ssh_user: Option<String>,
}

impl ServerHello {
    pub const STATUS_OK: u16 = 200;

    pub fn to_metadata(&self) -> Metadata {
        let mut m = Metadata::new();
        m.set_u16(keys::STATUS, self.status)
            .set_u16(keys::TUNNEL_PORT, self.tunnel_port)
            .set_i64(keys::HEARTBEAT_TIMEOUT, self.heartbeat_timeout_secs as i64);
        if let Some(p) = self.ssh_port {
            m.set_u16(keys::SSH_PORT, p);
        }
        if let Some(ref u) = self.ssh_user {
            m.set(keys::SSH_USER, u.clone());
        }
        m
    }

    pub fn from_metadata(m: &Metadata) -> Result<Self, MetadataError> {
        Ok(Self {
            status: m.get_u16(keys::STATUS)?,
            tunnel_port: m.get_u16(keys::TUNNEL_PORT)?,
            heartbeat_timeout_secs: m.get_i64(keys::HEARTBEAT_TIMEOUT)? as u64,
            ssh_port: m.get_u16_opt(keys::SSH_PORT),
            ssh_user: m.get_str_opt(keys::SSH_USER).map(str::to_string),
        })
    }
}

/// Metadata a Proxy advertises when it dials into the server's tunnel
/// listener for P2P rendezvous.
#[derive(Debug, Clone)]
pub struct ProxyHello {
    pub nat_type: i64,
    pub addr: Option<String>,
    pub port: Option<u16>,
    pub network: Option<String>,
    /// A fresh, connection-local secret the proxy generates: it has no
    /// prior session with the server, so this is its "handshake secret"
    /// for the AES-encrypted [`Rendezvous`] reply.
    pub secret_key: String,
}

impl ProxyHello {
    pub fn to_metadata(&self) -> Metadata {
        let mut m = Metadata::new();
        m.set(keys::TYPE, "Proxy")
            .set_i64(keys::NAT_TYPE, self.nat_type)
            .set(keys::SECRET_KEY, self.secret_key.clone());
        if let Some(ref a) = self.addr {
            m.set(keys::ADDR, a.clone());
        }
        if let Some(p) = self.port {
            m.set_u16(keys::PORT, p);
        }
        if let Some(ref n) = self.network {
            m.set(keys::NETWORK, n.clone());
        }
        m
    }

    pub fn from_metadata(m: &Metadata) -> Result<Self, MetadataError> {
        Ok(Self {
            nat_type: m.get_i64(keys::NAT_TYPE)?,
            addr: m.get_str_opt(keys::ADDR).map(str::to_string),
            port: m.get_u16_opt(keys::PORT),
            network: m.get_str_opt(keys::NETWORK).map(str::to_string),
            secret_key: m.get_str(keys::SECRET_KEY)?.to_string(),
        })
    }
}

/// Metadata a Client advertises over its tunnel socket when the tunnel
/// type is P2P: the server classifies this socket as a `Worker` rather
/// than pairing it with a `RequestChan` entry. `secret_key` is the same
/// session key established during control-plane registration.
#[derive(Debug, Clone)]
pub struct WorkerHello {
    pub nat_type: i64,
    pub addr: Option<String>,
    pub port: Option<u16>,
    pub network: Option<String>,
    pub secret_key: String,
}

impl WorkerHello {
    pub fn to_metadata(&self) -> Metadata {
        let mut m = Metadata::new();
        m.set(keys::TYPE, "Worker")
            .set_i64(keys::NAT_TYPE, self.nat_type)
            .set(keys::SECRET_KEY, self.secret_key.clone());
        if let Some(ref a) = self.addr {
            m.set(keys::ADDR, a.clone());
        }
        if let Some(p) = self.port {
            m.set_u16(keys::PORT, p);
        }
        if let Some(ref n) = self.network {
            m.set(keys::NETWORK, n.clone());
        }
        m
    }

    pub fn from_metadata(m: &Metadata) -> Result<Self, MetadataError> {
        Ok(Self {
            nat_type: m.get_i64(keys::NAT_TYPE)?,
            secret_key: m.get_str(keys::SECRET_KEY)?.to_string(),
            addr: m.get_str_opt(keys::ADDR).map(str::to_string),
            port: m.get_u16_opt(keys::PORT),
            network: m.get_str_opt(keys::NETWORK).map(str::to_string),
        })
    }
}

/// Server-mediated rendezvous delivered to both sides of a P2P pairing:
/// peer address, the FSM to run, and a fresh data-plane session key.
/// `status` mirrors [`ServerHello::status`]: a pairing the matrices mark
/// unsupported still gets a `Rendezvous` reply, just with a failure
/// status and the remaining fields left at their defaults.
#[derive(Debug, Clone)]
pub struct Rendezvous {
    pub status: u16,
    pub raddr: String,
    pub rport: u16,
    pub rnetwork: String,
    pub fsm_type: String,
    pub secret_key: String,
    pub tunnel_encrypt: bool,
}

impl Rendezvous {
    pub const STATUS_OK: u16 = 200;
    pub const STATUS_INCOMPATIBLE_NAT: u16 = 409;

    pub fn failure(status: u16) -> Self {
        Self {
            status,
            raddr: String::new(),
            rport: 0,
            rnetwork: String::new(),
            fsm_type: String::new(),
            secret_key: String::new(),
            tunnel_encrypt: false,
        }
    }

    pub fn to_metadata(&self) -> Metadata {
        let mut m = Metadata::new();
        m.set_u16(keys::STATUS, self.status)
            .set(keys::RADDR, self.raddr.clone())
            .set_u16(keys::RPORT, self.rport)
            .set(keys::RNETWORK, self.rnetwork.clone())
            .set(keys::FSM_TYPE, self.fsm_type.clone())
            .set(keys::SECRET_KEY, self.secret_key.clone())
            .set(keys::TUNNEL_ENCRYPT, self.tunnel_encrypt);
        m
    }

    pub fn from_metadata(m: &Metadata) -> Result<Self, MetadataError> {
        Ok(Self {
            status: m.get_u16_opt(keys::STATUS).unwrap_or(Self::STATUS_OK),
            raddr: m.get_str_opt(keys::RADDR).unwrap_or_default().to_string(),
            rport: m.get_u16_opt(keys::RPORT).unwrap_or(0),
            rnetwork: m.get_str_opt(keys::RNETWORK).unwrap_or_default().to_string(),
            fsm_type: m.get_str_opt(keys::FSM_TYPE).unwrap_or_default().to_string(),
            secret_key: m.get_str_opt(keys::SECRET_KEY).unwrap_or_default().to_string(),
            tunnel_encrypt: m.get_bool(keys::TUNNEL_ENCRYPT).unwrap_or(false),
        })
    }
}

fn parse_transport(s: &str) -> Result<TransportKind, MetadataError> {
    TransportKind::from_str(s).map_err(|_| MetadataError::WrongType("TransportKind"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_hello_round_trips() {
        let hello = ClientHello {
            secret_key: "k".into(),
            external_port: 2222,
            external_type: TransportKind::Tcp4,
            tunnel_type: TransportKind::Tcp4,
            tunnel_encrypt: true,
            tunnel_port: 0,
        };
        let back = ClientHello::from_metadata(&hello.to_metadata()).unwrap();
        assert_eq!(back.secret_key, "k");
        assert_eq!(back.external_port, 2222);
        assert!(back.tunnel_encrypt);
    }

    #[test]
    fn transport_kind_parses_spec_aliases() {
        assert_eq!(TransportKind::from_str("tcp").unwrap(), TransportKind::Tcp4);
        assert_eq!(TransportKind::from_str("kcp6").unwrap(), TransportKind::Kcp6);
        assert!(TransportKind::from_str("p2p-kcp4").unwrap().is_p2p());
    }
}

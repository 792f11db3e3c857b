//! The tunnel data plane: the paired connection between a client-side
//! request and a server-side accepted connection. Every pair starts
//! with [`handshake`]'s two-way safety check and then runs one of
//! [`relay::relay_raw`] or [`relay::relay_encrypted`] until either leg
//! closes. [`p2p::run_fsm_and_handshake`] drives the same handshake
//! after a hole-punching FSM hands back a reliable-UDP session instead
//! of a directly dialed tunnel socket.

pub mod handshake;
pub mod p2p;
pub mod relay;

pub use handshake::{client_handshake, server_handshake};
pub use p2p::run_fsm_and_handshake;
pub use relay::{relay_encrypted, relay_raw};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataplaneError {
    #[error("TUNNEL_SAFETY_FAIL: secret key mismatch")]
    SafetyCheckFailed,
    #[error(transparent)]
    Transport(#[from] tunnel_transport::TransportError),
    #[error(transparent)]
    Crypto(#[from] tunnel_crypto::CryptoError),
    #[error(transparent)]
    Metadata(#[from] tunnel_proto::MetadataError),
    #[error("non-utf8 payload: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("FSM_FAIL: {0}")]
    Fsm(#[from] tunnel_fsm::FsmError),
}

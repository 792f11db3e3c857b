//! Hole-punching finite-state machines run once a rendezvous has told
//! both peers each other's observed address and NAT classification.
//! [`matrix`] selects which of the six FSMs ([`fn10`] through [`fn31`])
//! each side runs; every FSM drives a [`socket_wrapper::SocketWrapper`]
//! through its SYN exchange and, on success, hands back a
//! [`tunnel_transport::BoxedSocket`] ready to carry the data plane.

pub mod fn10;
pub mod fn11;
pub mod fn20;
pub mod fn21;
pub mod fn30;
pub mod fn31;
pub mod matrix;
pub mod socket_wrapper;
pub mod tokens;

pub use matrix::{fsm_for_proxy, fsm_for_tunnel, FsmName};
pub use socket_wrapper::SocketWrapper;

use thiserror::Error;
use tunnel_transport::{BoxedSocket, TransportError};

#[derive(Debug, Error)]
pub enum FsmError {
    #[error("timeout: {0}")]
    Timeout(&'static str),
    #[error("protocol error: {0}")]
    Protocol(&'static str),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("io error: {0}")]
    Io(std::io::Error),
    #[error("this NAT pairing cannot be bridged")]
    Unsupported,
}

impl From<std::io::Error> for FsmError {
    fn from(e: std::io::Error) -> Self {
        FsmError::Io(e)
    }
}

/// Run the FSM named by `name` against `wrapper`, returning the
/// established data-plane socket.
pub async fn run(name: FsmName, wrapper: &mut SocketWrapper) -> Result<BoxedSocket, FsmError> {
    match name {
        FsmName::Fn10 => fn10::run(wrapper).await,
        FsmName::Fn11 => fn11::run(wrapper).await,
        FsmName::Fn20 => fn20::run(wrapper).await,
        FsmName::Fn21 => fn21::run(wrapper).await,
        FsmName::Fn30 => fn30::run(wrapper).await,
        FsmName::Fn31 => fn31::run(wrapper).await,
        FsmName::Unsupported => Err(FsmError::Unsupported),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn fn10_fn11_complete_a_direct_handshake() {
        let udp_a = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let udp_b = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr_a = udp_a.local_addr().unwrap();
        let addr_b = udp_b.local_addr().unwrap();

        let mut a = SocketWrapper::new(udp_a, addr_b).unwrap();
        let mut b = SocketWrapper::new(udp_b, addr_a).unwrap();

        let listener = tokio::spawn(async move { fn10::run(&mut a).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let dialer = fn11::run(&mut b).await;

        let listener_res = listener.await.unwrap();
        assert!(listener_res.is_ok());
        assert!(dialer.is_ok());
    }
}

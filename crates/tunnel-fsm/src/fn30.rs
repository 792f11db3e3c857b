//! Fn30: the address-and-port-dependent-mapping (APDM) side of a
//! hole-punch pairing (paired with [`crate::fn31`]). The peer's NAT
//! rewrites the source port per destination, so no single guessed port
//! will reach it; instead this side blindly sends `SYN1` to every port
//! in `port_range` at the peer's IP, paced by `pacing`, and lets the
//! peer's reply reveal which port it is actually reachable on.
//!
//! The sweep always runs to completion even if a reply arrives early —
//! this wastes time but is what the original implementation does, and
//! clients are allowed to narrow `port_range` (e.g. in tests) rather
//! than the library second-guessing when to stop early.

use std::net::SocketAddr;
use std::ops::Range;
use std::time::Duration;
use tokio::time::timeout;
use tunnel_transport::{BoxedSocket, Listener};

use crate::socket_wrapper::SocketWrapper;
use crate::tokens::{FSM_DEADLINE, SYN1, SYN2};
use crate::FsmError;

/// Full ephemeral/registered port range the original exhaustively
/// sweeps; production callers pass this, tests pass a narrower slice.
pub const DEFAULT_PORT_RANGE: Range<u16> = 1024..65535;
pub const DEFAULT_PACING: Duration = Duration::from_millis(1);

pub async fn run(wrapper: &mut SocketWrapper) -> Result<BoxedSocket, FsmError> {
    run_with(wrapper, DEFAULT_PORT_RANGE, DEFAULT_PACING).await
}

pub async fn run_with(
    wrapper: &mut SocketWrapper,
    port_range: Range<u16>,
    pacing: Duration,
) -> Result<BoxedSocket, FsmError> {
    let peer_ip = wrapper.remote_addr.ip();
    for port in port_range {
        let dest = SocketAddr::new(peer_ip, port);
        wrapper.send_to(SYN1, dest).await?;
        tokio::time::sleep(pacing).await;
    }

    let (buf, from) = wrapper
        .recv_token(FSM_DEADLINE)
        .await?
        .ok_or(FsmError::Timeout("fn30: no SYN1 reply after port sweep"))?;
    if buf != SYN1 {
        return Err(FsmError::Protocol("fn30: unexpected token after port sweep"));
    }
    wrapper.remote_addr = from;

    wrapper.send_token(SYN2).await?;
    wrapper.close_raw();

    let mut listener = wrapper.promote_to_kcp_listener().await?;
    let socket = timeout(FSM_DEADLINE, listener.accept())
        .await
        .map_err(|_| FsmError::Timeout("fn30: no reliable-UDP accept from peer"))??;

    Ok(socket)
}

//! Fn20: listening side of a two-step hole-punch pairing (paired with
//! [`crate::fn21`]), used when one peer's NAT is address-dependent.
//! Waits for `SYN1`, replies `SYN2`, then promotes the local port to a
//! reliable-UDP listener and returns the first accepted stream. No
//! heartbeat round-trip — the data plane takes over immediately.

use tokio::time::timeout;
use tunnel_transport::{BoxedSocket, Listener};

use crate::socket_wrapper::SocketWrapper;
use crate::tokens::{FSM_DEADLINE, SYN1, SYN2};
use crate::FsmError;

pub async fn run(wrapper: &mut SocketWrapper) -> Result<BoxedSocket, FsmError> {
    loop {
        match wrapper.recv_token(FSM_DEADLINE).await? {
            Some((buf, from)) if buf == SYN1 => {
                wrapper.remote_addr = from;
                break;
            }
            _ => continue,
        }
    }

    wrapper.send_token(SYN2).await?;
    wrapper.close_raw();

    let mut listener = wrapper.promote_to_kcp_listener().await?;
    let socket = timeout(FSM_DEADLINE, listener.accept())
        .await
        .map_err(|_| FsmError::Timeout("fn20: no reliable-UDP accept from peer"))??;

    Ok(socket)
}

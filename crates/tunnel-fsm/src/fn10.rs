//! Fn10: the passive/listening side of a direct hole-punch pairing
//! (paired with [`crate::fn11`]). Waits for the peer's `SYN1`, replies
//! `SYN2`, waits for `SYN3`, then hands the local port off to a
//! reliable-UDP listener and completes one heartbeat round-trip before
//! returning the accepted stream as the data-plane socket.

use tokio::time::timeout;
use tunnel_transport::{BoxedSocket, Listener, Socket};

use crate::socket_wrapper::SocketWrapper;
use crate::tokens::{FSM_DEADLINE, HEARTBEAT, SYN1, SYN2, SYN3};
use crate::FsmError;

const SYN3_WAIT_ATTEMPTS: u32 = 5;

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

    let mut received_syn3 = false;
    for attempt in 0..SYN3_WAIT_ATTEMPTS {
        match wrapper.recv_token(FSM_DEADLINE).await? {
            Some((buf, _)) if buf == SYN3 => {
                received_syn3 = true;
                break;
            }
            _ => {
                if attempt + 1 < SYN3_WAIT_ATTEMPTS {
                    wrapper.send_token(SYN2).await?;
                }
            }
        }
    }
    if !received_syn3 {
        return Err(FsmError::Timeout("fn10: no SYN3 from peer"));
    }

    wrapper.close_raw();
    let mut listener = wrapper.promote_to_kcp_listener().await?;
    let mut socket = timeout(FSM_DEADLINE, listener.accept())
        .await
        .map_err(|_| FsmError::Timeout("fn10: no reliable-UDP accept from peer"))??;

    let _ = socket.read_line().await?;
    socket.write_line(std::str::from_utf8(HEARTBEAT).unwrap()).await?;

    Ok(socket)
}

//! Fn11: the active/dialing side of a direct hole-punch pairing (paired
//! with [`crate::fn10`]). Sends `SYN1`, waits for `SYN2`, replies
//! `SYN3`, then dials a reliable-UDP session from the same local port
//! and completes one heartbeat round-trip. If the dial fails the raw
//! socket is killed and recreated (`KILL_KCP_SOCKET`) and `SYN3` is
//! resent.

use tunnel_transport::{BoxedSocket, Socket};

use crate::socket_wrapper::SocketWrapper;
use crate::tokens::{FSM_DEADLINE, HEARTBEAT, SYN1, SYN2, SYN3};
use crate::FsmError;

const SYN1_ATTEMPTS: u32 = 5;
const DIAL_ATTEMPTS: u32 = 5;

pub async fn run(wrapper: &mut SocketWrapper) -> Result<BoxedSocket, FsmError> {
    let mut received_syn2 = false;
    for attempt in 0..SYN1_ATTEMPTS {
        wrapper.send_token(SYN1).await?;
        match wrapper.recv_token(FSM_DEADLINE).await? {
            Some((buf, from)) if buf == SYN2 => {
                wrapper.remote_addr = from;
                received_syn2 = true;
                break;
            }
            _ => {
                if attempt + 1 == SYN1_ATTEMPTS {
                    break;
                }
            }
        }
    }
    if !received_syn2 {
        return Err(FsmError::Timeout("fn11: no SYN2 from peer"));
    }

    wrapper.send_token(SYN3).await?;
    wrapper.close_raw();

    let mut last_err = None;
    for attempt in 0..DIAL_ATTEMPTS {
        match wrapper.promote_to_kcp_dial().await {
            Ok(mut socket) => {
                socket.write_line(std::str::from_utf8(HEARTBEAT).unwrap()).await?;
                let reply = tokio::time::timeout(FSM_DEADLINE, socket.read_line())
                    .await
                    .map_err(|_| FsmError::Timeout("fn11: no heartbeat reply from peer"))??;
                if reply.trim() != std::str::from_utf8(HEARTBEAT).unwrap() {
                    return Err(FsmError::Protocol("fn11: unexpected reply to heartbeat"));
                }
                return Ok(Box::new(socket));
            }
            Err(e) => {
                last_err = Some(e);
                if attempt + 1 < DIAL_ATTEMPTS {
                    wrapper.kill_and_recreate_raw(5).await.map_err(FsmError::Io)?;
                    wrapper.send_token(SYN3).await?;
                    wrapper.close_raw();
                }
            }
        }
    }
    Err(FsmError::Transport(last_err.unwrap()))
}

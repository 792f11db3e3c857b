//! Glue between the hole-punching FSM library and the data-plane safety
//! handshake, shared by the tunnel-client and proxy loops: once an FSM
//! hands back a reliable-UDP session, one side must speak first. The
//! dialing FSMs (`Fn11`/`Fn21`/`Fn31`) take the client role; the
//! listening FSMs (`Fn10`/`Fn20`/`Fn30`) take the server role.

use tunnel_fsm::{FsmError, FsmName, SocketWrapper};
use tunnel_transport::BoxedSocket;

use crate::{client_handshake, server_handshake, DataplaneError};

pub async fn run_fsm_and_handshake(
    fsm_name: FsmName,
    wrapper: &mut SocketWrapper,
    secret_key: &[u8; 32],
) -> Result<BoxedSocket, DataplaneError> {
    let mut socket = tunnel_fsm::run(fsm_name, wrapper)
        .await
        .map_err(|e| DataplaneError::Fsm(e))?;

    match fsm_name {
        FsmName::Fn11 | FsmName::Fn21 | FsmName::Fn31 => {
            client_handshake(socket.as_mut(), secret_key).await?
        }
        FsmName::Fn10 | FsmName::Fn20 | FsmName::Fn30 => {
            server_handshake(socket.as_mut(), secret_key).await?
        }
        FsmName::Unsupported => return Err(DataplaneError::Fsm(FsmError::Unsupported)),
    }

    Ok(socket)
}

//! Fn31: identical to [`crate::fn21`] but invoked in asymmetric
//! pairings against an APDM peer running [`crate::fn30`]; it ends as a
//! reliable-UDP dialer the same way. Kept as a thin re-export rather
//! than a duplicate so the two stay in lockstep.

use tunnel_transport::BoxedSocket;

use crate::socket_wrapper::SocketWrapper;
use crate::FsmError;

pub async fn run(wrapper: &mut SocketWrapper) -> Result<BoxedSocket, FsmError> {
    crate::fn21::run(wrapper).await
}

//! Shared control-loop scaffolding used by both the client and server
//! control planes: the self-resetting heartbeat watchdog, the bounded
//! channels used for backpressure between a control loop's sibling
//! tasks, and the control-message sender/reader pair that carries
//! `Heartbeat`/`CreateTunnel` codes over the AES-encrypted control
//! socket.

pub mod channel;
pub mod control_msg;
pub mod heartbeat;

pub use channel::{
    control_msg_channel, pairing_channel, ControlMsgReceiver, ControlMsgSender, PendingPeer,
    RequestChan, RequestChanRx, WorkerChan, WorkerChanRx, CHANNEL_CAPACITY,
};
pub use control_msg::{run_control_msg_reader, run_control_msg_sender, SharedControlSocket};
pub use heartbeat::HeartbeatWatchdog;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Transport(#[from] tunnel_transport::TransportError),
    #[error(transparent)]
    Crypto(#[from] tunnel_crypto::CryptoError),
    #[error("control code could not be decoded")]
    BadControlCode,
}

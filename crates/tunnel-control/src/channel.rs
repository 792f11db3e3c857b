//! Bounded channels used for backpressure between a control loop's
//! sibling tasks: outbound control codes queued for the sender task,
//! and (server-side) pending proxy/worker sockets waiting to be paired.

use tokio::sync::mpsc;
use tunnel_proto::ControlCode;

/// Capacity shared by every bounded channel in the control plane; a
/// control loop that outpaces its peer by more than this many
/// in-flight items is making no progress anyway.
pub const CHANNEL_CAPACITY: usize = 100;

pub type ControlMsgSender = mpsc::Sender<ControlCode>;
pub type ControlMsgReceiver = mpsc::Receiver<ControlCode>;

pub fn control_msg_channel() -> (ControlMsgSender, ControlMsgReceiver) {
    mpsc::channel(CHANNEL_CAPACITY)
}

/// One leg of a pending P2P/classic pairing: a socket plus the metadata
/// the far side advertised when it dialed in.
pub struct PendingPeer<M> {
    pub socket: tunnel_transport::BoxedSocket,
    pub metadata: M,
}

pub type WorkerChan<M> = mpsc::Sender<PendingPeer<M>>;
pub type WorkerChanRx<M> = mpsc::Receiver<PendingPeer<M>>;
pub type RequestChan<M> = mpsc::Sender<PendingPeer<M>>;
pub type RequestChanRx<M> = mpsc::Receiver<PendingPeer<M>>;

pub fn pairing_channel<M>() -> (mpsc::Sender<PendingPeer<M>>, mpsc::Receiver<PendingPeer<M>>) {
    mpsc::channel(CHANNEL_CAPACITY)
}

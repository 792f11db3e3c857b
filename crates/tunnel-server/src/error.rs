use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("CONFIG_INVALID: {0}")]
    ConfigInvalid(String),
    #[error(transparent)]
    Transport(#[from] tunnel_transport::TransportError),
    #[error(transparent)]
    Control(#[from] tunnel_control::ControlError),
    #[error(transparent)]
    Dataplane(#[from] tunnel_dataplane::DataplaneError),
    #[error(transparent)]
    Crypto(#[from] tunnel_crypto::CryptoError),
    #[error(transparent)]
    Metadata(#[from] tunnel_proto::MetadataError),
    #[error("FSM_FAIL: {0}")]
    Fsm(#[from] tunnel_fsm::FsmError),
    #[error("non-utf8 payload: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("INCOMPATIBLE_NAT_PAIR: no FSM bridges this NAT pairing")]
    IncompatibleNatPair,
    #[error("HEARTBEAT_TIMEOUT: client heartbeat watchdog expired")]
    HeartbeatTimeout,
}

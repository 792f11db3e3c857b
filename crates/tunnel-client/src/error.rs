use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("CONFIG_INVALID: {0}")]
    ConfigInvalid(#[from] tunnel_config::ConfigError),
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
    #[error("STUN_FAIL: {0}")]
    Stun(#[from] tunnel_stun::StunClassifyError),
    #[error("HANDSHAKE_FAIL: server replied with status {0}")]
    HandshakeFail(u16),
    #[error("HEARTBEAT_TIMEOUT: server heartbeat watchdog expired")]
    HeartbeatTimeout,
    #[error("INCOMPATIBLE_NAT_PAIR: no FSM bridges this NAT pairing")]
    IncompatibleNatPair,
    #[error("PEER_CLOSED")]
    PeerClosed,
    #[error("non-utf8 payload: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

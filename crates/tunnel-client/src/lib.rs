//! Client-side control loop: one [`service::run_service`] per configured
//! service, each registering with the server and then running its own
//! heartbeat/control-msg/tunnel-creation siblings until the control
//! socket closes.

pub mod error;
pub mod p2p;
pub mod service;
pub mod tunnel_creator;

pub use error::ClientError;
pub use service::{run_service, ServiceContext};

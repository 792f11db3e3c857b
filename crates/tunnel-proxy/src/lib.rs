//! Proxy loop: a local TCP listener whose accepted connections each
//! open an independent P2P rendezvous with the server and, once a
//! hole-punching FSM completes, get spliced onto the reliable-UDP
//! session. Config-wise a proxy service section is shaped exactly like
//! a client one (`InternalAddr`/`Port`/`Type` is where the proxy
//! listens for local applications; `TunnelType`/`TunnelPort` name the
//! server's P2P tunnel listener).

pub mod error;
pub mod session;

pub use error::ProxyError;
pub use session::{run_proxy, ProxyContext};

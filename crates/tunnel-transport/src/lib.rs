//! Transport abstraction layer: a unified [`Socket`]/[`Listener`]
//! capability over TCP4/TCP6, KCP4/KCP6 (reliable UDP), and
//! SSH-tunnelled TCP, plus the ephemeral-port helper used when a
//! service's tunnel port isn't pinned by configuration.

pub mod dial;
pub mod kcp;
pub mod port;
pub mod socket;
pub mod ssh;
pub mod tcp;

pub use dial::{dial, dial_ssh, listen, wildcard_addr};
pub use kcp::{KcpListenerSocket, KcpSocket};
pub use port::{get_available_port, PORT_QUIESCENCE};
pub use socket::{BoxedListener, BoxedSocket, Listener, Socket, TransportError};
pub use ssh::SshSocket;
pub use tcp::{TcpListener, TcpSocket};

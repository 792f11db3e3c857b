//! Public API for Rust applications embedding the tunnel system directly,
//! rather than shelling out to the `ptunnel-*` binaries.
//!
//! This crate re-exports every other crate's entry points and adds
//! [`run_client`]/[`run_server`]/[`run_proxy`] convenience wrappers that
//! load a config file, resolve its RSA keys and NAT type, and dispatch
//! into the matching crate.
//!
//! # Architecture
//!
//! - **`tunnel-proto`**: wire message types and the metadata codec
//! - **`tunnel-crypto`**: RSA/AES primitives and key-pair generation
//! - **`tunnel-transport`**: TCP/KCP/SSH socket abstraction
//! - **`tunnel-stun`**: NAT behaviour discovery
//! - **`tunnel-fsm`**: hole-punching state machines
//! - **`tunnel-control`**: heartbeat and control-message plumbing
//! - **`tunnel-dataplane`**: tunnel safety handshake and relay loops
//! - **`tunnel-config`**: INI config file loading
//! - **`tunnel-client`** / **`tunnel-server`** / **`tunnel-proxy`**: the
//!   three roles built on top of the above

pub mod error;
pub mod run;

pub use error::LibError;
pub use run::{run_client, run_proxy, run_server};

pub use tunnel_client::{ClientError, ServiceContext as ClientServiceContext};
pub use tunnel_config::{
    ClientServiceConfig, CommonConfig, ConfigError, LogLevel, LogTarget, ServerServiceConfig,
};
pub use tunnel_crypto::{generate_keypair, load_private_key, load_public_key, CryptoError, RsaKeyPair};
pub use tunnel_proto::{ControlCode, Metadata, MetadataError, TransportKind};
pub use tunnel_proxy::{ProxyContext, ProxyError};
pub use tunnel_server::{ServerError, ServiceContext as ServerServiceContext};
pub use tunnel_stun::{NatClass, StunClassifier, StunClassifyError, StunConfig, NAT_TYPE_AUTO, NAT_TYPE_DIRECT};

//! Server-side control loop: accept control connections on
//! `CommonConfig::server_type`/`server_port`, and run one
//! [`service::run_service`] per accepted connection until it registers
//! and tears down on its own.

pub mod error;
pub mod p2p;
pub mod pairing;
pub mod service;

pub use error::ServerError;
pub use service::{run_service, ServiceContext};

use std::str::FromStr;

use rsa::RsaPrivateKey;
use tunnel_config::{CommonConfig, ServerServiceConfig};
use tunnel_proto::TransportKind;
use tunnel_transport::{listen, wildcard_addr, Listener};

/// Bind the control listener and spawn one [`service::run_service`] per
/// accepted connection, forever. `services` is validated and logged but
/// otherwise informational here: every listener this server binds is
/// created dynamically from each accepted `ClientHello`, not from a
/// statically pre-bound config entry.
pub async fn run_server(
    common: CommonConfig,
    services: Vec<ServerServiceConfig>,
    private_key: RsaPrivateKey,
) -> Result<(), ServerError> {
    for service in &services {
        tracing::info!(
            name = %service.name,
            tunnel_type = %service.tunnel_type,
            proxy_port = ?service.proxy_port,
            "configured service entry"
        );
    }

    let server_type = TransportKind::from_str(&common.server_type)
        .map_err(ServerError::ConfigInvalid)?;
    let control_addr = wildcard_addr(server_type, common.server_port);
    let mut control_listener = listen(server_type, control_addr).await?;

    tracing::info!(addr = %control_addr, "control listener bound");

    loop {
        let control_socket = control_listener.accept().await?;
        let ctx = ServiceContext { common: common.clone(), private_key: private_key.clone() };
        tokio::spawn(async move {
            if let Err(e) = service::run_service(ctx, control_socket).await {
                tracing::warn!(error = %e, "service control loop ended");
            }
        });
    }
}

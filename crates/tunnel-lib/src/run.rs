//! One-call convenience wrappers: load a config file, resolve its RSA
//! keys and NAT type, and run every configured service to completion (or
//! until the caller drops the future). For CLI-style process lifetime
//! and flag handling, use the `ptunnel-*` binaries instead.

use std::path::Path;

use tunnel_config::{load_client_config, load_server_config, CommonConfig};
use tunnel_stun::{StunClassifier, StunConfig, NAT_TYPE_AUTO};

use crate::error::LibError;

async fn resolve_nat_type(common: &CommonConfig) -> Result<i32, LibError> {
    if common.nat_type != NAT_TYPE_AUTO {
        return Ok(common.nat_type);
    }
    let classifier = StunClassifier::bind(&StunConfig::default()).await?;
    Ok(classifier.classify().await?.code())
}

/// Load a client config file and run every service in it concurrently,
/// returning once all of them have exited.
pub async fn run_client(config_path: impl AsRef<Path>) -> Result<(), LibError> {
    let (common, services) = load_client_config(config_path)?;
    let public_key_file = common.public_key_file.as_deref().ok_or(LibError::MissingKeyFile("PublicKeyFile"))?;
    let server_pubkey = tunnel_crypto::load_public_key(Path::new(public_key_file))?;
    let nat_type = resolve_nat_type(&common).await?;

    let mut tasks = tokio::task::JoinSet::new();
    for service in services {
        let ctx = tunnel_client::ServiceContext {
            common: common.clone(),
            service,
            server_pubkey: server_pubkey.clone(),
            nat_type,
        };
        tasks.spawn(async move { tunnel_client::run_service(ctx).await });
    }
    while let Some(result) = tasks.join_next().await {
        if let Ok(Err(e)) = result {
            tracing::warn!(error = %e, "client service ended with an error");
        }
    }
    Ok(())
}

/// Load a server config file and run the control listener until the
/// caller drops the future.
pub async fn run_server(config_path: impl AsRef<Path>) -> Result<(), LibError> {
    let (common, services) = load_server_config(config_path)?;
    let private_key_file = common.private_key_file.as_deref().ok_or(LibError::MissingKeyFile("PrivateKeyFile"))?;
    let private_key = tunnel_crypto::load_private_key(Path::new(private_key_file))?;

    tunnel_server::run_server(common, services, private_key).await?;
    Ok(())
}

/// Load a proxy config file and run every service in it concurrently,
/// returning once all of them have exited.
pub async fn run_proxy(config_path: impl AsRef<Path>) -> Result<(), LibError> {
    let (common, services) = load_client_config(config_path)?;
    let public_key_file = common.public_key_file.as_deref().ok_or(LibError::MissingKeyFile("PublicKeyFile"))?;
    let server_pubkey = tunnel_crypto::load_public_key(Path::new(public_key_file))?;
    let nat_type = resolve_nat_type(&common).await?;

    let mut tasks = tokio::task::JoinSet::new();
    for service in services {
        let ctx = tunnel_proxy::ProxyContext {
            common: common.clone(),
            service,
            server_pubkey: server_pubkey.clone(),
            nat_type,
        };
        tasks.spawn(async move { tunnel_proxy::run_proxy(ctx).await });
    }
    while let Some(result) = tasks.join_next().await {
        if let Ok(Err(e)) = result {
            tracing::warn!(error = %e, "proxy service ended with an error");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_client_reports_missing_config_file() {
        let err = run_client("/nonexistent/ptunnel-test/client.ini").await.unwrap_err();
        assert!(matches!(err, LibError::Config(_)));
    }

    #[tokio::test]
    async fn run_server_reports_missing_config_file() {
        let err = run_server("/nonexistent/ptunnel-test/server.ini").await.unwrap_err();
        assert!(matches!(err, LibError::Config(_)));
    }

    #[tokio::test]
    async fn run_proxy_reports_missing_config_file() {
        let err = run_proxy("/nonexistent/ptunnel-test/proxy.ini").await.unwrap_err();
        assert!(matches!(err, LibError::Config(_)));
    }
}

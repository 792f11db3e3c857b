//! INI config file loading. `[common]` holds process-wide settings
//! ([`common::CommonConfig`]); every other section defines one service,
//! parsed as either a [`service::ClientServiceConfig`] (client/proxy
//! config files) or a [`service::ServerServiceConfig`] (server config
//! file).

pub mod common;
pub mod error;
pub mod service;

pub use common::{CommonConfig, LogLevel, LogTarget};
pub use error::ConfigError;
pub use service::{ClientServiceConfig, ServerServiceConfig};

use ini::Ini;
use std::path::Path;

pub const DEFAULT_CLIENT_CONFIG_PATH: &str = "./conf/client.ini";
pub const DEFAULT_SERVER_CONFIG_PATH: &str = "./conf/server.ini";
pub const DEFAULT_PROXY_CONFIG_PATH: &str = "./conf/proxy.ini";

fn load_common(ini: &Ini) -> Result<CommonConfig, ConfigError> {
    match ini.section(Some("common")) {
        Some(props) => CommonConfig::from_ini_section(props),
        None => Ok(CommonConfig::default()),
    }
}

/// Load a client- or proxy-side config file: `[common]` plus one
/// [`ClientServiceConfig`] per remaining section.
pub fn load_client_config(path: impl AsRef<Path>) -> Result<(CommonConfig, Vec<ClientServiceConfig>), ConfigError> {
    let ini = Ini::load_from_file(path)?;
    let common = load_common(&ini)?;

    let mut services = Vec::new();
    for (section, props) in ini.iter() {
        let Some(name) = section else { continue };
        if name == "common" {
            continue;
        }
        services.push(ClientServiceConfig::from_ini_section(name, props)?);
    }
    Ok((common, services))
}

/// Load a server-side config file: `[common]` plus one
/// [`ServerServiceConfig`] per remaining section.
pub fn load_server_config(path: impl AsRef<Path>) -> Result<(CommonConfig, Vec<ServerServiceConfig>), ConfigError> {
    let ini = Ini::load_from_file(path)?;
    let common = load_common(&ini)?;

    let mut services = Vec::new();
    for (section, props) in ini.iter() {
        let Some(name) = section else { continue };
        if name == "common" {
            continue;
        }
        services.push(ServerServiceConfig::from_ini_section(name, props)?);
    }
    Ok((common, services))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_common_and_one_service() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[common]\nServerPort=7000\nLogLevel=debug\n\n[web]\nInternalAddr=127.0.0.1\nInternalPort=8080\nInternalType=tcp4\nTunnelType=tcp4\nTunnelEncrypt=false\nExternalPort=9000\nExternalType=tcp4\n"
        )
        .unwrap();

        let (common, services) = load_client_config(file.path()).unwrap();
        assert_eq!(common.server_port, 7000);
        assert_eq!(common.log_level, LogLevel::Debug);
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].name, "web");
        assert_eq!(services[0].external_port, Some(9000));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_client_config("/nonexistent/path.ini").is_err());
    }
}

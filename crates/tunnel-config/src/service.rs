//! Per-service sections: every section other than `[common]` defines one
//! tunnel. The client-side and server-side config files use different
//! (slightly overlapping) key sets, so they get distinct structs.

use ini::Properties;

use crate::common::parse_field;
use crate::error::ConfigError;

/// A section in the client/proxy config file: a service exposed from
/// this host's internal address out through the server.
#[derive(Debug, Clone)]
pub struct ClientServiceConfig {
    pub name: String,
    pub internal_addr: String,
    pub internal_port: u16,
    pub internal_type: String,
    pub tunnel_type: String,
    pub tunnel_encrypt: bool,
    /// `None` for P2P tunnel types, required otherwise.
    pub external_port: Option<u16>,
    pub external_type: Option<String>,
    /// Requested tunnel port; 0 or absent means "let the server assign one".
    pub tunnel_port: u16,
    pub p2p_addr_v4: Option<String>,
    pub p2p_addr_v6: Option<String>,
    pub p2p_port: Option<u16>,
}

impl ClientServiceConfig {
    pub fn from_ini_section(name: &str, props: &Properties) -> Result<Self, ConfigError> {
        let tunnel_type = require(props, "TunnelType", name)?.to_string();
        let is_p2p = tunnel_type.starts_with("p2p");

        let external_port = match props.get("ExternalPort") {
            Some(v) => Some(parse_field(v, "ExternalPort", name)?),
            None if is_p2p => None,
            None => return Err(ConfigError::MissingKey("ExternalPort", name.to_string())),
        };
        let external_type = match props.get("ExternalType") {
            Some(v) => Some(v.to_string()),
            None if is_p2p => None,
            None => return Err(ConfigError::MissingKey("ExternalType", name.to_string())),
        };

        Ok(Self {
            name: name.to_string(),
            internal_addr: require(props, "InternalAddr", name)?.to_string(),
            internal_port: parse_field(require(props, "InternalPort", name)?, "InternalPort", name)?,
            internal_type: require(props, "InternalType", name)?.to_string(),
            tunnel_type,
            tunnel_encrypt: parse_field(require(props, "TunnelEncrypt", name)?, "TunnelEncrypt", name)?,
            external_port,
            external_type,
            tunnel_port: props
                .get("TunnelPort")
                .map(|v| parse_field(v, "TunnelPort", name))
                .transpose()?
                .unwrap_or(0),
            p2p_addr_v4: props.get("P2PAddrV4").map(str::to_string),
            p2p_addr_v6: props.get("P2PAddrV6").map(str::to_string),
            p2p_port: props
                .get("P2PPort")
                .map(|v| parse_field(v, "P2PPort", name))
                .transpose()?,
        })
    }

    pub fn is_p2p(&self) -> bool {
        self.tunnel_type.starts_with("p2p")
    }
}

/// A section in the server config file: either a classic tunnel entry
/// (listens on `ExternalPort`) or a proxy-oriented entry (listens on
/// `ProxyPort` for P2P third parties).
#[derive(Debug, Clone)]
pub struct ServerServiceConfig {
    pub name: String,
    pub proxy_port: Option<u16>,
    pub proxy_type: Option<String>,
    pub tunnel_port: u16,
    pub tunnel_type: String,
}

impl ServerServiceConfig {
    pub fn from_ini_section(name: &str, props: &Properties) -> Result<Self, ConfigError> {
        Ok(Self {
            name: name.to_string(),
            proxy_port: props
                .get("ProxyPort")
                .map(|v| parse_field(v, "ProxyPort", name))
                .transpose()?,
            proxy_type: props.get("ProxyType").map(str::to_string),
            tunnel_port: props
                .get("TunnelPort")
                .map(|v| parse_field(v, "TunnelPort", name))
                .transpose()?
                .unwrap_or(0),
            tunnel_type: require(props, "TunnelType", name)?.to_string(),
        })
    }
}

fn require<'a>(props: &'a Properties, key: &'static str, section: &str) -> Result<&'a str, ConfigError> {
    props.get(key).ok_or_else(|| ConfigError::MissingKey(key, section.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ini::Ini;

    #[test]
    fn classic_client_service_requires_external_fields() {
        let ini = Ini::load_from_str(
            "[web]\nInternalAddr=127.0.0.1\nInternalPort=8080\nInternalType=tcp4\nTunnelType=tcp4\nTunnelEncrypt=false\n",
        )
        .unwrap();
        let props = ini.section(Some("web")).unwrap();
        let err = ClientServiceConfig::from_ini_section("web", props).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("ExternalPort", _)));
    }

    #[test]
    fn p2p_client_service_does_not_require_external_fields() {
        let ini = Ini::load_from_str(
            "[web]\nInternalAddr=127.0.0.1\nInternalPort=8080\nInternalType=tcp4\nTunnelType=p2p-kcp4\nTunnelEncrypt=true\n",
        )
        .unwrap();
        let props = ini.section(Some("web")).unwrap();
        let cfg = ClientServiceConfig::from_ini_section("web", props).unwrap();
        assert!(cfg.is_p2p());
        assert!(cfg.external_port.is_none());
    }
}

//! `[common]` section: process-wide settings shared by every service in
//! the file, plus the CLI flags of the same name (CLI values override
//! the config file's when both are supplied — see `tunnel-cli`).

use ini::Properties;
use tunnel_stun::types::NAT_TYPE_AUTO;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigError::BadValue("LogLevel", "common".into(), other.into())),
        }
    }
}

/// Where log output goes: `console` or a rolling file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Console,
    File(String),
}

#[derive(Debug, Clone)]
pub struct CommonConfig {
    pub public_key_file: Option<String>,
    pub private_key_file: Option<String>,
    pub n_bits_file: Option<String>,
    pub server_addr_v4: Option<String>,
    pub server_addr_v6: Option<String>,
    pub server_port: u16,
    pub server_type: String,
    pub log_target: LogTarget,
    pub log_level: LogLevel,
    pub log_max_days: u32,
    /// -1 = auto-classify via STUN, -2 = directly reachable, 0..8 = a
    /// fixed NAT classification code.
    pub nat_type: i32,
    pub heartbeat_timeout_secs: u64,
    pub ssh_port: Option<u16>,
    pub ssh_user: Option<String>,
    pub ssh_private_key_file: Option<String>,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            public_key_file: None,
            private_key_file: None,
            n_bits_file: None,
            server_addr_v4: None,
            server_addr_v6: None,
            server_port: 7000,
            server_type: "tcp4".into(),
            log_target: LogTarget::Console,
            log_level: LogLevel::Info,
            log_max_days: 7,
            nat_type: NAT_TYPE_AUTO,
            heartbeat_timeout_secs: 30,
            ssh_port: None,
            ssh_user: None,
            ssh_private_key_file: None,
        }
    }
}

impl CommonConfig {
    pub fn from_ini_section(props: &Properties) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(v) = props.get("PublicKeyFile") {
            cfg.public_key_file = Some(v.to_string());
        }
        if let Some(v) = props.get("PrivateKeyFile") {
            cfg.private_key_file = Some(v.to_string());
        }
        if let Some(v) = props.get("NBitsFile") {
            cfg.n_bits_file = Some(v.to_string());
        }
        if let Some(v) = props.get("ServerAddrV4") {
            cfg.server_addr_v4 = Some(v.to_string());
        }
        if let Some(v) = props.get("ServerAddrV6") {
            cfg.server_addr_v6 = Some(v.to_string());
        }
        if let Some(v) = props.get("ServerPort") {
            cfg.server_port = parse_field(v, "ServerPort", "common")?;
        }
        if let Some(v) = props.get("ServerType") {
            cfg.server_type = v.to_string();
        }
        if let Some(v) = props.get("LogFile") {
            cfg.log_target = if v.eq_ignore_ascii_case("console") {
                LogTarget::Console
            } else {
                LogTarget::File(v.to_string())
            };
        }
        if let Some(v) = props.get("LogLevel") {
            cfg.log_level = v.parse()?;
        }
        if let Some(v) = props.get("LogMaxDays") {
            cfg.log_max_days = parse_field(v, "LogMaxDays", "common")?;
        }
        if let Some(v) = props.get("NatType") {
            cfg.nat_type = parse_field(v, "NatType", "common")?;
        }
        if let Some(v) = props.get("HeartbeatTimeout") {
            cfg.heartbeat_timeout_secs = parse_field(v, "HeartbeatTimeout", "common")?;
        }
        if let Some(v) = props.get("SshPort") {
            cfg.ssh_port = Some(parse_field(v, "SshPort", "common")?);
        }
        if let Some(v) = props.get("SshUser") {
            cfg.ssh_user = Some(v.to_string());
        }
        if let Some(v) = props.get("SshPrivateKeyFile") {
            cfg.ssh_private_key_file = Some(v.to_string());
        }

        Ok(cfg)
    }
}

pub(crate) fn parse_field<T: std::str::FromStr>(
    raw: &str,
    key: &'static str,
    section: &str,
) -> Result<T, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::BadValue(key, section.to_string(), raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_nat_type_auto() {
        let cfg = CommonConfig::default();
        assert_eq!(cfg.nat_type, NAT_TYPE_AUTO);
        assert_eq!(cfg.log_target, LogTarget::Console);
    }
}

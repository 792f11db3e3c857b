//! String-keyed attribute map shared by every control-plane exchange.
//!
//! The wire format is JSON. Values are either strings or booleans;
//! numeric fields (ports, timeouts, NAT type codes) are carried as
//! decimal-string values so that the map stays a flat `string -> string|bool`
//! shape, matching the reserved keys in the specification
//! (`SecretKey`, `ExternalPort`, `TunnelType`, `NATType`, ...).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single metadata value: either a string or a boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Str(String),
    Bool(bool),
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Str(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Str(v)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

/// Generic string-to-value attribute map, JSON-encoded on the wire.
///
/// Newline framing means values must never contain raw newlines; callers
/// encode numeric fields as decimal strings rather than JSON numbers so the
/// whole map stays string|bool-valued.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata(HashMap<String, MetaValue>);

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("missing required key {0}")]
    MissingKey(&'static str),
    #[error("key {0} has the wrong type")]
    WrongType(&'static str),
    #[error("key {0} is not a valid integer: {1}")]
    BadInteger(&'static str, std::num::ParseIntError),
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<MetaValue>) -> &mut Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn set_u16(&mut self, key: &str, value: u16) -> &mut Self {
        self.set(key, value.to_string())
    }

    pub fn set_i64(&mut self, key: &str, value: i64) -> &mut Self {
        self.set(key, value.to_string())
    }

    pub fn get_str(&self, key: &'static str) -> Result<&str, MetadataError> {
        match self.0.get(key) {
            Some(MetaValue::Str(s)) => Ok(s),
            Some(MetaValue::Bool(_)) => Err(MetadataError::WrongType(key)),
            None => Err(MetadataError::MissingKey(key)),
        }
    }

    pub fn get_str_opt(&self, key: &'static str) -> Option<&str> {
        match self.0.get(key) {
            Some(MetaValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &'static str) -> Result<bool, MetadataError> {
        match self.0.get(key) {
            Some(MetaValue::Bool(b)) => Ok(*b),
            Some(MetaValue::Str(s)) => s.parse().map_err(|_| MetadataError::WrongType(key)),
            None => Err(MetadataError::MissingKey(key)),
        }
    }

    pub fn get_bool_opt(&self, key: &'static str) -> Option<bool> {
        self.get_bool(key).ok()
    }

    pub fn get_u16(&self, key: &'static str) -> Result<u16, MetadataError> {
        self.get_str(key)?
            .parse()
            .map_err(|e| MetadataError::BadInteger(key, e))
    }

    pub fn get_u16_opt(&self, key: &'static str) -> Option<u16> {
        self.get_str_opt(key).and_then(|s| s.parse().ok())
    }

    pub fn get_i64(&self, key: &'static str) -> Result<i64, MetadataError> {
        self.get_str(key)?
            .parse()
            .map_err(|e| MetadataError::BadInteger(key, e))
    }

    pub fn to_json(&self) -> Result<String, MetadataError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, MetadataError> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Reserved keys used across the handshake and rendezvous exchanges.
pub mod keys {
    pub const SECRET_KEY: &str = "SecretKey";
    pub const SALT: &str = "Salt";
    pub const EXTERNAL_PORT: &str = "ExternalPort";
    pub const EXTERNAL_TYPE: &str = "ExternalType";
    pub const TUNNEL_PORT: &str = "TunnelPort";
    pub const TUNNEL_TYPE: &str = "TunnelType";
    pub const TUNNEL_ENCRYPT: &str = "TunnelEncrypt";
    pub const STATUS: &str = "Status";
    pub const HEARTBEAT_TIMEOUT: &str = "HeartbeatTimeout";
    pub const SSH_PORT: &str = "SshPort";
    pub const SSH_USER: &str = "SshUser";
    pub const TYPE: &str = "Type";
    pub const NAT_TYPE: &str = "NATType";
    pub const ADDR: &str = "Addr";
    pub const PORT: &str = "Port";
    pub const NETWORK: &str = "Network";
    pub const RADDR: &str = "RAddr";
    pub const RPORT: &str = "RPort";
    pub const RNETWORK: &str = "RNetwork";
    pub const FSM_TYPE: &str = "FSMType";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let mut m = Metadata::new();
        m.set(keys::SECRET_KEY, "abc123")
            .set_u16(keys::EXTERNAL_PORT, 2222)
            .set(keys::TUNNEL_ENCRYPT, true);

        let json = m.to_json().unwrap();
        let back = Metadata::from_json(&json).unwrap();
        assert_eq!(m, back);
        assert_eq!(back.get_str(keys::SECRET_KEY).unwrap(), "abc123");
        assert_eq!(back.get_u16(keys::EXTERNAL_PORT).unwrap(), 2222);
        assert!(back.get_bool(keys::TUNNEL_ENCRYPT).unwrap());
    }

    #[test]
    fn missing_key_errors() {
        let m = Metadata::new();
        assert!(matches!(
            m.get_str(keys::SECRET_KEY),
            Err(MetadataError::MissingKey(_))
        ));
    }
}

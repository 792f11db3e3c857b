//! RFC 5780 NAT behaviour discovery: mapping tests (§4.3) and filtering
//! tests (§4.4), run against a configured STUN server.
//!
//! The five-exchange worst case (full mapping sweep + full filtering
//! sweep) happens only for an Address-and-Port-Dependent NAT; anything
//! less restrictive short-circuits earlier. Filtering Test I is the same
//! exchange as Mapping Test I, so the two sweeps share one request.

use crate::message::{StunMessage, CHANGE_IP, CHANGE_PORT};
use crate::types::{FilteringType, MappingType, NatClass};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct StunConfig {
    pub server: String,
    pub timeout: Duration,
}

impl Default for StunConfig {
    fn default() -> Self {
        Self {
            server: "stun.miwifi.com:3478".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Error)]
pub enum StunClassifyError {
    #[error("STUN_FAIL: could not resolve or bind to {0}")]
    Bind(std::io::Error),
    #[error("STUN_FAIL: {0}")]
    Io(#[from] std::io::Error),
}

pub struct StunClassifier {
    socket: UdpSocket,
    server_addr: SocketAddr,
    timeout: Duration,
}

impl StunClassifier {
    pub async fn bind(config: &StunConfig) -> Result<Self, StunClassifyError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(StunClassifyError::Bind)?;
        let server_addr = tokio::net::lookup_host(&config.server)
            .await
            .map_err(StunClassifyError::Bind)?
            .next()
            .ok_or_else(|| StunClassifyError::Bind(std::io::Error::new(std::io::ErrorKind::NotFound, "no address for STUN server")))?;
        Ok(Self {
            socket,
            server_addr,
            timeout: config.timeout,
        })
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Send a request and wait for a reply, racing a single timer.
    async fn exchange(&self, dest: SocketAddr, req: &StunMessage) -> std::io::Result<Option<StunMessage>> {
        let encoded = req.encode();
        self.socket.send_to(&encoded, dest).await?;

        let mut buf = [0u8; 1500];
        match timeout(self.timeout, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((n, _from))) => Ok(StunMessage::decode(&buf[..n]).ok()),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Ok(None),
        }
    }

    /// Run the full mapping + filtering sweep and return the classification.
    pub async fn classify(&self) -> Result<NatClass, StunClassifyError> {
        // Mapping/Filtering Test I.
        let req1 = StunMessage::new_binding_request();
        let resp1 = self.exchange(self.server_addr, &req1).await?;
        let Some(resp1) = resp1 else {
            debug!("STUN test I timed out");
            return Ok(NatClass::Unknown);
        };

        let Some(other_address) = resp1.other_address else {
            debug!("STUN server did not advertise OTHER-ADDRESS; cannot classify");
            return Ok(NatClass::Unknown);
        };
        let Some(mapping1) = resp1.mapped_address else {
            return Ok(NatClass::Unknown);
        };

        if Some(mapping1) == self.local_addr().ok() {
            return Ok(NatClass::Direct);
        }

        let mapping = self.run_mapping_tests(mapping1, other_address).await?;
        let filtering = self.run_filtering_tests().await?;

        match filtering {
            Some(filtering) => Ok(NatClass::Classified(mapping, filtering)),
            None => Ok(NatClass::Unknown),
        }
    }

    async fn run_mapping_tests(
        &self,
        mapping1: SocketAddr,
        other_address: SocketAddr,
    ) -> Result<MappingType, StunClassifyError> {
        // Test II: same request, sent to (other IP, primary port).
        let dest2 = SocketAddr::new(other_address.ip(), self.server_addr.port());
        let req2 = StunMessage::new_binding_request();
        let resp2 = self.exchange(dest2, &req2).await?;
        let mapping2 = resp2.and_then(|m| m.mapped_address);

        if mapping2 == Some(mapping1) {
            return Ok(MappingType::Eim);
        }

        // Test III: send to (other IP, other port).
        let req3 = StunMessage::new_binding_request();
        let resp3 = self.exchange(other_address, &req3).await?;
        let mapping3 = resp3.and_then(|m| m.mapped_address);

        if mapping3.is_some() && mapping3 == mapping2 {
            Ok(MappingType::Adm)
        } else {
            Ok(MappingType::Apdm)
        }
    }

    async fn run_filtering_tests(&self) -> Result<Option<FilteringType>, StunClassifyError> {
        // Test II: ask the server to reply from a different IP and port.
        let req2 = StunMessage::new_binding_request().with_change_request(CHANGE_IP | CHANGE_PORT);
        if self.exchange(self.server_addr, &req2).await?.is_some() {
            return Ok(Some(FilteringType::Eif));
        }

        // Test III: ask the server to reply from the same IP, different port.
        let req3 = StunMessage::new_binding_request().with_change_request(CHANGE_PORT);
        match self.exchange(self.server_addr, &req3).await {
            Ok(Some(_)) => Ok(Some(FilteringType::Adf)),
            Ok(None) => Ok(Some(FilteringType::Apdf)),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_example() {
        let cfg = StunConfig::default();
        assert_eq!(cfg.server, "stun.miwifi.com:3478");
        assert_eq!(cfg.timeout, Duration::from_secs(5));
    }
}

//! NAT-type resolution shared by `ptunnel-client` and `ptunnel-proxy`:
//! `[common]`'s `NatType` is either a fixed code, the `DIRECT` sentinel,
//! or `-1` ("probe it via STUN at startup").

use tunnel_config::CommonConfig;
use tunnel_stun::{StunClassifier, StunConfig, NAT_TYPE_AUTO};

pub async fn resolve(common: &CommonConfig) -> anyhow::Result<i32> {
    if common.nat_type != NAT_TYPE_AUTO {
        return Ok(common.nat_type);
    }

    tracing::info!("NatType not configured, probing via STUN");
    let classifier = StunClassifier::bind(&StunConfig::default()).await?;
    let class = classifier.classify().await?;
    tracing::info!(nat_class = %class, code = class.code(), "STUN classification complete");
    Ok(class.code())
}

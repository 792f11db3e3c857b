//! STUN-based NAT behaviour discovery (RFC 5780 §4.3-4.4): a minimal
//! message codec plus the mapping/filtering test sweep that turns a few
//! STUN exchanges into a composite NAT classification.

pub mod classifier;
pub mod message;
pub mod types;

pub use classifier::{StunClassifier, StunClassifyError, StunConfig};
pub use message::{StunError, StunMessage, CHANGE_IP, CHANGE_PORT};
pub use types::{
    decode_nat_code, nat_code, FilteringType, MappingType, NatClass, NAT_TYPE_AUTO, NAT_TYPE_DIRECT,
};

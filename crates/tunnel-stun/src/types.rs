//! NAT classification types (RFC 5780 §4.3-4.4).

use std::fmt;

/// How a NAT chooses the public (addr, port) mapping as a function of
/// destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MappingType {
    /// Endpoint-Independent Mapping: same mapping regardless of destination.
    Eim = 0,
    /// Address-Dependent Mapping: new mapping per destination IP.
    Adm = 1,
    /// Address-and-Port-Dependent Mapping: new mapping per destination IP+port.
    Apdm = 2,
}

/// Which external senders a NAT permits to reach a mapped endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum FilteringType {
    Eif = 0,
    Adf = 1,
    Apdf = 2,
}

/// Sentinel used on the wire (and in CLI `--nat-type`) to mean
/// "auto-classify via STUN at startup".
pub const NAT_TYPE_AUTO: i32 = -1;

/// Sentinel meaning "this host is directly reachable, no NAT present".
pub const NAT_TYPE_DIRECT: i32 = -2;

/// Composite NAT code: `mapping*3 + filtering`, matching the pairing
/// matrices in the hole-punching FSM library.
pub fn nat_code(mapping: MappingType, filtering: FilteringType) -> i32 {
    mapping as i32 * 3 + filtering as i32
}

/// Decode a composite NAT code (0..=8) back into its components.
pub fn decode_nat_code(code: i32) -> Option<(MappingType, FilteringType)> {
    if !(0..=8).contains(&code) {
        return None;
    }
    let mapping = match code / 3 {
        0 => MappingType::Eim,
        1 => MappingType::Adm,
        _ => MappingType::Apdm,
    };
    let filtering = match code % 3 {
        0 => FilteringType::Eif,
        1 => FilteringType::Adf,
        _ => FilteringType::Apdf,
    };
    Some((mapping, filtering))
}

/// Outcome of a STUN classification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NatClass {
    /// No NAT detected; the local socket's mapped address equals its
    /// local address.
    Direct,
    /// A NAT was detected and both mapping and filtering behaviour were
    /// classified.
    Classified(MappingType, FilteringType),
    /// The STUN server's replies weren't complete enough to classify
    /// (e.g. no OTHER-ADDRESS, or a timeout on a required probe).
    Unknown,
}

impl NatClass {
    pub fn code(self) -> i32 {
        match self {
            NatClass::Direct => NAT_TYPE_DIRECT,
            NatClass::Unknown => NAT_TYPE_AUTO,
            NatClass::Classified(m, f) => nat_code(m, f),
        }
    }
}

impl fmt::Display for NatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NatClass::Direct => write!(f, "DIRECT"),
            NatClass::Unknown => write!(f, "UNKNOWN"),
            NatClass::Classified(m, t) => write!(f, "{m:?}+{t:?} ({})", nat_code(*m, *t)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nat_code_round_trips() {
        for code in 0..=8 {
            let (m, f) = decode_nat_code(code).unwrap();
            assert_eq!(nat_code(m, f), code);
        }
    }

    #[test]
    fn out_of_range_code_is_none() {
        assert!(decode_nat_code(9).is_none());
        assert!(decode_nat_code(NAT_TYPE_AUTO).is_none());
    }
}

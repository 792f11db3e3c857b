//! The two 9x9 NAT-pairing matrices that select which FSM each side of a
//! rendezvous runs, indexed `[proxy_code][tunnel_code]` by the composite
//! NAT code from [`tunnel_stun::types::nat_code`] (0..=8). Callers holding
//! a [`tunnel_stun::types::NatClass`] must resolve it to a code first;
//! `NatClass::Direct` and `NatClass::Unknown` fall outside this table and
//! are handled by the caller before a lookup (a direct peer needs no hole
//! punching, an unknown NAT can't be paired at all).

/// Named FSMs a rendezvous can be assigned. `Unsupported` marks a
/// NAT pairing the hole-punching protocol cannot bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsmName {
    Fn10,
    Fn11,
    Fn20,
    Fn21,
    Fn30,
    Fn31,
    Unsupported,
}

impl std::fmt::Display for FsmName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FsmName::Fn10 => "Fn10",
            FsmName::Fn11 => "Fn11",
            FsmName::Fn20 => "Fn20",
            FsmName::Fn21 => "Fn21",
            FsmName::Fn30 => "Fn30",
            FsmName::Fn31 => "Fn31",
            FsmName::Unsupported => "Unsupported",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for FsmName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fn10" => Ok(FsmName::Fn10),
            "Fn11" => Ok(FsmName::Fn11),
            "Fn20" => Ok(FsmName::Fn20),
            "Fn21" => Ok(FsmName::Fn21),
            "Fn30" => Ok(FsmName::Fn30),
            "Fn31" => Ok(FsmName::Fn31),
            "Unsupported" => Ok(FsmName::Unsupported),
            other => Err(format!("unknown FSM name '{other}'")),
        }
    }
}

const N: usize = 9;

#[rustfmt::skip]
const PROXY_TABLE: [[FsmName; N]; N] = {
    use FsmName::*;
    [
        [Fn10, Fn10, Fn10, Fn10, Fn10, Fn10, Fn10, Fn10, Fn10],
        [Fn11, Fn20, Fn20, Fn30, Fn30, Fn30, Fn30, Fn30, Fn30],
        [Fn11, Fn20, Fn20, Fn30, Fn30, Fn30, Fn30, Fn30, Fn30],
        [Fn11, Fn31, Fn31, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported],
        [Fn11, Fn31, Fn31, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported],
        [Fn11, Fn31, Fn31, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported],
        [Fn11, Fn31, Fn31, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported],
        [Fn11, Fn31, Fn31, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported],
        [Fn11, Fn31, Fn31, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported],
    ]
};

#[rustfmt::skip]
const TUNNEL_TABLE: [[FsmName; N]; N] = {
    use FsmName::*;
    [
        [Fn11, Fn11, Fn11, Fn11, Fn11, Fn11, Fn11, Fn11, Fn11],
        [Fn10, Fn21, Fn21, Fn31, Fn31, Fn31, Fn31, Fn31, Fn31],
        [Fn10, Fn21, Fn21, Fn31, Fn31, Fn31, Fn31, Fn31, Fn31],
        [Fn10, Fn30, Fn30, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported],
        [Fn10, Fn30, Fn30, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported],
        [Fn10, Fn30, Fn30, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported],
        [Fn10, Fn30, Fn30, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported],
        [Fn10, Fn30, Fn30, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported],
        [Fn10, Fn30, Fn30, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported, Unsupported],
    ]
};

/// Which FSM the proxy side should run for this `(proxy, tunnel)` NAT
/// code pairing. Codes must be in `0..=8`, see [`tunnel_stun::types::nat_code`].
pub fn fsm_for_proxy(proxy_code: i32, tunnel_code: i32) -> FsmName {
    PROXY_TABLE[proxy_code as usize][tunnel_code as usize]
}

/// Which FSM the tunnel-client side should run for this `(proxy,
/// tunnel)` NAT code pairing.
pub fn fsm_for_tunnel(proxy_code: i32, tunnel_code: i32) -> FsmName {
    TUNNEL_TABLE[proxy_code as usize][tunnel_code as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairings_are_complementary() {
        for p in 0..N as i32 {
            for t in 0..N as i32 {
                let proxy_fsm = fsm_for_proxy(p, t);
                let tunnel_fsm = fsm_for_tunnel(p, t);
                let expected_tunnel = match proxy_fsm {
                    FsmName::Fn10 => FsmName::Fn11,
                    FsmName::Fn11 => FsmName::Fn10,
                    FsmName::Fn20 => FsmName::Fn21,
                    FsmName::Fn21 => FsmName::Fn20,
                    FsmName::Fn30 => FsmName::Fn31,
                    FsmName::Fn31 => FsmName::Fn30,
                    FsmName::Unsupported => FsmName::Unsupported,
                };
                assert_eq!(tunnel_fsm, expected_tunnel, "mismatch at proxy={p} tunnel={t}");
            }
        }
    }

    #[test]
    fn open_proxy_always_listens() {
        for t in 0..N as i32 {
            assert_eq!(fsm_for_proxy(0, t), FsmName::Fn10);
        }
    }
}

//! Literal control tokens exchanged by the hole-punching FSMs.

pub const SYN1: &[u8] = b"SYN1";
pub const SYN2: &[u8] = b"SYN2";
pub const SYN3: &[u8] = b"SYN3";
pub const HEARTBEAT: &[u8] = b"HEARTBEAT";

/// 2-second read deadline used throughout the FSM library for datagram
/// waits and KCP accepts.
pub const FSM_DEADLINE: std::time::Duration = std::time::Duration::from_secs(2);

/// Back-off observed after a `KILL_KCP_*` transition before retrying.
pub const KILL_KCP_BACKOFF: std::time::Duration = std::time::Duration::from_secs(1);

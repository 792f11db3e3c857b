//! Shared plumbing for the four `ptunnel-*` binaries: tracing
//! initialization from `[common]`'s `LogFile`/`LogLevel`/`LogMaxDays`,
//! and NAT-type resolution (manual code, `DIRECT`, or STUN auto-probe).

pub mod logging;
pub mod nat;

//! Wire types for the control-plane and handshake protocol: the
//! string-keyed [`Metadata`] map, the tagged message shapes built on top
//! of it, control codes, and newline framing helpers.

pub mod framing;
pub mod messages;
pub mod metadata;

pub use framing::{read_line, write_line, FramingError};
pub use messages::{
    ClientHello, ControlCode, ProxyHello, Rendezvous, ServerHello, TransportKind, WorkerHello,
};
pub use metadata::{keys, MetaValue, Metadata, MetadataError};

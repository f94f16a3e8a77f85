//! # Remote-Debugging Wire Protocol
//!
//! Packetization, framing, checksums, and payload parsing for the
//! remote-debugging serial protocol the controller speaks.
//!
//! A packet on the wire is either a single synchronization byte (`+` ACK,
//! `-` NACK, `0x03` interrupt) or a framed payload:
//!
//! ```text
//! $<payload>#<hh>
//! ```
//!
//! where `hh` is the modulo-256 sum of the payload bytes as two hex digits.
//! Payloads whose first byte is `'X'` carry binary data and use the escape
//! scheme in [`escape`]; the checksum is computed over the payload *before*
//! escaping is applied.
//!
//! The transport that moves these bytes is not part of this crate: the
//! framer consumes whatever byte chunks the transport hands it and keeps an
//! incomplete trailing frame for the next call.

pub mod escape;
pub mod framer;
pub mod payload;

pub use escape::{checksum, decode_binary, encode_binary};
pub use framer::{Packet, PacketFramer};
pub use payload::PayloadCursor;

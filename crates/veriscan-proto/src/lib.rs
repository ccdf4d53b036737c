//! Veriscan Proto - Transport adapter contract and check protocol
//!
//! The qualification pipeline talks to devices through an injected
//! [`Transport`] and a two-step plain-text protocol: a credential command
//! answered by a marker string, then a serial query answered by a framed
//! identity payload. This crate defines the adapter trait, the outbound
//! command encoding, and the inbound payload decoders.

pub mod command;
pub mod decode;
pub mod transport;

pub use command::{wire, Command};
pub use decode::{decode_ack, decode_credential, decode_version, AckReply, CredentialReply, DecodeError, ExpectedDecoder};
pub use transport::{Transport, TransportEvent};

//! Inbound notification decoders
//!
//! Each outstanding command names the decoder that must interpret the next
//! notification from the device. Credential and ack replies are marker
//! strings; the version reply is binary with a 4-byte framing header followed
//! by an ASCII identity string.

use thiserror::Error;

use crate::command::wire;

/// Framing header length of the version reply
const VERSION_HEADER_LEN: usize = 4;
/// Identity text window ends at this offset (exclusive)
const VERSION_TEXT_END: usize = 20;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload too short: {0} bytes")]
    TooShort(usize),
    #[error("no recognized marker in payload {0:?}")]
    UnrecognizedMarker(String),
}

/// Which decoder the next inbound notification must be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedDecoder {
    Credential,
    Version,
    Ack,
}

/// Outcome of the credential check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialReply {
    Ok,
    Error,
}

/// Decode a credential reply from its marker substring
pub fn decode_credential(payload: &[u8]) -> Result<CredentialReply, DecodeError> {
    let text = String::from_utf8_lossy(payload);
    if text.contains(wire::PIN_OK) {
        Ok(CredentialReply::Ok)
    } else if text.contains(wire::PIN_ERROR) {
        Ok(CredentialReply::Error)
    } else {
        Err(DecodeError::UnrecognizedMarker(text.into_owned()))
    }
}

/// Decode the reported identity string from a version reply.
///
/// The first four bytes are framing and discarded; bytes 4..min(20, len) are
/// interpreted as text, trimmed, and stripped of control characters. Payloads
/// shorter than the framing header are malformed.
pub fn decode_version(payload: &[u8]) -> Result<String, DecodeError> {
    if payload.len() < VERSION_HEADER_LEN {
        return Err(DecodeError::TooShort(payload.len()));
    }
    let end = payload.len().min(VERSION_TEXT_END);
    let text = String::from_utf8_lossy(&payload[VERSION_HEADER_LEN..end]);
    let identity: String = text.trim().chars().filter(|c| !c.is_control()).collect();
    Ok(identity)
}

/// Outcome of a close-out acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckReply {
    /// Device confirmed its radio is off
    RadioOff,
    /// Anything else, ignored
    Other,
}

/// Decode an ack notification; never fails, unknown payloads are ignored
pub fn decode_ack(payload: &[u8]) -> AckReply {
    let text = String::from_utf8_lossy(payload);
    if text.contains(wire::RADIO_OK) {
        AckReply::RadioOff
    } else {
        AckReply::Other
    }
}

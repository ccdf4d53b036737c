//! Classifier
//!
//! Applies session policy to raw protocol replies and returns tagged
//! outcomes the orchestrator matches exhaustively. Malformed payloads are
//! neutral, never a rejection.

use veriscan_core::{AddressRange, RejectReason, TypeTag};
use veriscan_proto::{decode_credential, decode_version, CredentialReply};

/// Outcome of the credential step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialOutcome {
    /// Credential accepted; proceed to the version step
    Proceed,
    /// Credential rejected; terminal
    Rejected(RejectReason),
    /// Unrecognized payload; disconnect without classifying
    Malformed,
}

/// Outcome of the version/identity step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionOutcome {
    /// Tag and serial both check out; carries the reported identity string
    Verified { identity: String },
    /// Wrong device class or serial outside the session range; terminal
    Rejected(RejectReason),
    /// Identity string missing or unparseable; disconnect without classifying
    Malformed,
}

pub fn classify_credential(payload: &[u8]) -> CredentialOutcome {
    match decode_credential(payload) {
        Ok(CredentialReply::Ok) => CredentialOutcome::Proceed,
        Ok(CredentialReply::Error) => {
            CredentialOutcome::Rejected(RejectReason::CredentialError)
        }
        Err(_) => CredentialOutcome::Malformed,
    }
}

/// Classify a version reply against the session's tag and range.
///
/// The reported identity must be a tag letter followed by a decimal serial;
/// anything else is malformed. A parseable identity with the wrong tag or a
/// serial outside the range is a rejection.
pub fn classify_version(payload: &[u8], tag: TypeTag, range: &AddressRange) -> VersionOutcome {
    let identity = match decode_version(payload) {
        Ok(s) => s,
        Err(_) => return VersionOutcome::Malformed,
    };
    let mut chars = identity.chars();
    let prefix = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => c,
        _ => return VersionOutcome::Malformed,
    };
    let serial = chars.as_str();
    if serial.is_empty() || !serial.bytes().all(|b| b.is_ascii_digit()) {
        return VersionOutcome::Malformed;
    }
    if prefix != tag.as_char() {
        return VersionOutcome::Rejected(RejectReason::WrongType);
    }
    if !range.contains(serial) {
        return VersionOutcome::Rejected(RejectReason::OutOfRange);
    }
    VersionOutcome::Verified { identity }
}

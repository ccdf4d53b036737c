//! Device identity types for tracking sighted hardware

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::range::{SUFFIX_DIGITS, suffix};

/// Opaque transport-level address of a device, the stable key for
/// de-duplication across a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportAddress(pub String);

impl TransportAddress {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransportAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A device as seen on air: transport address plus the name it advertises
///
/// Before connection the advertised name carries only the last four digits of
/// the serial; after the version exchange it is replaced by the full reported
/// identity string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub address: TransportAddress,
    pub advertised_name: String,
}

impl DeviceIdentity {
    pub fn new(address: TransportAddress, advertised_name: impl Into<String>) -> Self {
        Self {
            address,
            advertised_name: advertised_name.into(),
        }
    }

    /// Numeric advertising suffix, taken from the last four digits of the
    /// advertised name
    pub fn advertised_suffix(&self) -> Option<u16> {
        suffix(&self.advertised_name).and_then(|s| s.parse().ok())
    }

    /// Advertising suffix as a zero-padded string
    pub fn suffix_string(&self) -> Option<String> {
        self.advertised_suffix()
            .map(|s| format!("{:0>width$}", s, width = SUFFIX_DIGITS))
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.advertised_name, self.address)
    }
}

#[derive(Error, Debug)]
pub enum TagError {
    #[error("type tag {0:?} is not a single ASCII letter")]
    Invalid(String),
}

/// Device-class tag, a single ASCII letter prefixed to reported identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeTag(char);

impl TypeTag {
    pub fn new(c: char) -> Result<Self, TagError> {
        if c.is_ascii_uppercase() {
            Ok(Self(c))
        } else {
            Err(TagError::Invalid(c.to_string()))
        }
    }

    pub fn as_char(&self) -> char {
        self.0
    }

    /// Whether a reported identity string starts with this tag
    pub fn matches(&self, identity: &str) -> bool {
        identity.starts_with(self.0)
    }
}

impl std::str::FromStr for TypeTag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::new(c),
            _ => Err(TagError::Invalid(s.to_string())),
        }
    }
}

impl TryFrom<String> for TypeTag {
    type Error = TagError;

    fn try_from(s: String) -> Result<Self, TagError> {
        s.parse()
    }
}

impl From<TypeTag> for String {
    fn from(tag: TypeTag) -> String {
        tag.0.to_string()
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advertised_suffix() {
        let dev = DeviceIdentity::new(TransportAddress::new("AA:BB:01"), "VS-0042");
        assert_eq!(dev.advertised_suffix(), Some(42));
        assert_eq!(dev.suffix_string().as_deref(), Some("0042"));

        let dev = DeviceIdentity::new(TransportAddress::new("AA:BB:02"), "VS-42");
        assert_eq!(dev.advertised_suffix(), None);
    }

    #[test]
    fn test_type_tag_parse_and_match() {
        let tag: TypeTag = "A".parse().unwrap();
        assert!(tag.matches("A2405000001"));
        assert!(!tag.matches("B2405000001"));
        assert!("AB".parse::<TypeTag>().is_err());
        assert!("a".parse::<TypeTag>().is_err());
    }
}

//! Report rows produced at the end of a qualification session

use serde::{Deserialize, Serialize};

/// Terminal classification shown in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Passed both the credential and version/serial checks
    Verified,
    /// Failed the credential check or reported a wrong tag / out-of-range serial
    Rejected,
    /// Expected in the range but never sighted on air
    NotFound,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReportStatus::Verified => "verified",
            ReportStatus::Rejected => "rejected",
            ReportStatus::NotFound => "not-found",
        };
        write!(f, "{}", s)
    }
}

/// Why a device was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    CredentialError,
    WrongType,
    OutOfRange,
    Unknown,
}

impl RejectReason {
    /// Fixed reason-to-description table for report notes
    pub fn description(&self) -> &'static str {
        match self {
            RejectReason::CredentialError => "credential check failed",
            RejectReason::WrongType => "reported identity has wrong device class",
            RejectReason::OutOfRange => "reported serial outside the session range",
            RejectReason::Unknown => "rejected for an unrecognized reason",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// One line of the session report, immutable once produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Advertised or reported device name; the serial itself for not-found rows
    pub label: String,
    /// Transport address for sighted devices, full serial for not-found rows
    pub address: String,
    pub status: ReportStatus,
    pub note: String,
}

impl ReportRow {
    pub fn verified(label: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            address: address.into(),
            status: ReportStatus::Verified,
            note: String::new(),
        }
    }

    pub fn rejected(
        label: impl Into<String>,
        address: impl Into<String>,
        reason: RejectReason,
    ) -> Self {
        Self {
            label: label.into(),
            address: address.into(),
            status: ReportStatus::Rejected,
            note: reason.description().to_string(),
        }
    }

    pub fn not_found(serial: impl Into<String>) -> Self {
        let serial = serial.into();
        Self {
            label: serial.clone(),
            address: serial,
            status: ReportStatus::NotFound,
            note: "never observed on air".to_string(),
        }
    }
}

//! Veriscan Core - Core types for the device qualification pipeline
//!
//! This crate provides the foundational types for the Veriscan system:
//! - Serial address ranges with arbitrary-precision enumeration
//! - Device identity types keyed by opaque transport addresses
//! - Report rows emitted at the end of a qualification session

pub mod device;
pub mod range;
pub mod report;

pub use device::{DeviceIdentity, TagError, TransportAddress, TypeTag};
pub use range::{suffix, AddressRange, RangeError, SerialIter, SuffixWindow, SUFFIX_DIGITS};
pub use report::{RejectReason, ReportRow, ReportStatus};

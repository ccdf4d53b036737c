//! Veriscan Session - The device qualification pipeline
//!
//! A session qualifies every device in a serial range: sightings from the
//! advertising channel feed a FIFO discovery queue, a strictly single-in-flight
//! orchestrator connects to one candidate at a time and drives the two-step
//! check protocol, and a reconciler turns the resulting sets into report rows,
//! including the serials that were never seen on air.

pub mod classify;
pub mod correlator;
pub mod discovery;
pub mod orchestrator;
pub mod reconcile;
pub mod session;

#[cfg(test)]
pub(crate) mod mock;

pub use classify::{classify_credential, classify_version, CredentialOutcome, VersionOutcome};
pub use correlator::{Correlator, PendingExchange};
pub use discovery::DiscoveryQueue;
pub use orchestrator::{Orchestrator, SessionConfig, SessionEvent, SessionReport, SessionUpdate};
pub use session::{SessionCause, SessionState};

//! Transport adapter contract
//!
//! The pipeline never owns a radio stack; it drives whatever adapter the host
//! injects. Outbound operations are the async trait below. Inbound traffic
//! (advertisement sightings and per-device notifications) is pushed by the
//! adapter as [`TransportEvent`]s into the session's event queue, so the
//! notification source is never blocked on pipeline work.

use anyhow::Result;
use async_trait::async_trait;
use veriscan_core::TransportAddress;

/// Outbound half of the transport adapter.
///
/// `disconnect` is best-effort by contract: the orchestrator never blocks
/// session progress on teardown acknowledgment, so it returns nothing.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection to the device. One connection at a time; the
    /// orchestrator owns the single connection slot.
    async fn connect(&self, address: &TransportAddress) -> Result<()>;

    /// Best-effort teardown.
    async fn disconnect(&self, address: &TransportAddress);

    /// Queue a command payload for the connected device.
    async fn write(&self, address: &TransportAddress, payload: &[u8]) -> Result<()>;
}

/// Inbound traffic pushed by the transport adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// An advertisement was sighted
    Sighting {
        advertised_name: String,
        address: TransportAddress,
    },
    /// A notification payload arrived from a connected device
    Notification {
        address: TransportAddress,
        payload: Vec<u8>,
    },
}

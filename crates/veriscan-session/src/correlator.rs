//! Request/response correlator
//!
//! Commands and notifications travel on independent channels, so each
//! outstanding command records which decoder must interpret the next inbound
//! notification. Because only one connection is ever active and only one
//! exchange is outstanding before the next notification is awaited, the head
//! of this FIFO is always the right association; the queue deliberately stays
//! flat instead of keying by device, and its length is asserted to never
//! exceed one so a violation of the single-in-flight discipline surfaces
//! immediately instead of being silently tolerated.

use std::collections::VecDeque;
use tracing::{error, warn};
use veriscan_core::DeviceIdentity;
use veriscan_proto::ExpectedDecoder;

/// One outstanding command awaiting its notification
#[derive(Debug, Clone)]
pub struct PendingExchange {
    pub device: DeviceIdentity,
    pub decoder: ExpectedDecoder,
}

/// FIFO of outstanding exchanges; at most one entry while a connection is live
#[derive(Debug, Default)]
pub struct Correlator {
    queue: VecDeque<PendingExchange>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, exchange: PendingExchange) {
        if !self.queue.is_empty() {
            error!(
                outstanding = self.queue.len(),
                device = %exchange.device,
                "Pending exchange pushed while another is outstanding; \
                 single-in-flight invariant violated"
            );
            debug_assert!(self.queue.is_empty());
        }
        self.queue.push_back(exchange);
    }

    /// Consume the head entry for an inbound notification. An empty queue
    /// means the notification is orphaned: it is logged and dropped, never
    /// fatal.
    pub fn take(&mut self) -> Option<PendingExchange> {
        let head = self.queue.pop_front();
        if head.is_none() {
            warn!("Orphaned notification, no pending exchange; dropping");
        }
        head
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop all outstanding exchanges (connection teardown or session stop)
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriscan_core::{DeviceIdentity, TransportAddress};

    fn exchange(addr: &str, decoder: ExpectedDecoder) -> PendingExchange {
        PendingExchange {
            device: DeviceIdentity::new(TransportAddress::new(addr), "VS-0001"),
            decoder,
        }
    }

    #[test]
    fn test_fifo_consumed_in_order() {
        let mut c = Correlator::new();
        c.push(exchange("aa:01", ExpectedDecoder::Credential));
        let taken = c.take().unwrap();
        assert_eq!(taken.decoder, ExpectedDecoder::Credential);
        assert!(c.is_empty());
    }

    #[test]
    fn test_orphaned_notification_is_dropped() {
        let mut c = Correlator::new();
        assert!(c.take().is_none());
    }

    #[test]
    fn test_clear_drops_outstanding() {
        let mut c = Correlator::new();
        c.push(exchange("aa:01", ExpectedDecoder::Version));
        c.clear();
        assert!(c.take().is_none());
    }
}

//! Discovery queue
//!
//! Consumes raw advertisement sightings, filters them against the session's
//! tag pattern and suffix window, de-duplicates by transport address, and
//! feeds candidates to the orchestrator in sighting order. Plain FIFO, no
//! priority.

use std::collections::VecDeque;
use tracing::{debug, trace};
use veriscan_core::{DeviceIdentity, TransportAddress};

use crate::session::SessionState;

/// FIFO of connection candidates
#[derive(Debug, Default)]
pub struct DiscoveryQueue {
    queue: VecDeque<DeviceIdentity>,
    /// Advertising-name pattern for the session's device class; `None`
    /// accepts every name
    pattern: Option<String>,
}

impl DiscoveryQueue {
    pub fn new(pattern: Option<String>) -> Self {
        Self {
            queue: VecDeque::new(),
            pattern,
        }
    }

    /// Offer a raw sighting. Returns the accepted candidate, or `None` when
    /// the sighting is filtered or a duplicate.
    ///
    /// Acceptance requires: active session, pattern match, a parseable
    /// 4-digit suffix inside the range's window, and an address not already
    /// rejected, queued, found, or verified.
    pub fn offer(
        &mut self,
        state: &mut SessionState,
        advertised_name: &str,
        address: TransportAddress,
    ) -> Option<DeviceIdentity> {
        if !state.is_active() {
            trace!(name = advertised_name, "Sighting ignored, session inactive");
            return None;
        }
        if let Some(pattern) = &self.pattern {
            if !advertised_name.contains(pattern.as_str()) {
                return None;
            }
        }
        let device = DeviceIdentity::new(address, advertised_name);
        let suffix = match device.advertised_suffix() {
            Some(s) => s,
            None => {
                trace!(name = advertised_name, "Sighting ignored, no numeric suffix");
                return None;
            }
        };
        if !state.range().suffix_window().contains(suffix) {
            trace!(
                name = advertised_name,
                suffix = suffix,
                "Sighting ignored, suffix outside range window"
            );
            return None;
        }
        if state.is_rejected(&device.address)
            || state.is_found(&device.address)
            || state.is_verified(&device.address)
            || self.contains(&device.address)
        {
            return None;
        }

        debug!(device = %device, "Candidate accepted");
        state.mark_found(device.clone());
        self.queue.push_back(device.clone());
        Some(device)
    }

    /// Pop the next candidate, skipping any that were rejected while queued
    pub fn pop_next(&mut self, state: &SessionState) -> Option<DeviceIdentity> {
        while let Some(device) = self.queue.pop_front() {
            if state.is_rejected(&device.address) {
                debug!(device = %device, "Skipping queued candidate, rejected meanwhile");
                continue;
            }
            return Some(device);
        }
        None
    }

    /// Re-enqueue a device at the tail, so it is retried after the other
    /// candidates
    pub fn requeue(&mut self, device: DeviceIdentity) {
        debug!(device = %device, "Candidate re-enqueued");
        self.queue.push_back(device);
    }

    pub fn contains(&self, address: &TransportAddress) -> bool {
        self.queue.iter().any(|d| &d.address == address)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriscan_core::AddressRange;

    fn state() -> SessionState {
        let range = AddressRange::parse("2405000001", "2405000003").unwrap();
        SessionState::new(range, "A".parse().unwrap())
    }

    fn addr(s: &str) -> TransportAddress {
        TransportAddress::new(s)
    }

    #[test]
    fn test_accepts_in_window_sighting() {
        let mut s = state();
        let mut q = DiscoveryQueue::new(Some("VS-".to_string()));
        assert!(q.offer(&mut s, "VS-0002", addr("aa:02")).is_some());
        assert_eq!(q.len(), 1);
        assert!(s.is_found(&addr("aa:02")));
    }

    #[test]
    fn test_filters_pattern_and_window() {
        let mut s = state();
        let mut q = DiscoveryQueue::new(Some("VS-".to_string()));
        // Wrong name pattern
        assert!(q.offer(&mut s, "XX-0002", addr("aa:01")).is_none());
        // Suffix outside the window
        assert!(q.offer(&mut s, "VS-0009", addr("aa:02")).is_none());
        // No parseable suffix
        assert!(q.offer(&mut s, "VS-2", addr("aa:03")).is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn test_no_pattern_accepts_all_names() {
        let mut s = state();
        let mut q = DiscoveryQueue::new(None);
        assert!(q.offer(&mut s, "anything-0001", addr("aa:01")).is_some());
    }

    #[test]
    fn test_deduplicates_by_address() {
        let mut s = state();
        let mut q = DiscoveryQueue::new(None);
        assert!(q.offer(&mut s, "VS-0001", addr("aa:01")).is_some());
        // Same address sighted again
        assert!(q.offer(&mut s, "VS-0001", addr("aa:01")).is_none());
        // Different address, same suffix: accepted
        assert!(q.offer(&mut s, "VS-0001", addr("aa:99")).is_some());
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_inactive_session_rejects_sightings() {
        let mut s = state();
        let mut q = DiscoveryQueue::new(None);
        s.deactivate();
        assert!(q.offer(&mut s, "VS-0001", addr("aa:01")).is_none());
    }

    #[test]
    fn test_pop_skips_meanwhile_rejected() {
        let mut s = state();
        let mut q = DiscoveryQueue::new(None);
        let first = q.offer(&mut s, "VS-0001", addr("aa:01")).unwrap();
        q.offer(&mut s, "VS-0002", addr("aa:02")).unwrap();
        s.mark_rejected(&first, veriscan_core::RejectReason::CredentialError);
        let popped = q.pop_next(&s).unwrap();
        assert_eq!(popped.address, addr("aa:02"));
        assert!(q.pop_next(&s).is_none());
    }
}

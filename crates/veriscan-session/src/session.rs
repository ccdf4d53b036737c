//! Owned session state
//!
//! One `SessionState` exists per scan run. It is owned by the orchestrator
//! task and mutated only there; every other component communicates through
//! events, never by reaching into these sets. The mutation methods below keep
//! the core invariant: a transport address is in at most one of
//! {found, verified, rejected} at any instant. `unchecked` may overlap
//! `found` (a device whose connection never completed stays unchecked until
//! it is classified or the session ends).

use std::collections::{HashMap, HashSet};
use tracing::debug;
use veriscan_core::{AddressRange, DeviceIdentity, RejectReason, TransportAddress, TypeTag};

/// Why a session terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCause {
    /// Budget exhausted with an empty discovery queue
    Auto,
    /// Explicit stop request
    Manual,
}

impl std::fmt::Display for SessionCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionCause::Auto => write!(f, "Auto"),
            SessionCause::Manual => write!(f, "Manual"),
        }
    }
}

/// State of one qualification session
#[derive(Debug, Clone)]
pub struct SessionState {
    range: AddressRange,
    tag: TypeTag,
    found: HashMap<TransportAddress, DeviceIdentity>,
    verified: HashMap<TransportAddress, DeviceIdentity>,
    rejected: HashMap<TransportAddress, (DeviceIdentity, RejectReason)>,
    unchecked: HashMap<TransportAddress, DeviceIdentity>,
    remaining_budget: u64,
    active: bool,
    processed: u64,
    radios_confirmed: u64,
}

impl SessionState {
    pub fn new(range: AddressRange, tag: TypeTag) -> Self {
        let remaining_budget = range.budget();
        Self {
            range,
            tag,
            found: HashMap::new(),
            verified: HashMap::new(),
            rejected: HashMap::new(),
            unchecked: HashMap::new(),
            remaining_budget,
            active: true,
            processed: 0,
            radios_confirmed: 0,
        }
    }

    pub fn range(&self) -> &AddressRange {
        &self.range
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Mark the session inactive; the discovery queue stops accepting
    /// sightings from this point. Safe to call repeatedly.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn remaining_budget(&self) -> u64 {
        self.remaining_budget
    }

    /// Monotonic count of qualification attempts that ran to completion
    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn record_processed(&mut self) {
        self.processed += 1;
    }

    pub fn radios_confirmed(&self) -> u64 {
        self.radios_confirmed
    }

    pub fn record_radio_confirmed(&mut self) {
        self.radios_confirmed += 1;
    }

    /// Reset session-scoped transient counters after report emission
    pub fn clear_transient_counters(&mut self) {
        self.radios_confirmed = 0;
    }

    pub fn is_found(&self, addr: &TransportAddress) -> bool {
        self.found.contains_key(addr)
    }

    pub fn is_verified(&self, addr: &TransportAddress) -> bool {
        self.verified.contains_key(addr)
    }

    pub fn is_rejected(&self, addr: &TransportAddress) -> bool {
        self.rejected.contains_key(addr)
    }

    pub fn is_unchecked(&self, addr: &TransportAddress) -> bool {
        self.unchecked.contains_key(addr)
    }

    pub fn found(&self) -> impl Iterator<Item = &DeviceIdentity> {
        self.found.values()
    }

    pub fn verified(&self) -> impl Iterator<Item = &DeviceIdentity> {
        self.verified.values()
    }

    pub fn rejected(&self) -> impl Iterator<Item = (&DeviceIdentity, RejectReason)> {
        self.rejected.values().map(|(dev, reason)| (dev, *reason))
    }

    pub fn unchecked(&self) -> impl Iterator<Item = &DeviceIdentity> {
        self.unchecked.values()
    }

    pub fn verified_count(&self) -> usize {
        self.verified.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    /// Record a freshly accepted sighting
    pub fn mark_found(&mut self, device: DeviceIdentity) {
        debug_assert!(!self.verified.contains_key(&device.address));
        debug_assert!(!self.rejected.contains_key(&device.address));
        self.found.insert(device.address.clone(), device);
    }

    /// Terminal: device passed both checks. `identity` is the reported
    /// identity string, which replaces the advertised name.
    pub fn mark_verified(&mut self, device: &DeviceIdentity, identity: String) {
        let addr = &device.address;
        self.found.remove(addr);
        self.unchecked.remove(addr);
        let verified = DeviceIdentity::new(addr.clone(), identity);
        debug!(device = %verified, "Device verified");
        self.verified.insert(addr.clone(), verified);
        self.remaining_budget = self.remaining_budget.saturating_sub(1);
    }

    /// Terminal: device failed the credential or version/range check
    pub fn mark_rejected(&mut self, device: &DeviceIdentity, reason: RejectReason) {
        let addr = &device.address;
        self.found.remove(addr);
        self.unchecked.remove(addr);
        debug!(device = %device, reason = %reason, "Device rejected");
        self.rejected.insert(addr.clone(), (device.clone(), reason));
    }

    /// Device could not be classified (connection never completed or the
    /// exchange was malformed); terminal classifications are never downgraded.
    pub fn mark_unchecked(&mut self, device: &DeviceIdentity) {
        let addr = &device.address;
        if self.verified.contains_key(addr) || self.rejected.contains_key(addr) {
            return;
        }
        self.unchecked.insert(addr.clone(), device.clone());
    }

    /// Advertising suffixes of every device seen on air, at the granularity
    /// devices identify themselves with before connection
    pub fn observed_suffixes(&self) -> HashSet<String> {
        self.found
            .values()
            .chain(self.verified.values())
            .chain(self.rejected.values().map(|(dev, _)| dev))
            .filter_map(|dev| dev.suffix_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SessionState {
        let range = AddressRange::parse("2405000001", "2405000005").unwrap();
        SessionState::new(range, "A".parse().unwrap())
    }

    fn device(addr: &str, name: &str) -> DeviceIdentity {
        DeviceIdentity::new(TransportAddress::new(addr), name)
    }

    #[test]
    fn test_sets_stay_disjoint() {
        let mut s = state();
        let dev = device("aa:01", "VS-0001");

        s.mark_found(dev.clone());
        s.mark_unchecked(&dev);
        assert!(s.is_found(&dev.address) && s.is_unchecked(&dev.address));

        s.mark_verified(&dev, "A2405000001".into());
        assert!(s.is_verified(&dev.address));
        assert!(!s.is_found(&dev.address));
        assert!(!s.is_unchecked(&dev.address));
        assert!(!s.is_rejected(&dev.address));
    }

    #[test]
    fn test_terminal_classification_not_downgraded() {
        let mut s = state();
        let dev = device("aa:02", "VS-0002");
        s.mark_found(dev.clone());
        s.mark_rejected(&dev, RejectReason::CredentialError);
        s.mark_unchecked(&dev);
        assert!(s.is_rejected(&dev.address));
        assert!(!s.is_unchecked(&dev.address));
    }

    #[test]
    fn test_budget_decrements_only_on_verified() {
        let mut s = state();
        assert_eq!(s.remaining_budget(), 5);
        let a = device("aa:01", "VS-0001");
        let b = device("aa:02", "VS-0002");
        s.mark_found(a.clone());
        s.mark_found(b.clone());
        s.mark_rejected(&b, RejectReason::OutOfRange);
        assert_eq!(s.remaining_budget(), 5);
        s.mark_verified(&a, "A2405000001".into());
        assert_eq!(s.remaining_budget(), 4);
    }

    #[test]
    fn test_observed_suffixes_cover_all_sets() {
        let mut s = state();
        let a = device("aa:01", "VS-0001");
        let b = device("aa:02", "VS-0002");
        let c = device("aa:03", "VS-0003");
        s.mark_found(a.clone());
        s.mark_found(b.clone());
        s.mark_found(c.clone());
        s.mark_verified(&a, "A2405000001".into());
        s.mark_rejected(&b, RejectReason::CredentialError);

        let suffixes = s.observed_suffixes();
        assert!(suffixes.contains("0001"));
        assert!(suffixes.contains("0002"));
        assert!(suffixes.contains("0003"));
        assert_eq!(suffixes.len(), 3);
    }
}

//! Scripted transport for orchestrator tests
//!
//! Each address gets a script: a number of connect failures to burn through,
//! then one optional reply per written command, injected back into the
//! session's event queue the way a real adapter pushes notifications.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use veriscan_core::TransportAddress;
use veriscan_proto::{Transport, TransportEvent};

use crate::orchestrator::SessionEvent;

#[derive(Debug, Default)]
pub struct DeviceScript {
    connect_failures: u32,
    /// One entry per expected write; `None` answers with silence
    replies: VecDeque<Option<Vec<u8>>>,
}

impl DeviceScript {
    pub fn replies(replies: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            connect_failures: 0,
            replies: replies.into(),
        }
    }

    /// A device whose connection never succeeds
    pub fn unreachable() -> Self {
        Self {
            connect_failures: u32::MAX,
            replies: VecDeque::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    scripts: HashMap<TransportAddress, DeviceScript>,
    written: HashMap<TransportAddress, Vec<Vec<u8>>>,
    connect_attempts: HashMap<TransportAddress, u32>,
}

pub struct MockTransport {
    inner: Mutex<Inner>,
    events: mpsc::Sender<SessionEvent>,
}

impl MockTransport {
    pub fn new(events: mpsc::Sender<SessionEvent>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            events,
        })
    }

    pub fn script(&self, address: &str, script: DeviceScript) {
        self.inner
            .lock()
            .unwrap()
            .scripts
            .insert(TransportAddress::new(address), script);
    }

    /// Commands written to an address, in order
    pub fn written(&self, address: &str) -> Vec<Vec<u8>> {
        self.inner
            .lock()
            .unwrap()
            .written
            .get(&TransportAddress::new(address))
            .cloned()
            .unwrap_or_default()
    }

    pub fn connect_attempts(&self, address: &str) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .connect_attempts
            .get(&TransportAddress::new(address))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, address: &TransportAddress) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        *inner.connect_attempts.entry(address.clone()).or_default() += 1;
        let script = inner
            .scripts
            .get_mut(address)
            .ok_or_else(|| anyhow!("no device at {address}"))?;
        if script.connect_failures > 0 {
            script.connect_failures = script.connect_failures.saturating_sub(1);
            return Err(anyhow!("connect to {address} failed"));
        }
        Ok(())
    }

    async fn disconnect(&self, _address: &TransportAddress) {}

    async fn write(&self, address: &TransportAddress, payload: &[u8]) -> Result<()> {
        let reply = {
            let mut inner = self.inner.lock().unwrap();
            inner
                .written
                .entry(address.clone())
                .or_default()
                .push(payload.to_vec());
            inner
                .scripts
                .get_mut(address)
                .and_then(|s| s.replies.pop_front())
                .flatten()
        };
        if let Some(payload) = reply {
            let _ = self
                .events
                .try_send(SessionEvent::Transport(TransportEvent::Notification {
                    address: address.clone(),
                    payload,
                }));
        }
        Ok(())
    }
}

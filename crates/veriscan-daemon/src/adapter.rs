//! Loopback transport adapter
//!
//! An in-process device population for end-to-end runs without a radio
//! stack. Real deployments wire their own [`Transport`] implementation; the
//! pipeline only ever sees the adapter contract, so this one doubles as an
//! integration reference.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use veriscan_core::TransportAddress;
use veriscan_proto::{wire, Transport, TransportEvent};
use veriscan_session::SessionEvent;

fn default_sim_pin() -> String {
    "0000".to_string()
}

/// One simulated device, configured in the daemon's TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimDevice {
    pub address: String,
    /// Advertised name, carrying the 4-digit suffix
    pub name: String,
    /// Credential code the device accepts
    #[serde(default = "default_sim_pin")]
    pub pin: String,
    /// Identity string reported to the serial query; `None` stays silent
    #[serde(default)]
    pub identity: Option<String>,
}

pub struct LoopbackAdapter {
    devices: HashMap<TransportAddress, SimDevice>,
    events: mpsc::Sender<SessionEvent>,
}

impl LoopbackAdapter {
    pub fn new(events: mpsc::Sender<SessionEvent>, devices: &[SimDevice]) -> Arc<Self> {
        let devices = devices
            .iter()
            .map(|d| (TransportAddress::new(d.address.clone()), d.clone()))
            .collect();
        Arc::new(Self { devices, events })
    }

    /// Push one advertisement sighting per configured device
    pub async fn announce(&self) {
        for device in self.devices.values() {
            let _ = self
                .events
                .send(SessionEvent::Transport(TransportEvent::Sighting {
                    advertised_name: device.name.clone(),
                    address: TransportAddress::new(device.address.clone()),
                }))
                .await;
        }
    }

    fn reply(&self, address: &TransportAddress, payload: Vec<u8>) {
        let _ = self
            .events
            .try_send(SessionEvent::Transport(TransportEvent::Notification {
                address: address.clone(),
                payload,
            }));
    }
}

#[async_trait]
impl Transport for LoopbackAdapter {
    async fn connect(&self, address: &TransportAddress) -> Result<()> {
        if self.devices.contains_key(address) {
            debug!(device = %address, "Loopback connect");
            Ok(())
        } else {
            Err(anyhow!("no device at {address}"))
        }
    }

    async fn disconnect(&self, address: &TransportAddress) {
        debug!(device = %address, "Loopback disconnect");
    }

    async fn write(&self, address: &TransportAddress, payload: &[u8]) -> Result<()> {
        let device = self
            .devices
            .get(address)
            .ok_or_else(|| anyhow!("no device at {address}"))?;
        let command = String::from_utf8_lossy(payload);

        if let Some(code) = command.strip_prefix(wire::CMD_PIN) {
            let marker = if code == device.pin {
                wire::PIN_OK
            } else {
                wire::PIN_ERROR
            };
            self.reply(address, marker.as_bytes().to_vec());
        } else if command == wire::CMD_SERIAL {
            if let Some(identity) = &device.identity {
                let mut reply = vec![0u8; 4];
                reply.extend_from_slice(identity.as_bytes());
                self.reply(address, reply);
            }
        } else if command == wire::CMD_RADIO_OFF {
            self.reply(address, wire::RADIO_OK.as_bytes().to_vec());
        }
        Ok(())
    }
}

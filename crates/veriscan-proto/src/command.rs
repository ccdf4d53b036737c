//! Outbound command encoding
//!
//! Commands are plain ASCII strings written to the connected device's command
//! characteristic.

/// Wire markers and command stems
pub mod wire {
    /// Credential command stem; the shared code is appended after the dot
    pub const CMD_PIN: &str = "pin.";
    /// Serial/version query
    pub const CMD_SERIAL: &str = "serial";
    /// Close-out command silencing the device's radio
    pub const CMD_RADIO_OFF: &str = "ble.off";

    /// Credential accepted marker
    pub const PIN_OK: &str = "pin.ok";
    /// Credential rejected marker
    pub const PIN_ERROR: &str = "pin.error";
    /// Radio-off acknowledged marker
    pub const RADIO_OK: &str = "ble.ok";
}

/// A command sent to a connected device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Credential check with the session's shared code
    Pin(String),
    /// Query the reported identity (type tag + serial)
    Serial,
    /// Fire-and-forget close-out: silence the device's advertising radio
    RadioOff,
}

impl Command {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::Pin(code) => format!("{}{}", wire::CMD_PIN, code).into_bytes(),
            Command::Serial => wire::CMD_SERIAL.as_bytes().to_vec(),
            Command::RadioOff => wire::CMD_RADIO_OFF.as_bytes().to_vec(),
        }
    }
}

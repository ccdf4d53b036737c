//! Configuration loading and validation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;
use veriscan_core::TypeTag;
use veriscan_session::SessionConfig;

use crate::adapter::SimDevice;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionTuning,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub report: ReportConfig,
    /// Advertising-name pattern per device-class tag
    #[serde(default, rename = "tag_pattern")]
    pub tag_patterns: Vec<TagPatternConfig>,
    /// Simulated device population for the loopback adapter
    #[serde(default, rename = "sim_device")]
    pub sim_devices: Vec<SimDevice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTuning {
    /// Shared credential code sent to every device
    #[serde(default = "default_pin")]
    pub pin_code: String,
    /// Connect attempts per candidate before it is requeued
    #[serde(default = "default_attempts")]
    pub connect_attempts: u32,
    /// Fixed backoff between connect attempts in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub connect_backoff_ms: u64,
    /// Per-command reply timeout in seconds; 0 waits forever
    #[serde(default = "default_response_timeout")]
    pub response_timeout_secs: u64,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            pin_code: default_pin(),
            connect_attempts: default_attempts(),
            connect_backoff_ms: default_backoff_ms(),
            response_timeout_secs: default_response_timeout(),
        }
    }
}

fn default_pin() -> String {
    "0000".to_string()
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_response_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Task definition file polled for new qualification runs
    #[serde(default = "default_task_path")]
    pub task_path: String,
    /// Poll cadence in seconds; also the retry delay for malformed files
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            task_path: default_task_path(),
            poll_secs: default_poll_secs(),
        }
    }
}

fn default_task_path() -> String {
    "./veriscan-task.toml".to_string()
}

fn default_poll_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory receiving one report file per session
    #[serde(default = "default_report_dir")]
    pub dir: String,
    /// Cumulative verified-device counter file, keyed by range bounds
    #[serde(default = "default_counter_path")]
    pub counter_path: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: default_report_dir(),
            counter_path: default_counter_path(),
        }
    }
}

fn default_report_dir() -> String {
    "./reports".to_string()
}

fn default_counter_path() -> String {
    "./reports/verified-counts.toml".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagPatternConfig {
    /// Device-class tag letter
    pub tag: String,
    /// Substring the advertised name must contain
    pub pattern: String,
}

impl Config {
    /// Session tunables for one task, with the tag's advertising pattern
    pub fn session_config(&self, tag: TypeTag) -> SessionConfig {
        let name_pattern = self
            .tag_patterns
            .iter()
            .find(|p| p.tag == tag.to_string())
            .map(|p| p.pattern.clone());
        SessionConfig {
            pin_code: self.session.pin_code.clone(),
            connect_attempts: self.session.connect_attempts,
            connect_backoff: Duration::from_millis(self.session.connect_backoff_ms),
            response_timeout: match self.session.response_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            name_pattern,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let config = Config {
        tag_patterns: vec![TagPatternConfig {
            tag: "A".to_string(),
            pattern: "VS-".to_string(),
        }],
        ..Config::default()
    };
    let content = toml::to_string_pretty(&config)?;
    std::fs::write(path, content)?;
    Ok(())
}

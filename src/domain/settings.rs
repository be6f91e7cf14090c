use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::RadioConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Subscriber options for the host binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_level")]
    pub level: String,
    /// Log every raw exchange with the module at `trace` level
    #[serde(default)]
    pub wire_trace: bool,
    #[serde(default = "default_true")]
    pub console: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    /// Rolling log files are written here when set
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// "daily", "hourly", "minutely" or "never"
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            wire_trace: false,
            console: true,
            ansi_colors: true,
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Serial link and protocol timing for the radio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioSettings {
    #[serde(default = "default_port_name")]
    pub port_name: String,
    // Must match the rate stored in the module firmware; 115200 is unreliable on RN-42
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    #[serde(default = "default_connect_poll_interval_ms")]
    pub connect_poll_interval_ms: u64,
    #[serde(default = "default_connect_poll_attempts")]
    pub connect_poll_attempts: u32,
    #[serde(default = "default_escape_sequence")]
    pub default_escape_sequence: String,
    #[serde(default = "default_boot_delay_ms")]
    pub boot_delay_ms: u64,
    /// Remote device used by `connect` when no address is given on the command line
    #[serde(default)]
    pub remote_address: Option<String>,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            port_name: default_port_name(),
            baud_rate: default_baud_rate(),
            command_timeout_ms: default_command_timeout_ms(),
            connect_poll_interval_ms: default_connect_poll_interval_ms(),
            connect_poll_attempts: default_connect_poll_attempts(),
            default_escape_sequence: default_escape_sequence(),
            boot_delay_ms: default_boot_delay_ms(),
            remote_address: None,
        }
    }
}

impl RadioSettings {
    pub fn radio_config(&self) -> RadioConfig {
        RadioConfig {
            command_timeout: Duration::from_millis(self.command_timeout_ms),
            connect_poll_interval: Duration::from_millis(self.connect_poll_interval_ms),
            connect_poll_attempts: self.connect_poll_attempts,
            default_escape_sequence: self.default_escape_sequence.clone(),
            boot_delay: Duration::from_millis(self.boot_delay_ms),
        }
    }
}

fn default_port_name() -> String {
    if cfg!(windows) {
        "COM3".to_string()
    } else {
        "/dev/ttyUSB0".to_string()
    }
}
fn default_baud_rate() -> u32 {
    57_600
}
fn default_command_timeout_ms() -> u64 {
    protocol::COMMAND_TIMEOUT_MS
}
fn default_connect_poll_interval_ms() -> u64 {
    protocol::CONNECT_POLL_INTERVAL_MS
}
fn default_connect_poll_attempts() -> u32 {
    protocol::CONNECT_POLL_ATTEMPTS
}
fn default_escape_sequence() -> String {
    protocol::DEFAULT_ESCAPE_SEQUENCE.to_string()
}
fn default_boot_delay_ms() -> u64 {
    protocol::BOOT_DELAY_MS
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub radio: RadioSettings,
    #[serde(default)]
    pub log_settings: LogSettings,
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::load(settings_path))
    }

    /// Load settings from `path`, falling back to defaults if it is missing or invalid
    pub fn load(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();
        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("RN42Radio");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn set_remote_address(&mut self, address: &str) -> anyhow::Result<()> {
        let address = protocol::normalize_address(address)?;
        if self.settings.radio.remote_address.as_deref() != Some(address.as_str()) {
            self.settings.radio.remote_address = Some(address);
            self.save()?;
        }
        Ok(())
    }
}

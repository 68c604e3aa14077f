use crate::{payload::Channel, Error, Result};
use std::{fmt, path::Path, str::FromStr, time::Duration};

pub mod loader;

pub use crate::serial::{DEFAULT_BAUD, DEFAULT_SERIAL_TIMEOUT_MS};

pub const DEFAULT_SOURCE: SourceKind = SourceKind::Poll;
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/kicksense/latest.json";
pub const DEFAULT_DEVICE: &str = "/dev/ttyACM0";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 120;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_WATCHDOG_INTERVAL_MS: u64 = 500;
pub const DEFAULT_MAX_RAW: u32 = 800;
pub const DEFAULT_ACTIVE_SHOT_THRESHOLD: u32 = 50;
pub const DEFAULT_HOLD_WINDOW: Duration = Duration::from_secs(10);
pub const DEFAULT_NO_DATA_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_STALE_TIMEOUT: Duration = Duration::from_secs(10);

pub const MIN_BAUD: u32 = 300;
pub const MIN_POLL_INTERVAL_MS: u64 = 20;
pub const MAX_POLL_INTERVAL_MS: u64 = 10_000;
pub const MIN_HTTP_TIMEOUT_MS: u64 = 50;
pub const MIN_WATCHDOG_INTERVAL_MS: u64 = 50;
pub const MAX_WATCHDOG_INTERVAL_MS: u64 = 5_000;

const CONFIG_DIR_NAME: &str = ".kicksense";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Which automatic input feeds the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Poll the remote store over HTTP.
    Poll,
    /// Read line-delimited JSON from the shoe over USB serial.
    Serial,
    /// Realistic kick generator.
    Demo,
    /// Uniform random hits.
    Simulate,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Poll => "poll",
            SourceKind::Serial => "serial",
            SourceKind::Demo => "demo",
            SourceKind::Simulate => "simulate",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "poll" | "remote" | "http" => Ok(SourceKind::Poll),
            "serial" | "usb" => Ok(SourceKind::Serial),
            "demo" | "generator" => Ok(SourceKind::Demo),
            "simulate" | "sim" => Ok(SourceKind::Simulate),
            other => Err(format!(
                "unknown source '{other}' (expected poll, serial, demo or simulate)"
            )),
        }
    }
}

/// User-supplied settings loaded from the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: SourceKind,
    pub endpoint: String,
    pub device: String,
    pub baud: u32,
    pub serial_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub http_timeout_ms: u64,
    pub watchdog_interval_ms: u64,
    pub max_raw: u32,
    pub active_shot_threshold: u32,
    pub hold_window: Duration,
    pub no_data_timeout: Duration,
    pub stale_timeout: Duration,
    pub start_manual: bool,
    pub channels: Vec<Channel>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            device: DEFAULT_DEVICE.to_string(),
            baud: DEFAULT_BAUD,
            serial_timeout_ms: DEFAULT_SERIAL_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            watchdog_interval_ms: DEFAULT_WATCHDOG_INTERVAL_MS,
            max_raw: DEFAULT_MAX_RAW,
            active_shot_threshold: DEFAULT_ACTIVE_SHOT_THRESHOLD,
            hold_window: DEFAULT_HOLD_WINDOW,
            no_data_timeout: DEFAULT_NO_DATA_TIMEOUT,
            stale_timeout: DEFAULT_STALE_TIMEOUT,
            start_manual: false,
            channels: Channel::ALL.to_vec(),
        }
    }
}

impl Config {
    pub fn load_or_default() -> Result<Self> {
        loader::load_or_default()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        loader::load_from_path(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        loader::save_to_path(self, path)
    }
}

pub(crate) fn validate(cfg: &Config) -> Result<()> {
    if cfg.device.trim().is_empty() {
        return Err(Error::InvalidArgs("device must not be empty".into()));
    }
    if cfg.baud < MIN_BAUD {
        return Err(Error::InvalidArgs(format!("baud must be >= {MIN_BAUD}")));
    }
    if !(cfg.endpoint.starts_with("http://") || cfg.endpoint.starts_with("https://")) {
        return Err(Error::InvalidArgs(
            "endpoint must be an http:// or https:// URL".into(),
        ));
    }
    if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&cfg.poll_interval_ms) {
        return Err(Error::InvalidArgs(format!(
            "poll_interval_ms must be between {MIN_POLL_INTERVAL_MS} and {MAX_POLL_INTERVAL_MS}"
        )));
    }
    if cfg.http_timeout_ms < MIN_HTTP_TIMEOUT_MS {
        return Err(Error::InvalidArgs(format!(
            "http_timeout_ms must be >= {MIN_HTTP_TIMEOUT_MS}"
        )));
    }
    if !(MIN_WATCHDOG_INTERVAL_MS..=MAX_WATCHDOG_INTERVAL_MS).contains(&cfg.watchdog_interval_ms) {
        return Err(Error::InvalidArgs(format!(
            "watchdog_interval_ms must be between {MIN_WATCHDOG_INTERVAL_MS} and {MAX_WATCHDOG_INTERVAL_MS}"
        )));
    }
    if cfg.max_raw == 0 {
        return Err(Error::InvalidArgs("max_raw must be >= 1".into()));
    }
    for (name, value) in [
        ("hold_window", cfg.hold_window),
        ("no_data_timeout", cfg.no_data_timeout),
        ("stale_timeout", cfg.stale_timeout),
    ] {
        if value.is_zero() {
            return Err(Error::InvalidArgs(format!("{name} must be > 0")));
        }
    }
    if cfg.channels.is_empty() {
        return Err(Error::InvalidArgs("channels must list at least one channel".into()));
    }
    for (idx, channel) in cfg.channels.iter().enumerate() {
        if cfg.channels[..idx].contains(channel) {
            return Err(Error::InvalidArgs(format!(
                "channels lists '{channel}' more than once"
            )));
        }
    }
    Ok(())
}

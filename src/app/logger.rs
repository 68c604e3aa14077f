use std::fs::{File, OpenOptions};
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::Result;

pub const LOG_LEVEL_ENV: &str = "KICKSENSE_LOG_LEVEL";
pub const LOG_PATH_ENV: &str = "KICKSENSE_LOG_PATH";

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    #[default]
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!(
                "unknown log level '{other}' (expected error, warn, info, debug or trace)"
            )),
        }
    }
}

/// Leveled stderr logger with an optional append-only file sink.
///
/// `KICKSENSE_LOG_LEVEL` and `KICKSENSE_LOG_PATH` override the values passed in.
pub struct Logger {
    level: LogLevel,
    file: Option<Mutex<File>>,
    echo_stderr: bool,
}

impl Logger {
    pub fn new(level: LogLevel, file_path: Option<String>) -> Result<Self> {
        let env_level = std::env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|s| LogLevel::from_str(&s).ok());
        let effective_level = env_level.unwrap_or(level);

        let env_file = std::env::var(LOG_PATH_ENV).ok().filter(|p| !p.is_empty());
        let file = match env_file.or(file_path) {
            Some(path) => Some(Mutex::new(
                OpenOptions::new().create(true).append(true).open(path)?,
            )),
            None => None,
        };
        Ok(Self {
            level: effective_level,
            file,
            echo_stderr: true,
        })
    }

    /// Logger that drops everything; used by tests and headless helpers.
    pub fn silent() -> Self {
        Self {
            level: LogLevel::Error,
            file: None,
            echo_stderr: false,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level && (self.echo_stderr || self.file.is_some())
    }

    pub fn log(&self, level: LogLevel, msg: impl AsRef<str>) {
        if !self.enabled(level) {
            return;
        }
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let line = format!("[{ts:.3}] [{level:?}] {}", msg.as_ref());
        if self.echo_stderr {
            eprintln!("{line}");
        }
        if let Some(file) = self.file.as_ref() {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "{line}");
            }
        }
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Error, msg);
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Warn, msg);
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Info, msg);
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Debug, msg);
    }

    pub fn trace(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Trace, msg);
    }
}

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{payload::Channel, Error, Result};

use super::{Config, CONFIG_DIR_NAME, CONFIG_FILE_NAME};

pub fn load_or_default() -> Result<Config> {
    let path = default_config_path()?;
    if !path.exists() {
        let cfg = Config::default();
        cfg.save_to_path(&path)?;
        super::validate(&cfg)?;
        return Ok(cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        super::validate(&cfg)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(path)?;
    parse(&raw)
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let channels: Vec<String> = config
        .channels
        .iter()
        .map(|c| c.as_str().to_string())
        .collect();

    let contents = format!(
        "# kicksense config\n\
source = \"{}\"\n\
endpoint = \"{}\"\n\
device = \"{}\"\n\
baud = {}\n\
serial_timeout_ms = {}\n\
poll_interval_ms = {}\n\
http_timeout_ms = {}\n\
watchdog_interval_ms = {}\n\
max_raw = {}\n\
active_shot_threshold = {}\n\
hold_window = \"{}\"\n\
no_data_timeout = \"{}\"\n\
stale_timeout = \"{}\"\n\
start_manual = {}\n\
channels = {}\n",
        config.source,
        config.endpoint,
        config.device,
        config.baud,
        config.serial_timeout_ms,
        config.poll_interval_ms,
        config.http_timeout_ms,
        config.watchdog_interval_ms,
        config.max_raw,
        config.active_shot_threshold,
        humantime::format_duration(config.hold_window),
        humantime::format_duration(config.no_data_timeout),
        humantime::format_duration(config.stale_timeout),
        config.start_manual,
        format_string_array(&channels),
    );
    fs::write(path, contents)?;
    Ok(())
}

pub fn parse(raw: &str) -> Result<Config> {
    let mut cfg = Config::default();

    for (idx, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (key, value) = trimmed.split_once('=').ok_or_else(|| {
            Error::InvalidArgs(format!("invalid config line {}: '{}'", idx + 1, line))
        })?;

        let key = key.trim();
        let value = value.trim().trim_matches('"');
        let line_no = idx + 1;
        match key {
            "source" => {
                cfg.source = value.parse().map_err(|e: String| {
                    Error::InvalidArgs(format!("invalid source on line {line_no}: {e}"))
                })?;
            }
            "endpoint" => cfg.endpoint = value.to_string(),
            "device" => cfg.device = value.to_string(),
            "baud" => cfg.baud = parse_number(key, value, line_no)?,
            "serial_timeout_ms" => cfg.serial_timeout_ms = parse_number(key, value, line_no)?,
            "poll_interval_ms" => cfg.poll_interval_ms = parse_number(key, value, line_no)?,
            "http_timeout_ms" => cfg.http_timeout_ms = parse_number(key, value, line_no)?,
            "watchdog_interval_ms" => {
                cfg.watchdog_interval_ms = parse_number(key, value, line_no)?
            }
            "max_raw" => cfg.max_raw = parse_number(key, value, line_no)?,
            "active_shot_threshold" => {
                cfg.active_shot_threshold = parse_number(key, value, line_no)?
            }
            "hold_window" => cfg.hold_window = parse_duration(key, value, line_no)?,
            "no_data_timeout" => cfg.no_data_timeout = parse_duration(key, value, line_no)?,
            "stale_timeout" => cfg.stale_timeout = parse_duration(key, value, line_no)?,
            "start_manual" => {
                cfg.start_manual = value.parse().map_err(|_| {
                    Error::InvalidArgs(format!(
                        "invalid start_manual on line {line_no}: expected true or false"
                    ))
                })?;
            }
            "channels" => {
                let names = parse_string_array(value).map_err(|e| {
                    Error::InvalidArgs(format!("invalid channels on line {line_no}: {e}"))
                })?;
                cfg.channels = names
                    .iter()
                    .map(|name| name.parse::<Channel>())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| {
                        Error::InvalidArgs(format!("invalid channels on line {line_no}: {e}"))
                    })?;
            }
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown config key '{other}' on line {line_no}"
                )));
            }
        }
    }

    super::validate(&cfg)?;
    Ok(cfg)
}

pub fn default_config_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or_else(|| {
        Error::InvalidArgs("home directory not found; cannot locate config directory".into())
    })?;
    Ok(dirs.home_dir().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str, line_no: usize) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::InvalidArgs(format!("invalid {key} value on line {line_no}")))
}

fn parse_duration(key: &str, value: &str, line_no: usize) -> Result<Duration> {
    humantime::parse_duration(value).map_err(|e| {
        Error::InvalidArgs(format!(
            "invalid {key} on line {line_no}: {e} (use e.g. \"10s\" or \"1500ms\")"
        ))
    })
}

fn parse_string_array(value: &str) -> std::result::Result<Vec<String>, String> {
    let trimmed = value.trim();
    if !trimmed.starts_with('[') || !trimmed.ends_with(']') {
        return Err("expected array literal (e.g., [\"toe\", \"laces\"])".into());
    }
    let inner = &trimmed[1..trimmed.len() - 1];
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut entries = Vec::new();
    for part in inner.split(',') {
        let item = part.trim();
        if item.is_empty() {
            continue;
        }
        let cleaned = item.trim_matches(|c| c == '"' || c == '\'').trim();
        if cleaned.is_empty() {
            return Err("array entries must not be empty".into());
        }
        entries.push(cleaned.to_string());
    }
    Ok(entries)
}

fn format_string_array(values: &[String]) -> String {
    let quoted = values
        .iter()
        .map(|value| format!("\"{value}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{quoted}]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn loads_default_when_missing() {
        let dir = TempDir::new().unwrap();
        let cfg = load_from_path(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn parses_valid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let contents = r#"
            # shoe on the bench
            source = "serial"
            endpoint = "https://kicksense.example/latest.json"
            device = "/dev/ttyUSB1"
            baud = 57600
            serial_timeout_ms = 50
            poll_interval_ms = 150
            http_timeout_ms = 1500
            watchdog_interval_ms = 250
            max_raw = 1023
            active_shot_threshold = 80
            hold_window = "5s"
            no_data_timeout = "3s 500ms"
            stale_timeout = "12s"
            start_manual = true
            channels = ["toe", "inside", "laces"]
        "#;
        fs::write(&path, contents).unwrap();
        let cfg = load_from_path(&path).unwrap();
        assert_eq!(cfg.source, SourceKind::Serial);
        assert_eq!(cfg.endpoint, "https://kicksense.example/latest.json");
        assert_eq!(cfg.device, "/dev/ttyUSB1");
        assert_eq!(cfg.baud, 57_600);
        assert_eq!(cfg.serial_timeout_ms, 50);
        assert_eq!(cfg.poll_interval_ms, 150);
        assert_eq!(cfg.http_timeout_ms, 1500);
        assert_eq!(cfg.watchdog_interval_ms, 250);
        assert_eq!(cfg.max_raw, 1023);
        assert_eq!(cfg.active_shot_threshold, 80);
        assert_eq!(cfg.hold_window, Duration::from_secs(5));
        assert_eq!(cfg.no_data_timeout, Duration::from_millis(3_500));
        assert_eq!(cfg.stale_timeout, Duration::from_secs(12));
        assert!(cfg.start_manual);
        assert_eq!(cfg.channels, Channel::PRIMARY.to_vec());
    }

    #[test]
    fn channel_aliases_resolve_in_config() {
        let cfg = parse(r#"channels = ["toe", "heel", "outside"]"#).unwrap();
        assert_eq!(
            cfg.channels,
            vec![Channel::Toe, Channel::Vrist2, Channel::Inside2]
        );
    }

    #[test]
    fn rejects_unknown_key() {
        let err = parse("nope = 1").unwrap_err();
        assert!(format!("{err}").contains("unknown config key"));
    }

    #[test]
    fn rejects_unknown_channel() {
        let err = parse(r#"channels = ["toe", "ankle"]"#).unwrap_err();
        assert!(format!("{err}").contains("unknown channel 'ankle'"));
    }

    #[test]
    fn rejects_bad_duration() {
        let err = parse(r#"stale_timeout = "soon""#).unwrap_err();
        assert!(format!("{err}").contains("stale_timeout on line 1"));
    }

    #[test]
    fn rejects_poll_interval_outside_range() {
        let err = parse("poll_interval_ms = 5").unwrap_err();
        assert!(format!("{err}").contains("poll_interval_ms must be between"));
    }

    #[test]
    fn rejects_zero_max_raw() {
        let err = parse("max_raw = 0").unwrap_err();
        assert!(format!("{err}").contains("max_raw"));
    }

    #[test]
    fn saves_and_loads_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = Config {
            source: SourceKind::Demo,
            device: "/dev/ttyS1".into(),
            baud: 57_600,
            hold_window: Duration::from_millis(2_500),
            start_manual: true,
            channels: vec![Channel::Laces, Channel::Toe],
            ..Config::default()
        };
        save_to_path(&cfg, &path).unwrap();
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(cfg, loaded);
    }
}

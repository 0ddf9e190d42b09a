use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::UtcOffset;

/// Name used for derived file names and the syslog ident
pub const PROGRAM: &str = "eltakoms";
pub const MIN_INTERVAL_SECS: u64 = 10;

const DEFAULT_DEVICE: &str = "/dev/ttyS1";
const DEFAULT_LOG_DIR: &str = "/usb/log";
const DEFAULT_SNAPSHOT_DIR: &str = "/dev/shm";
const DEFAULT_LOCK_DIR: &str = "/var/lock";
const DEFAULT_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ELTAKO_INTERVAL_SECS must be a whole number of seconds, got '{0}'")]
    InvalidInterval(String),
    #[error("interval too short: {0}s, minimum is {}s", MIN_INTERVAL_SECS)]
    IntervalTooShort(u64),
    #[error("ELTAKO_SINK must be 'file' or 'syslog', got '{0}'")]
    UnknownSink(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    File,
    Syslog,
}

#[derive(Debug, Clone)]
pub struct StationConfig {
    pub device: PathBuf,
    /// Last path component of the device, used in derived file names
    pub tty: String,
    pub interval_secs: u64,
    pub sink: SinkKind,
    pub log_file: PathBuf,
    pub snapshot_file: PathBuf,
    pub lock_dir: PathBuf,
    pub local_offset: UtcOffset,
}

impl StationConfig {
    /// Load configuration from the environment (and `.env`)
    ///
    /// Also captures the local UTC offset, which can only be queried
    /// reliably while the process is still single-threaded.
    pub fn new() -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();

        let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
        Self::from_lookup(|key| env::var(key).ok(), local_offset)
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        local_offset: UtcOffset,
    ) -> Result<Self, ConfigError> {
        let device = PathBuf::from(lookup("ELTAKO_DEVICE").unwrap_or_else(|| DEFAULT_DEVICE.into()));
        let tty = device
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tty".into());

        let interval_secs = match lookup("ELTAKO_INTERVAL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidInterval(raw.clone()))?,
            None => DEFAULT_INTERVAL_SECS,
        };
        if interval_secs < MIN_INTERVAL_SECS {
            return Err(ConfigError::IntervalTooShort(interval_secs));
        }

        let sink = match lookup("ELTAKO_SINK") {
            None => SinkKind::File,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "file" => SinkKind::File,
                "syslog" => SinkKind::Syslog,
                _ => return Err(ConfigError::UnknownSink(raw)),
            },
        };

        let base_name = format!("{}-{}", PROGRAM, tty);
        let log_file = lookup("ELTAKO_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| Path::new(DEFAULT_LOG_DIR).join(format!("{}.log", base_name)));
        let snapshot_file = lookup("ELTAKO_SNAPSHOT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DIR))
            .join(&base_name);
        let lock_dir = lookup("ELTAKO_LOCK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCK_DIR));

        Ok(StationConfig {
            device,
            tty,
            interval_secs,
            sink,
            log_file,
            snapshot_file,
            lock_dir,
            local_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<StationConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StationConfig::from_lookup(|key| vars.get(key).cloned(), UtcOffset::UTC)
    }

    #[test]
    fn defaults_follow_device_name() {
        let config = load(&[]).unwrap();
        assert_eq!(config.device, PathBuf::from("/dev/ttyS1"));
        assert_eq!(config.tty, "ttyS1");
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.sink, SinkKind::File);
        assert_eq!(config.log_file, PathBuf::from("/usb/log/eltakoms-ttyS1.log"));
        assert_eq!(config.snapshot_file, PathBuf::from("/dev/shm/eltakoms-ttyS1"));
        assert_eq!(config.lock_dir, PathBuf::from("/var/lock"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("ELTAKO_DEVICE", "/dev/ttyUSB0"),
            ("ELTAKO_INTERVAL_SECS", "300"),
            ("ELTAKO_SINK", "Syslog"),
            ("ELTAKO_SNAPSHOT_DIR", "/run/weather"),
        ])
        .unwrap();
        assert_eq!(config.interval_secs, 300);
        assert_eq!(config.sink, SinkKind::Syslog);
        assert_eq!(config.snapshot_file, PathBuf::from("/run/weather/eltakoms-ttyUSB0"));
        assert_eq!(config.log_file, PathBuf::from("/usb/log/eltakoms-ttyUSB0.log"));
    }

    #[test]
    fn rejects_short_interval() {
        assert_eq!(
            load(&[("ELTAKO_INTERVAL_SECS", "9")]).unwrap_err(),
            ConfigError::IntervalTooShort(9)
        );
        assert!(load(&[("ELTAKO_INTERVAL_SECS", "10")]).is_ok());
    }

    #[test]
    fn rejects_garbage_values() {
        assert_eq!(
            load(&[("ELTAKO_INTERVAL_SECS", "1m")]).unwrap_err(),
            ConfigError::InvalidInterval("1m".into())
        );
        assert_eq!(
            load(&[("ELTAKO_SINK", "database")]).unwrap_err(),
            ConfigError::UnknownSink("database".into())
        );
    }
}

//! Shared configuration for zonetrack.
//!
//! TOML file + `ZONETRACK_*` environment overrides on top of built-in
//! defaults for the stock eight-zone site, and translation to
//! `zonetrack_core::MonitorConfig`. The CLI layers its global flags on
//! top of this.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use zonetrack_core::{DisplayColor, MonitorConfig, ReconnectPolicy, ZoneConfig};

/// Prefix for environment overrides; nested keys are split on `__`.
pub const ENV_PREFIX: &str = "ZONETRACK_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub link: LinkSettings,

    #[serde(default)]
    pub store: StoreSettings,

    /// Zone table. Replaces the stock zones entirely when set.
    #[serde(default = "stock_zones")]
    pub zones: Vec<ZoneConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
            link: LinkSettings::default(),
            store: StoreSettings::default(),
            zones: stock_zones(),
        }
    }
}

/// CLI presentation defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// Zone link timings, in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkSettings {
    #[serde(default = "default_failure_delay")]
    pub failure_delay_ms: u64,

    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_read_buffer")]
    pub read_buffer: usize,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            failure_delay_ms: default_failure_delay(),
            settle_delay_ms: default_settle_delay(),
            connect_timeout_ms: default_connect_timeout(),
            read_buffer: default_read_buffer(),
        }
    }
}

impl LinkSettings {
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            failure_delay: Duration::from_millis(self.failure_delay_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            read_buffer: self.read_buffer,
        }
    }
}

fn default_failure_delay() -> u64 {
    5_000
}
fn default_settle_delay() -> u64 {
    1_000
}
fn default_connect_timeout() -> u64 {
    10_000
}
fn default_read_buffer() -> usize {
    1024
}

/// Tag directory settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreSettings {
    /// SQLite database path. Defaults to the platform data dir.
    pub database: Option<PathBuf>,

    #[serde(default = "default_store_timeout")]
    pub timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database: None,
            timeout_ms: default_store_timeout(),
        }
    }
}

fn default_store_timeout() -> u64 {
    5_000
}

// ── Stock zone table ────────────────────────────────────────────────

/// The standard site: two controllers with four reader ports each.
pub fn stock_zones() -> Vec<ZoneConfig> {
    const RPI1: (&str, &str) = ("pr-rpi001", "192.168.1.201");
    const RPI2: (&str, &str) = ("pr-rpi002", "192.168.1.202");

    let table: [(&str, u8, (&str, &str), u16, DisplayColor); 8] = [
        ("Bathing", 1, RPI1, 5001, DisplayColor::rgb(0xAD, 0xD8, 0xE6)),
        ("Drying", 2, RPI1, 5002, DisplayColor::rgb(0xF0, 0x80, 0x80)),
        ("Grooming Room 1", 3, RPI1, 5003, DisplayColor::rgb(0x90, 0xEE, 0x90)),
        ("Grooming Room 2", 4, RPI1, 5004, DisplayColor::rgb(0xFA, 0xFA, 0xD2)),
        ("Entryway", 5, RPI2, 5005, DisplayColor::rgb(0xDD, 0xA0, 0xDD)),
        ("Waiting Kennels", 6, RPI2, 5006, DisplayColor::rgb(0xFF, 0xDA, 0xB9)),
        ("Play Yard", 7, RPI2, 5007, DisplayColor::rgb(0xE0, 0xFF, 0xFF)),
        ("Pickup Kennel", 8, RPI2, 5008, DisplayColor::rgb(0xFF, 0xA0, 0x7A)),
    ];

    table
        .into_iter()
        .map(|(name, ordinal, (controller_id, host), port, color)| ZoneConfig {
            name: name.into(),
            ordinal,
            controller_id: controller_id.into(),
            host: host.into(),
            port,
            color,
        })
        .collect()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "pearidge", "zonetrack")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default SQLite database location.
pub fn default_database_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("zonetrack.db"),
        |dirs| dirs.data_dir().join("zonetrack.db"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("zonetrack");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the canonical config path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing file is fine) + environment, then validate.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Check zone table and timing invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.link.read_buffer == 0 {
            return Err(ConfigError::Validation {
                field: "link.read_buffer".into(),
                reason: "must be greater than zero".into(),
            });
        }
        self.to_monitor_config()
            .validate()
            .map_err(|e| ConfigError::Validation {
                field: "zones".into(),
                reason: e.to_string(),
            })
    }

    /// Database path: explicit setting or the platform default.
    pub fn database_path(&self) -> PathBuf {
        self.store
            .database
            .clone()
            .unwrap_or_else(default_database_path)
    }

    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            zones: self.zones.clone(),
            link: self.link.policy(),
            store_timeout: Duration::from_millis(self.store.timeout_ms),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_describe_stock_site() {
        let config = Config::default();
        assert_eq!(config.zones.len(), 8);
        assert!(config.validate().is_ok());

        let rpi2: Vec<&str> = config
            .zones
            .iter()
            .filter(|z| z.controller_id == "pr-rpi002")
            .map(|z| z.name.as_str())
            .collect();
        assert_eq!(rpi2, vec!["Entryway", "Waiting Kennels", "Play Yard", "Pickup Kennel"]);

        let monitor = config.to_monitor_config();
        assert_eq!(monitor.link.failure_delay, Duration::from_secs(5));
        assert_eq!(monitor.link.settle_delay, Duration::from_secs(1));
        assert_eq!(monitor.link.connect_timeout, Duration::from_secs(10));
        assert_eq!(monitor.store_timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.zones.len(), 8);
        assert_eq!(config.defaults.output, "table");
    }

    #[test]
    fn file_overrides_zones_and_timings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r##"
[link]
failure_delay_ms = 2000

[store]
database = "/tmp/tags.db"

[[zones]]
name = "Front Desk"
ordinal = 1
controller_id = "desk-pi"
host = "10.0.0.5"
port = 6001
color = "#123456"
"##,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.zones.len(), 1);
        assert_eq!(config.zones[0].name, "Front Desk");
        assert_eq!(config.zones[0].color, DisplayColor::rgb(0x12, 0x34, 0x56));
        assert_eq!(config.link.failure_delay_ms, 2000);
        assert_eq!(config.link.settle_delay_ms, 1000);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/tags.db"));
    }

    #[test]
    fn invalid_zone_table_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r##"
[[zones]]
name = "A"
ordinal = 1
controller_id = "x"
host = "h"
port = 1
color = "#000000"

[[zones]]
name = "B"
ordinal = 1
controller_id = "x"
host = "h"
port = 2
color = "#000000"
"##,
        )
        .unwrap();

        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn bad_color_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[[zones]]
name = "A"
ordinal = 1
controller_id = "x"
host = "h"
port = 1
color = "LightBlue"
"#,
        )
        .unwrap();

        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.link.connect_timeout_ms = 3000;
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.link.connect_timeout_ms, 3000);
        assert_eq!(loaded.zones, config.zones);
    }
}

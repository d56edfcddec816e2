//! Configuration loading
//!
//! Values are resolved in priority order:
//! 1. Command-line argument / environment variable (via the binary's clap args)
//! 2. TOML config file
//! 3. Compiled default
//!
//! A missing config file is not fatal: defaults are used and a warning is
//! logged. A config file named explicitly must exist.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "EVADM_CONFIG";

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5780";

/// Default scan prefix tokens, as in `aux-training-950920-08-6687`
pub const DEFAULT_SCAN_PREFIX: [&str; 2] = ["aux", "training"];

/// Which document store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(Error::Config(format!(
                "Unknown store backend '{}' (expected sqlite or memory)",
                other
            ))),
        }
    }
}

/// Scan code parsing settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Two leading `-`-separated tokens stripped from prefixed codes
    pub prefix: [String; 2],
    /// Reject prefixed codes whose remainder is not a 12-digit identity number
    pub strict_prefixed_remainder: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_SCAN_PREFIX.map(String::from),
            strict_prefixed_remainder: true,
        }
    }
}

/// On-disk TOML layout; every key optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub bind_addr: Option<String>,
    pub database_path: Option<PathBuf>,
    pub store: Option<StoreBackend>,
    pub shared_secret: Option<i64>,
    pub log_level: Option<String>,
    pub display_utc_offset_minutes: Option<i32>,
    pub scan: TomlScanConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlScanConfig {
    pub prefix: Option<[String; 2]>,
    pub strict_prefixed_remainder: Option<bool>,
}

impl TomlConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }
}

/// Highest-priority values, typically parsed by clap from CLI and env
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub database_path: Option<PathBuf>,
    pub store: Option<StoreBackend>,
    pub shared_secret: Option<i64>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub store: StoreBackend,
    /// `None` means "load or generate from the database"; `Some(0)` disables auth
    pub shared_secret: Option<i64>,
    pub log_level: String,
    pub display_utc_offset_minutes: i32,
    pub scan: ScanConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_path: default_database_path(),
            store: StoreBackend::Sqlite,
            shared_secret: None,
            log_level: "info".to_string(),
            display_utc_offset_minutes: 0,
            scan: ScanConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Resolve configuration from overrides, config file and defaults
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        let file = match resolve_config_path(overrides.config_file.as_deref()) {
            ConfigPath::Explicit(path) | ConfigPath::Discovered(path) => {
                info!("Loading config file {}", path.display());
                TomlConfig::load(&path)?
            }
            ConfigPath::None => {
                warn!("No config file found, using defaults");
                TomlConfig::default()
            }
        };

        Self::merge(overrides, file)
    }

    /// Combine overrides over file values over defaults
    pub fn merge(overrides: ConfigOverrides, file: TomlConfig) -> Result<Self> {
        let defaults = ServiceConfig::default();
        let scan_defaults = defaults.scan;

        let config = ServiceConfig {
            bind_addr: overrides
                .bind_addr
                .or(file.bind_addr)
                .unwrap_or(defaults.bind_addr),
            database_path: overrides
                .database_path
                .or(file.database_path)
                .unwrap_or(defaults.database_path),
            store: overrides.store.or(file.store).unwrap_or(defaults.store),
            shared_secret: overrides.shared_secret.or(file.shared_secret),
            log_level: overrides
                .log_level
                .or(file.log_level)
                .unwrap_or(defaults.log_level),
            display_utc_offset_minutes: file
                .display_utc_offset_minutes
                .unwrap_or(defaults.display_utc_offset_minutes),
            scan: ScanConfig {
                prefix: file.scan.prefix.unwrap_or(scan_defaults.prefix),
                strict_prefixed_remainder: file
                    .scan
                    .strict_prefixed_remainder
                    .unwrap_or(scan_defaults.strict_prefixed_remainder),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for token in &self.scan.prefix {
            if token.is_empty() || token.contains('-') {
                return Err(Error::Config(format!(
                    "Scan prefix tokens must be non-empty and contain no '-': {:?}",
                    token
                )));
            }
        }

        // FixedOffset accepts strictly less than a day
        if self.display_utc_offset_minutes.abs() >= 24 * 60 {
            return Err(Error::Config(format!(
                "display_utc_offset_minutes out of range: {}",
                self.display_utc_offset_minutes
            )));
        }

        Ok(())
    }
}

/// Where the config file came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigPath {
    /// Named on the command line or in `EVADM_CONFIG`
    Explicit(PathBuf),
    /// Found in a default location
    Discovered(PathBuf),
    None,
}

/// Locate the config file: CLI, then `EVADM_CONFIG`, then default locations
pub fn resolve_config_path(cli_arg: Option<&Path>) -> ConfigPath {
    if let Some(path) = cli_arg {
        return ConfigPath::Explicit(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return ConfigPath::Explicit(PathBuf::from(path));
        }
    }

    default_config_candidates()
        .into_iter()
        .find(|p| p.exists())
        .map(ConfigPath::Discovered)
        .unwrap_or(ConfigPath::None)
}

/// Platform config locations, user before system
fn default_config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("evadm").join("config.toml"));
    }
    if cfg!(unix) {
        candidates.push(PathBuf::from("/etc/evadm/config.toml"));
    }
    candidates
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("evadm"))
        .unwrap_or_else(|| PathBuf::from("./evadm_data"))
        .join("evadm.db")
}

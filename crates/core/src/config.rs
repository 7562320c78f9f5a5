//! Configuration resolution
//!
//! Each setting is taken from explicit configuration first (values passed to
//! [`Config::configure`] or loaded from the TOML settings file) and falls back
//! to the environment. Resolved values are memoized per [`Config`] instance
//! until the next call to [`Config::configure`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Request timeout used when nothing else is configured
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 8;

/// API host serving accounts in the US data region
pub const US_API_BASE: &str = "api.pcloud.com";

/// API host serving accounts in the EU data region
pub const EU_API_BASE: &str = "eapi.pcloud.com";

pub const ENV_ACCESS_TOKEN: &str = "PCLOUD_API_ACCESS_TOKEN";
pub const ENV_DATA_REGION: &str = "PCLOUD_API_DATA_REGION";
pub const ENV_TIMEOUT_SECONDS: &str = "PCLOUD_API_TIMEOUT_SECONDS";
pub const ENV_BASE_URI: &str = "PCLOUD_API_BASE_URI";
pub const ENV_TIME_ZONE: &str = "TZ";
pub const ENV_CONFIG_DIR: &str = "PCLOUD_CONFIG_DIR";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Geographic API partition of a pCloud account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataRegion {
    #[serde(rename = "EU")]
    Eu,
    #[serde(rename = "US")]
    Us,
}

impl DataRegion {
    pub const ALL: [DataRegion; 2] = [DataRegion::Eu, DataRegion::Us];

    /// Default API host for this region
    pub fn host(&self) -> &'static str {
        match self {
            DataRegion::Eu => EU_API_BASE,
            DataRegion::Us => US_API_BASE,
        }
    }

    fn invalid() -> Error {
        let names: Vec<String> = Self::ALL.iter().map(|r| r.to_string()).collect();
        Error::Config(format!(
            "Invalid pCloud data region, must be one of [{}]",
            names.join(", ")
        ))
    }
}

impl fmt::Display for DataRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataRegion::Eu => write!(f, "EU"),
            DataRegion::Us => write!(f, "US"),
        }
    }
}

impl std::str::FromStr for DataRegion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "EU" => Ok(DataRegion::Eu),
            "US" => Ok(DataRegion::Us),
            _ => Err(Self::invalid()),
        }
    }
}

/// Source of fallback values, normally the process environment
pub trait Environment: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads fallback values from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Explicit settings, as written in `config.toml`
///
/// ```toml
/// access_token = "..."
/// data_region = "EU"
/// timeout_seconds = 8
/// time_zone = "Europe/Berlin"
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Kept as text so an invalid value is reported at resolution time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    /// Host override; bypasses the region mapping entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,

    /// IANA time zone used to present timestamps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("data_region", &self.data_region)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("base_uri", &self.base_uri)
            .field("time_zone", &self.time_zone)
            .finish()
    }
}

impl Settings {
    /// Location of the settings file: `$PCLOUD_CONFIG_DIR/config.toml`,
    /// otherwise `<user config dir>/pcloud/config.toml`
    pub fn default_path(env: &dyn Environment) -> Option<PathBuf> {
        if let Some(dir) = env.var(ENV_CONFIG_DIR) {
            return Some(PathBuf::from(dir).join(CONFIG_FILE_NAME));
        }
        dirs::config_dir().map(|d| d.join("pcloud").join(CONFIG_FILE_NAME))
    }

    /// Load settings from a TOML file. A missing file yields empty settings.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {e}", path.display()))
        })
    }
}

/// Resolved client configuration
pub struct Config {
    settings: Settings,
    env: Arc<dyn Environment>,
    access_token: OnceLock<String>,
    data_region: OnceLock<DataRegion>,
    timeout_seconds: OnceLock<u64>,
    host: OnceLock<String>,
    time_zone: OnceLock<TimeZone>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("settings", &self.settings)
            .field("data_region", &self.data_region.get())
            .field("timeout_seconds", &self.timeout_seconds.get())
            .field("host", &self.host.get())
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Configuration with no explicit values, falling back to the process environment
    pub fn new() -> Self {
        Self::from_settings(Settings::default())
    }

    pub fn from_settings(settings: Settings) -> Self {
        Self {
            settings,
            env: Arc::new(ProcessEnv),
            access_token: OnceLock::new(),
            data_region: OnceLock::new(),
            timeout_seconds: OnceLock::new(),
            host: OnceLock::new(),
            time_zone: OnceLock::new(),
        }
    }

    /// Load the settings file from its default location, if any
    pub fn load() -> Result<Self> {
        let settings = match Settings::default_path(&ProcessEnv) {
            Some(path) => Settings::load_from(&path)?,
            None => Settings::default(),
        };
        Ok(Self::from_settings(settings))
    }

    /// Replace the fallback source
    pub fn with_environment(mut self, env: impl Environment + 'static) -> Self {
        self.env = Arc::new(env);
        self.clear_cache();
        self
    }

    /// Set explicit values. Always clears every memoized value, including the host.
    pub fn configure(
        &mut self,
        access_token: Option<String>,
        data_region: Option<DataRegion>,
        timeout_seconds: Option<u64>,
    ) {
        self.settings.access_token = access_token;
        self.settings.data_region = data_region.map(|r| r.to_string());
        self.settings.timeout_seconds = timeout_seconds;
        self.clear_cache();
    }

    /// Set the time zone used to present timestamps
    pub fn set_time_zone(&mut self, time_zone: Option<String>) {
        self.settings.time_zone = time_zone;
        self.clear_cache();
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn clear_cache(&mut self) {
        self.access_token = OnceLock::new();
        self.data_region = OnceLock::new();
        self.timeout_seconds = OnceLock::new();
        self.host = OnceLock::new();
        self.time_zone = OnceLock::new();
    }

    fn explicit_or_env(&self, explicit: &Option<String>, key: &str) -> Option<String> {
        explicit.clone().or_else(|| self.env.var(key))
    }

    pub fn resolve_access_token(&self) -> Result<String> {
        if let Some(token) = self.access_token.get() {
            return Ok(token.clone());
        }

        let token = self
            .explicit_or_env(&self.settings.access_token, ENV_ACCESS_TOKEN)
            .ok_or_else(|| Error::Config("Missing pCloud API access token".to_string()))?;
        Ok(self.access_token.get_or_init(|| token).clone())
    }

    pub fn resolve_data_region(&self) -> Result<DataRegion> {
        if let Some(region) = self.data_region.get() {
            return Ok(*region);
        }

        let region: DataRegion = self
            .explicit_or_env(&self.settings.data_region, ENV_DATA_REGION)
            .ok_or_else(|| Error::Config("Missing pCloud data region".to_string()))?
            .parse()?;
        Ok(*self.data_region.get_or_init(|| region))
    }

    pub fn resolve_timeout_seconds(&self) -> Result<u64> {
        if let Some(timeout) = self.timeout_seconds.get() {
            return Ok(*timeout);
        }

        let timeout = match self.settings.timeout_seconds {
            Some(t) => t,
            None => match self.env.var(ENV_TIMEOUT_SECONDS) {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    Error::Config(format!("Invalid pCloud API timeout seconds: {raw}"))
                })?,
                None => DEFAULT_TIMEOUT_SECONDS,
            },
        };

        if timeout == 0 {
            return Err(Error::Config(
                "Invalid pCloud API timeout seconds: cannot be set to 0".to_string(),
            ));
        }
        Ok(*self.timeout_seconds.get_or_init(|| timeout))
    }

    /// Host that serves API requests
    ///
    /// A base URI override wins over the region mapping; the region is not
    /// even consulted in that case.
    pub fn resolve_host(&self) -> Result<String> {
        if let Some(host) = self.host.get() {
            return Ok(host.clone());
        }

        let host = match self.explicit_or_env(&self.settings.base_uri, ENV_BASE_URI) {
            Some(host) => host,
            None => self.resolve_data_region()?.host().to_string(),
        };
        Ok(self.host.get_or_init(|| host).clone())
    }

    /// Time zone used to present timestamps, UTC unless configured
    pub fn resolve_time_zone(&self) -> Result<TimeZone> {
        if let Some(tz) = self.time_zone.get() {
            return Ok(tz.clone());
        }

        let tz = match self.explicit_or_env(&self.settings.time_zone, ENV_TIME_ZONE) {
            Some(name) => TimeZone::get(&name)
                .map_err(|e| Error::Config(format!("Invalid time zone '{name}': {e}")))?,
            None => TimeZone::UTC,
        };
        Ok(self.time_zone.get_or_init(|| tz).clone())
    }
}

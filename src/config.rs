//! Runtime settings.
//!
//! Loaded from a TOML file (`./parade_risk.toml`, or the path in
//! `PARADE_RISK_CONFIG`). A missing file means all defaults. `.env` is read
//! first so both variables can live there. `POWER_BASE_URL` overrides the
//! provider URL from the file.
//!
//! `[cache]` applies to a long-lived `CachedFetcher`. The CLI builds a fresh
//! one for each invocation and runs a single analysis, so these values never
//! produce a hit there.
//!
//! ```toml
//! [provider]
//! base_url = "https://power.larc.nasa.gov"
//! community = "RE"
//! timeout_secs = 30
//!
//! [fetch]
//! years_back = 15
//! floor_year = 1981
//!
//! [cache]
//! ttl_secs = 7200
//! capacity = 64
//!
//! [[profiles]]
//! name = "Kite Flying"
//! temp_min = 5.0
//! temp_max = 30.0
//! rain = 1.0
//! wind = 20.0
//! ```

use crate::ingest::power::{DEFAULT_COMMUNITY, DEFAULT_TIMEOUT_SECS, POWER_BASE_URL};
use crate::ingest::window::DATA_FLOOR_YEAR;
use crate::ingest::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
use crate::model::DEFAULT_YEARS_BACK;
use crate::profiles::{ProfileCatalog, ProfileOverride};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "./parade_risk.toml";
pub const CONFIG_PATH_ENV_VAR: &str = "PARADE_RISK_CONFIG";
pub const BASE_URL_ENV_VAR: &str = "POWER_BASE_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_community")]
    pub community: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    POWER_BASE_URL.to_string()
}

fn default_community() -> String {
    DEFAULT_COMMUNITY.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            community: default_community(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FetchSettings {
    #[serde(default = "default_years_back")]
    pub years_back: u32,
    #[serde(default = "default_floor_year")]
    pub floor_year: i32,
}

fn default_years_back() -> u32 {
    DEFAULT_YEARS_BACK
}

fn default_floor_year() -> i32 {
    DATA_FLOOR_YEAR
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            years_back: default_years_back(),
            floor_year: default_floor_year(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL.as_secs()
}

fn default_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            capacity: default_capacity(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub profiles: Vec<ProfileOverride>,
}

impl Settings {
    /// Loads `.env`, then the settings file, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env is normal.
        let _ = dotenv::dotenv();
        let path = std::env::var(CONFIG_PATH_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut settings = Self::load_from(&path)?;
        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Reads `path`; a file that does not exist yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV_VAR).filter(|u| !u.trim().is_empty()) {
            self.provider.base_url = url.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };
        if self.provider.timeout_secs == 0 {
            return Err(invalid("provider.timeout_secs", "must be positive"));
        }
        if !self.provider.base_url.starts_with("http://") && !self.provider.base_url.starts_with("https://") {
            return Err(invalid("provider.base_url", "must be an http(s) URL"));
        }
        if self.fetch.years_back == 0 {
            return Err(invalid("fetch.years_back", "must be at least 1"));
        }
        if self.fetch.floor_year < DATA_FLOOR_YEAR {
            return Err(invalid("fetch.floor_year", "provider data starts in 1981"));
        }
        if self.cache.capacity == 0 {
            return Err(invalid("cache.capacity", "must be at least 1"));
        }
        for p in &self.profiles {
            if p.name.trim().is_empty() {
                return Err(invalid("profiles.name", "must not be empty"));
            }
            if p.temp_min > p.temp_max {
                return Err(invalid(
                    &format!("profiles.{}", p.name),
                    "temp_min is above temp_max",
                ));
            }
            if p.rain < 0.0 || p.wind < 0.0 {
                return Err(invalid(
                    &format!("profiles.{}", p.name),
                    "rain and wind thresholds must be non-negative",
                ));
            }
        }
        Ok(())
    }

    /// Built-in profiles with this file's `[[profiles]]` applied.
    pub fn catalog(&self) -> ProfileCatalog {
        ProfileCatalog::with_overrides(&self.profiles)
    }
}

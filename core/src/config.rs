use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_path_to_error as spte;

use crate::error::ConfigError;
use crate::records::{Metadata, DEFAULT_DATA_ORIGIN};
use crate::store::{HealthStore, HttpStore, JsonDirStore, MemoryStore};

pub const DEFAULT_CONFIG_PATH: &str = "fitbridge.json";

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    Memory,
    Dir {
        path: PathBuf,
    },
    Http {
        base_url: String,
        #[serde(default)]
        token: Option<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Dir {
            path: PathBuf::from("health-store"),
        }
    }
}

impl StoreConfig {
    pub fn open(&self) -> Box<dyn HealthStore> {
        match self {
            StoreConfig::Memory => Box::new(MemoryStore::new()),
            StoreConfig::Dir { path } => Box::new(JsonDirStore::new(path.clone())),
            StoreConfig::Http {
                base_url,
                token,
                timeout_secs,
            } => Box::new(HttpStore::new(
                base_url.clone(),
                token.clone(),
                Duration::from_secs(*timeout_secs),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_origin: String,
    pub store: StoreConfig,
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_origin: DEFAULT_DATA_ORIGIN.to_string(),
            store: StoreConfig::default(),
            log_level: None,
        }
    }
}

impl Config {
    pub fn metadata(&self) -> Metadata {
        Metadata::actively_recorded(self.data_origin.clone())
    }

    /// Legger på `FITBRIDGE_*`-overstyringer fra prosessmiljøet.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(origin) = lookup("FITBRIDGE_DATA_ORIGIN") {
            self.data_origin = origin;
        }
        if let Some(dir) = lookup("FITBRIDGE_STORE_DIR") {
            self.store = StoreConfig::Dir { path: dir.into() };
        }
        // URL vinner over dir når begge er satt
        if let Some(url) = lookup("FITBRIDGE_STORE_URL") {
            self.set_store_url(url);
        }
        if let Some(token) = lookup("FITBRIDGE_STORE_TOKEN") {
            if let StoreConfig::Http { token: t, .. } = &mut self.store {
                *t = Some(token);
            }
        }
    }

    /// Peker lageret mot `url`. Token og timeout beholdes når lageret allerede er HTTP.
    pub fn set_store_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        match &mut self.store {
            StoreConfig::Http { base_url, .. } => *base_url = url,
            other => {
                *other = StoreConfig::Http {
                    base_url: url,
                    token: None,
                    timeout_secs: default_timeout_secs(),
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_origin.trim().is_empty() {
            return Err(ConfigError::Invalid("data_origin must not be empty".into()));
        }
        if let StoreConfig::Http {
            base_url,
            timeout_secs,
            ..
        } = &self.store
        {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "store.base_url must be http(s), got {base_url:?}"
                )));
            }
            if *timeout_secs == 0 {
                return Err(ConfigError::Invalid("store.timeout_secs must be > 0".into()));
            }
        }
        Ok(())
    }
}

/// Leser konfigurasjonen fra disk (JSON).
/// Mangler filen brukes standardverdier. Validering gjøres av kalleren etter
/// at miljø- og flaggoverstyringer er lagt på, se [`Config::validate`].
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        log::info!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut de = serde_json::Deserializer::from_str(&contents);
    let config: Config = spte::deserialize(&mut de).map_err(|e| ConfigError::Parse {
        path: e.path().to_string(),
        message: e.inner().to_string(),
    })?;
    log::info!("config loaded from {}", path.display());
    Ok(config)
}

/// Skriver konfigurasjonen som pen JSON.
pub fn save_config(config: &Config, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    std::fs::write(path, json).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

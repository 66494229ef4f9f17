use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RinglogConfig {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Which backend to build, and its construction parameters.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    Heap {
        #[serde(default = "defaults::capacity")]
        capacity: usize,
    },
    Mapped {
        #[serde(default = "defaults::capacity")]
        capacity: usize,
        #[serde(default = "defaults::path")]
        path: PathBuf,
        #[serde(default = "defaults::name")]
        name: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    use std::path::PathBuf;

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn capacity() -> usize {
        1 << 20 // 1 MiB
    }

    pub fn path() -> PathBuf {
        "/tmp/ringlog.buf".into()
    }

    pub fn name() -> String {
        "ringlog".into()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Heap {
            capacity: defaults::capacity(),
        }
    }
}

impl Default for RinglogConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level(),
            store: StoreConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn capacity(&self) -> usize {
        match self {
            StoreConfig::Heap { capacity } | StoreConfig::Mapped { capacity, .. } => *capacity,
        }
    }
}

impl RinglogConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let toml_to_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&toml_to_str)
    }

    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }
}

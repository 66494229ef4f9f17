mod config;

pub use config::{ConfigError, RinglogConfig, StoreConfig};

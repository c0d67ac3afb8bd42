//! Configuration for the EDSM client and the system cache

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// EDSM catalog client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdsmConfig {
    /// EDSM base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Minimum delay between consecutive requests in milliseconds.
    /// EDSM asks clients to pace themselves; all calls go out serially.
    pub throttle_ms: u64,
}

impl Default for EdsmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.edsm.net".to_string(),
            timeout_secs: 30,
            throttle_ms: 1000,
        }
    }
}

/// System cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Path of the binary cache store
    pub store_path: PathBuf,
}

impl CacheConfig {
    /// Store for a named tool mode (`finder`, `hunt`, ...), one file per mode
    pub fn for_mode(mode: &str) -> Self {
        Self {
            store_path: default_data_dir().join(format!("{mode}.cache")),
        }
    }

    /// Store for a named tool mode under an explicit data directory
    pub fn for_mode_in(data_dir: impl Into<PathBuf>, mode: &str) -> Self {
        Self {
            store_path: data_dir.into().join(format!("{mode}.cache")),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::for_mode("systems")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
        .join("exobio-hunt")
}

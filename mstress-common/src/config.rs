//! Configuration loading and data folder resolution
//!
//! Resolution priority for the data folder:
//! 1. Command-line argument (highest priority)
//! 2. `MSTRESS_DATA` environment variable
//! 3. TOML config file (`data_folder` key)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default HTTP bind address for mstress-at
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5741";

/// Default per-channel provider call timeout
pub const DEFAULT_CHANNEL_TIMEOUT_MS: u64 = 8000;

/// Service configuration loaded from TOML with environment overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Data folder holding mstress.db (optional; resolved separately)
    pub data_folder: Option<String>,

    /// HTTP bind address, e.g. "127.0.0.1:5741"
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Modality scoring provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Modality scoring provider settings
///
/// An absent `base_url` means no provider is reachable: every channel is
/// scored by local fallback synthesis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the modality scoring provider (e.g. "http://127.0.0.1:8000")
    pub base_url: Option<String>,

    /// Per-channel call timeout in milliseconds
    #[serde(default = "default_channel_timeout_ms")]
    pub channel_timeout_ms: u64,
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_channel_timeout_ms() -> u64 {
    DEFAULT_CHANNEL_TIMEOUT_MS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_folder: None,
            bind_address: default_bind_address(),
            provider: ProviderConfig::default(),
        }
    }
}

/// Load service configuration from a TOML file, then apply env overrides
///
/// A missing file yields the defaults; a present-but-unparseable file is a
/// configuration error.
///
/// Environment overrides:
/// - `MSTRESS_BIND_ADDRESS`
/// - `MSTRESS_PROVIDER_URL`
/// - `MSTRESS_CHANNEL_TIMEOUT_MS`
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let mut config = match path {
        Some(p) if p.exists() => {
            let content = std::fs::read_to_string(p)
                .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Parse config failed: {}", e)))?
        }
        Some(p) => {
            return Err(Error::Config(format!("Config file not found: {}", p.display())));
        }
        None => {
            let default_path = default_config_path();
            match default_path {
                Some(p) if p.exists() => {
                    let content = std::fs::read_to_string(&p)
                        .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
                    toml::from_str(&content)
                        .map_err(|e| Error::Config(format!("Parse config failed: {}", e)))?
                }
                _ => ServiceConfig::default(),
            }
        }
    };

    if let Ok(addr) = std::env::var("MSTRESS_BIND_ADDRESS") {
        info!("Bind address overridden from environment: {}", addr);
        config.bind_address = addr;
    }
    if let Ok(url) = std::env::var("MSTRESS_PROVIDER_URL") {
        info!("Provider URL overridden from environment");
        config.provider.base_url = Some(url);
    }
    if let Ok(timeout) = std::env::var("MSTRESS_CHANNEL_TIMEOUT_MS") {
        config.provider.channel_timeout_ms = timeout
            .parse()
            .map_err(|e| Error::Config(format!("Invalid MSTRESS_CHANNEL_TIMEOUT_MS: {}", e)))?;
    }

    Ok(config)
}

/// Resolve the data folder holding mstress.db
pub fn resolve_data_folder(cli_arg: Option<&str>, config: &ServiceConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("MSTRESS_DATA") {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Some(folder) = &config.data_folder {
        return PathBuf::from(folder);
    }

    // Priority 4: OS-dependent compiled default
    default_data_folder()
}

/// Ensure the data folder exists, creating it if missing
pub fn ensure_data_folder(folder: &Path) -> Result<()> {
    std::fs::create_dir_all(folder)?;
    Ok(())
}

/// Database path inside the data folder
pub fn database_path(folder: &Path) -> PathBuf {
    folder.join("mstress.db")
}

/// Default configuration file path for the platform
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mstress").join("config.toml"))
}

/// OS-dependent default data folder path
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mstress"))
        .unwrap_or_else(|| PathBuf::from("./mstress_data"))
}

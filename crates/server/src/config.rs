//! Server configuration via `dynamickv.toml` and environment variables.
//!
//! The data directory holds an optional `dynamickv.toml`; a default one
//! (with commented defaults) is written on first open. To change settings,
//! edit the file and restart - or override per-process with environment
//! variables, which win over the file:
//!
//! - `DYNAMICKV_ADDR` - listen address
//! - `DYNAMICKV_DATA_DIR` - data directory (resolved before the file is read)
//! - `DYNAMICKV_DURABILITY` - `always` or `standard`
//! - `DYNAMICKV_SEARCH_COLLECTION` - collection behind `/api/search`

use dynamickv_core::{Error, Result};
use dynamickv_storage::DurabilityMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file name placed in the data directory.
pub const CONFIG_FILE_NAME: &str = "dynamickv.toml";

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP gateway listens on.
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Data directory holding one log file per collection.
    ///
    /// Not read from the config file (the file lives inside it); resolved
    /// from CLI flag, environment, or the default, in that order.
    #[serde(skip)]
    pub data_dir: PathBuf,

    /// Durability mode: `"always"` or `"standard"`.
    #[serde(default = "default_durability")]
    pub durability: String,

    /// Collection the `/api/search` route scans.
    #[serde(default = "default_search_collection")]
    pub search_collection: String,
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_durability() -> String {
    "always".to_string()
}

fn default_search_collection() -> String {
    "products".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: default_addr(),
            data_dir: PathBuf::from("./data"),
            durability: default_durability(),
            search_collection: default_search_collection(),
        }
    }
}

impl ServerConfig {
    /// Resolve the data directory: explicit value, else
    /// `DYNAMICKV_DATA_DIR`, else `./data`.
    pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| std::env::var_os("DYNAMICKV_DATA_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("./data"))
    }

    /// Load configuration for a data directory: file (if present), then
    /// environment overrides.
    pub fn load(data_dir: PathBuf) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            ServerConfig::default()
        };
        config.data_dir = data_dir;
        config.apply_env();
        Ok(config)
    }

    /// Read and parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            Error::validation(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("DYNAMICKV_ADDR") {
            self.addr = addr;
        }
        if let Ok(durability) = std::env::var("DYNAMICKV_DURABILITY") {
            self.durability = durability;
        }
        if let Ok(collection) = std::env::var("DYNAMICKV_SEARCH_COLLECTION") {
            self.search_collection = collection;
        }
    }

    /// Parse the durability string into a `DurabilityMode`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the string is neither `"always"` nor
    /// `"standard"`.
    pub fn durability_mode(&self) -> Result<DurabilityMode> {
        DurabilityMode::parse(&self.durability).ok_or_else(|| {
            Error::validation(format!(
                "invalid durability mode '{}'. Expected \"always\" or \"standard\".",
                self.durability
            ))
        })
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# DynamicKV server configuration
#
# Address the HTTP gateway listens on.
addr = "127.0.0.1:8080"

# Durability mode: "always" (default) or "standard"
#   "always"   = fsync every append, zero committed-write loss
#   "standard" = OS-buffered appends, may lose the last writes on crash
durability = "always"

# Collection served by GET /api/search
search_collection = "products"
"#
    }

    /// Write the default config file if the data directory has none yet.
    pub fn write_default_if_missing(data_dir: &Path) -> Result<()> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            std::fs::write(&path, Self::default_toml())?;
        }
        Ok(())
    }
}

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::GenomicOpsError;
use crate::store::Store;

pub const DEFAULT_CONFIG_FILE: &str = "genomicops.json";
pub const DEFAULT_API_BASE: &str = "https://api.genome.ucsc.edu";
pub const DEFAULT_DOWNLOAD_BASE: &str = "https://hgdownload.soe.ucsc.edu";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 3600;

/// On-disk configuration. Every field is optional; unset fields fall back to
/// the UCSC public endpoints and a per-user data directory.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub download_base: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub cache_file: Option<String>,
    #[serde(default)]
    pub liftover_dir: Option<String>,
    #[serde(default)]
    pub chain_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base: String,
    pub download_base: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub store: Store,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<Settings, GenomicOpsError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| GenomicOpsError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| GenomicOpsError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<Settings, GenomicOpsError> {
        let base = match config.data_dir {
            Some(dir) => Store::new_with_root(Utf8PathBuf::from(dir)),
            None => Store::new()?,
        };
        let store = Store::new_with_paths(
            config
                .cache_file
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| base.cache_file().to_owned()),
            config
                .liftover_dir
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| base.liftover_dir().to_owned()),
            config
                .chain_dir
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| base.chain_dir().to_owned()),
        );

        Ok(Settings {
            api_base: trim_base(config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)),
            download_base: trim_base(
                config
                    .download_base
                    .as_deref()
                    .unwrap_or(DEFAULT_DOWNLOAD_BASE),
            ),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            cache_ttl: Duration::from_secs(
                config.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS),
            ),
            store,
        })
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

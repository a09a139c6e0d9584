use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENDPOINT_ENV: &str = "CALOREZ_ENDPOINT";
const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 3000;

pub struct Config {
    pub db_path: PathBuf,
    pub endpoint: Option<String>,
    pub flush_timeout: Duration,
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    endpoint: Option<String>,
    flush_timeout_ms: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "calorez").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let config_path = proj_dirs.config_dir().join("config.toml");
        let env_endpoint = std::env::var(ENDPOINT_ENV).ok();

        Self::from_parts(&data_dir, &config_path, env_endpoint)
    }

    fn from_parts(
        data_dir: &Path,
        config_path: &Path,
        env_endpoint: Option<String>,
    ) -> Result<Self> {
        let file = if config_path.exists() {
            let raw = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            toml::from_str::<FileConfig>(&raw)
                .with_context(|| format!("Invalid config file: {}", config_path.display()))?
        } else {
            FileConfig::default()
        };

        let endpoint = non_empty(env_endpoint).or_else(|| non_empty(file.endpoint));
        let flush_timeout =
            Duration::from_millis(file.flush_timeout_ms.unwrap_or(DEFAULT_FLUSH_TIMEOUT_MS));

        Ok(Config {
            db_path: data_dir.join("calorez.db"),
            endpoint,
            flush_timeout,
        })
    }

    /// Pick the mirror endpoint for this run: `--offline` wins, then
    /// `--endpoint`, then whatever the environment or config file set.
    pub fn resolve_endpoint(&self, flag: Option<String>, offline: bool) -> Option<String> {
        if offline {
            return None;
        }
        non_empty(flag).or_else(|| self.endpoint.clone())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

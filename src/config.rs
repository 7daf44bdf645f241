use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

/// Default generation endpoint when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const BASE_URL_ENV: &str = "CHARLA_BASE_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub base_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self { base_url: None }
    }

    /// Load the config, writing a default file on first run so the endpoint
    /// is easy to find and edit.
    pub fn load_or_init() -> Result<Self> {
        let path = Self::get_config_path()?;
        if !path.exists() {
            let config = Self::new();
            config.save_to(&path)?;
            return Ok(config);
        }
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Endpoint resolution: env var first, then the config file, then the
    /// documented default.
    pub fn resolve_base_url(&self) -> String {
        resolve_base_url_from(std::env::var(BASE_URL_ENV).ok(), self.base_url.as_deref())
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("charla").join("config.json"))
    }
}

fn resolve_base_url_from(env_value: Option<String>, file_value: Option<&str>) -> String {
    env_value
        .or_else(|| file_value.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

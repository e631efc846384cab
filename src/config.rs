use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub start_dir: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        // First run: write defaults so the user has a file to edit
        if !config_path.exists() {
            let config = Self::new();
            let _ = config.save();
            return Ok(config);
        }

        Self::read_from(&config_path)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        self.write_to(&config_path)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Request timeout, if one is configured. Unset means the transport
    /// default applies.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    fn read_from(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("pdfagent").join("config.json"))
    }
}

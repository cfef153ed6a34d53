//! CLI Configuration

use anyhow::{anyhow, Context};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::output::OutputFormat;

const CONFIG_DIR: &str = ".formsmith";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    pub store_dir: Option<PathBuf>,
    pub default_format: Option<String>,
}

impl Config {
    pub fn load(profile: Option<&str>) -> anyhow::Result<Self> {
        let path = Self::config_path(profile)?;
        if path.exists() {
            let content = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, profile: Option<&str>) -> anyhow::Result<PathBuf> {
        let path = Self::config_path(profile)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Configured store directory, else `~/.formsmith/forms`
    pub fn store_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.store_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(home()?.join(CONFIG_DIR).join("forms")),
        }
    }

    pub fn format(&self) -> anyhow::Result<OutputFormat> {
        match &self.default_format {
            Some(name) => OutputFormat::from_str(name, true).map_err(|e| anyhow!("default_format: {e}")),
            None => Ok(OutputFormat::Table),
        }
    }

    fn config_path(profile: Option<&str>) -> anyhow::Result<PathBuf> {
        let filename = match profile {
            Some(p) => format!("config.{}.toml", p),
            None => "config.toml".to_string(),
        };
        Ok(home()?.join(CONFIG_DIR).join(filename))
    }
}

fn home() -> anyhow::Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| anyhow!("cannot find home directory"))
}

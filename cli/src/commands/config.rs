//! Config commands

use anyhow::bail;
use std::path::PathBuf;

use crate::config::Config;
use crate::ConfigCommands;

const KEYS: [&str; 2] = ["store_dir", "default_format"];

pub fn handle(action: ConfigCommands, profile: Option<&str>) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Init => {
            let path = Config::default().save(profile)?;
            println!("Configuration initialized at {}", path.display());
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load(profile)?;
            match key.as_str() {
                "store_dir" => config.store_dir = Some(PathBuf::from(value)),
                "default_format" => {
                    config.default_format = Some(value);
                    config.format()?;
                }
                _ => bail!("unknown config key: {key} (expected one of {})", KEYS.join(", ")),
            }
            config.save(profile)?;
            println!("Set {} successfully", key);
        }
        ConfigCommands::Get { key } => {
            let config = Config::load(profile)?;
            println!("{}: {}", key, lookup(&config, &key)?.unwrap_or_else(|| "(not set)".into()));
        }
        ConfigCommands::List => {
            let config = Config::load(profile)?;
            for key in KEYS {
                println!("{}: {}", key, lookup(&config, key)?.unwrap_or_else(|| "(not set)".into()));
            }
        }
    }
    Ok(())
}

fn lookup(config: &Config, key: &str) -> anyhow::Result<Option<String>> {
    Ok(match key {
        "store_dir" => config.store_dir.as_ref().map(|p| p.display().to_string()),
        "default_format" => config.default_format.clone(),
        _ => bail!("unknown config key: {key}"),
    })
}

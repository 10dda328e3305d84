use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use tracing::info;

use crate::models::Config;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

pub fn load_config(path: &Path) -> Result<Config> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    validate(&config).with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

/// An explicit path must exist; otherwise `config.toml` is used when present,
/// falling back to built-in defaults.
pub fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                load_config(default)
            } else {
                info!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                Ok(Config::default())
            }
        }
    }
}

pub fn timezone(config: &Config) -> Result<Tz> {
    config
        .server
        .timezone
        .parse::<Tz>()
        .map_err(|e| anyhow!("Unknown timezone '{}': {}", config.server.timezone, e))
}

fn validate(config: &Config) -> Result<()> {
    let slots = &config.slots;
    if slots.start_hour > slots.end_hour {
        bail!(
            "slots.start_hour ({}) must not be after slots.end_hour ({})",
            slots.start_hour,
            slots.end_hour
        );
    }
    if slots.end_hour > 22 {
        bail!("slots.end_hour must be at most 22 (the last slot ends at 23:00)");
    }
    timezone(config)?;
    Ok(())
}

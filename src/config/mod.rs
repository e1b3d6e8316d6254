mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Locations searched, in order, when no config path is given.
pub const DEFAULT_PATHS: [&str; 2] = ["./vidstage.toml", "~/.config/vidstage/config.toml"];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config).with_context(|| format!("Invalid config file: {:?}", path))?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in DEFAULT_PATHS {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration, logging non-fatal findings
pub fn validate_config(config: &Config) -> Result<Vec<String>> {
    let warnings = config.validate()?;
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }
    Ok(warnings)
}

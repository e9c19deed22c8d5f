//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use dl_core::config::{self, ClientConfig};
use dl_core::error::ConfigError;

/// Load the client configuration.
///
/// An explicit path must exist. Without one, the default file is used when
/// present and built-in defaults otherwise.
pub fn load_client_config(config_path: Option<&PathBuf>) -> Result<ClientConfig> {
    let config = match config_path {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => {
            let default_path = config::default_config_path();
            match config::load_config(&default_path) {
                Ok(config) => config,
                Err(ConfigError::NotFound(_)) => {
                    tracing::debug!("No config file at {:?}; using defaults", default_path);
                    ClientConfig::default()
                }
                Err(e) => {
                    tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                    ClientConfig::default()
                }
            }
        }
    };
    Ok(config)
}

fn resolve_path(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(config::default_config_path)
}

/// Get a config value by dotted key (e.g. `backoff.max_attempts`)
pub fn config_get(config_path: Option<&PathBuf>, key: &str) -> Result<()> {
    let config = load_client_config(config_path)?;
    let value = toml::Value::try_from(&config).context("Failed to serialize config")?;

    let mut current = &value;
    for part in key.split('.') {
        match current.get(part) {
            Some(next) => current = next,
            None => {
                print_error(&format!("Key not found: {}", key));
                return Ok(());
            }
        }
    }

    match current {
        toml::Value::String(s) => println!("{}", s),
        toml::Value::Table(_) => println!("{}", toml::to_string_pretty(current)?),
        other => println!("{}", other),
    }
    Ok(())
}

/// Show the effective configuration
pub fn config_show(config_path: Option<&PathBuf>) -> Result<()> {
    let path = resolve_path(config_path);
    if path.exists() {
        print_info(&format!("Configuration file: {:?}", path));
    } else {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Showing built-in defaults; run 'devlink config init' to create one");
    }
    println!();

    let config = load_client_config(config_path)?;
    println!(
        "{}",
        toml::to_string_pretty(&config).context("Failed to serialize config")?
    );

    match config.endpoint() {
        Ok(endpoint) => print_info(&format!("Endpoint: {}", endpoint)),
        Err(e) => print_warning(&format!("No usable endpoint: {}", e)),
    }
    Ok(())
}

/// Write the default configuration
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let path = resolve_path(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    write_default_config(&path)?;
    print_success(&format!("Created configuration file: {:?}", path));
    Ok(())
}

fn write_default_config(path: &Path) -> Result<()> {
    config::save_config(path, &ClientConfig::default())
        .with_context(|| format!("Failed to write config file: {:?}", path))
}

//! Application service: configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::DeckhandConfig;

/// Load configuration.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed.
pub fn load_config(store: &impl ConfigStore) -> Result<DeckhandConfig> {
    store.load()
}

/// Validate and persist one setting. Returns the updated configuration.
///
/// # Errors
///
/// Returns a [`ConfigError`](crate::domain::ConfigError) for an unknown key
/// or invalid value, or an I/O error from the store.
pub fn set_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<DeckhandConfig> {
    let mut config = store.load()?;
    config.set(key, value)?;
    store.save(&config)?;
    Ok(config)
}

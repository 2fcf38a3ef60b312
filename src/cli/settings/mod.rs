//! Settings management for CLI set/unset commands.
//!
//! Each configuration key has a [`SettingHandler`]. Handlers validate input
//! and edit a [`Config`] in place; [`apply_set`] and [`apply_unset`] wrap that
//! edit in [`Config::mutate`] so nothing is written when validation fails.
//!
//! - Simple settings (`backend-url`, `listen`, `request-timeout`, `theme`)
//! - Boolean settings (`markdown`, `syntax`, `typing-animation`)

pub mod error;
pub mod handlers;
pub mod helpers;
pub mod registry;
#[cfg(test)]
mod tests;

pub use error::SettingError;
pub use registry::SettingRegistry;

use crate::core::config::data::Config;
use helpers::mutate_config;

/// Trait for handling a configuration setting.
pub trait SettingHandler: Send + Sync {
    /// Returns the key as typed on the command line (e.g. `backend-url`).
    fn key(&self) -> &'static str;

    /// Validate `args` and store the value in `config`.
    ///
    /// # Returns
    /// A success message to display, or an error.
    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError>;

    /// Clear the value so the built-in default applies again.
    fn unset(&self, config: &mut Config) -> Result<String, SettingError>;

    /// Format the current value for display in `nakshatra set` output.
    fn format(&self, config: &Config) -> String;
}

pub fn apply_set(
    registry: &SettingRegistry,
    key: &str,
    args: &[String],
) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    mutate_config(|config| handler.set(args, config))
}

pub fn apply_unset(registry: &SettingRegistry, key: &str) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    mutate_config(|config| handler.unset(config))
}

/// Every setting with its current value, one per line.
pub fn describe_all(registry: &SettingRegistry, config: &Config) -> Vec<String> {
    registry
        .keys_display_order()
        .iter()
        .filter_map(|key| registry.get(key))
        .map(|handler| handler.format(config))
        .collect()
}

//! Helper functions for settings operations.

use crate::core::config::data::Config;
use crate::ui::theme::Theme;
use crate::utils::url::{is_http_url, normalize_base_url};

use super::error::SettingError;

/// Run `edit` inside [`Config::mutate`]. A handler error aborts the write and
/// comes back unchanged; persistence failures become
/// [`SettingError::ConfigError`].
pub fn mutate_config<F>(edit: F) -> Result<String, SettingError>
where
    F: FnOnce(&mut Config) -> Result<String, SettingError>,
{
    Config::mutate(|config| edit(config).map_err(|err| Box::new(err) as Box<dyn std::error::Error>))
        .map_err(|err| match err.downcast::<SettingError>() {
            Ok(setting) => *setting,
            Err(other) => SettingError::ConfigError(other.to_string()),
        })
}

/// Parse a boolean value from user input.
///
/// Accepts: on/off, true/false, yes/no (case-insensitive).
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Format a boolean value for display.
pub fn format_bool(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

pub fn success_set(key: &str, value: &str) -> String {
    format!("✅ Set {key} to: {value}")
}

pub fn success_unset(key: &str, default: &str) -> String {
    format!("✅ Unset {key} (will use default: {default})")
}

/// Validate and canonicalise a theme name.
pub fn validate_theme(input: &str) -> Result<String, SettingError> {
    let name = input.trim().to_ascii_lowercase();
    if Theme::is_known(&name) {
        Ok(name)
    } else {
        Err(SettingError::UnknownTheme {
            input: input.to_string(),
        })
    }
}

/// Validate a backend URL and strip trailing slashes.
pub fn validate_backend_url(input: &str) -> Result<String, SettingError> {
    if !is_http_url(input) {
        return Err(SettingError::InvalidValue {
            key: "backend-url",
            input: input.to_string(),
            reason: "Expected an http:// or https:// URL, e.g. http://localhost:8000",
        });
    }
    Ok(normalize_base_url(input))
}

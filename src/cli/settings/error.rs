//! Error types for settings operations.

use thiserror::Error;

use crate::ui::theme::THEME_NAMES;

/// Errors that can occur when modifying configuration settings.
#[derive(Debug, Error)]
pub enum SettingError {
    /// The provided setting key is not recognized.
    #[error("Unknown config key: {0}")]
    UnknownKey(String),
    /// The provided theme identifier was not found.
    #[error("Unknown theme: {input}")]
    UnknownTheme { input: String },
    /// The provided value could not be parsed as a boolean.
    #[error("Invalid boolean value: {0}")]
    InvalidBoolean(String),
    /// The value is the wrong shape for this key.
    #[error("Invalid value for {key}: {input} ({reason})")]
    InvalidValue {
        key: &'static str,
        input: String,
        reason: &'static str,
    },
    /// Required arguments are missing.
    #[error("{hint}")]
    MissingArgs {
        hint: &'static str,
        example: &'static str,
    },
    /// An error occurred while persisting the configuration.
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl SettingError {
    /// Print the error message to stderr with appropriate formatting.
    pub fn print(&self) {
        match self {
            SettingError::UnknownKey(key) => {
                eprintln!("❌ Unknown config key: {key}");
                eprintln!("   Run 'nakshatra set' to list the available keys.");
            }
            SettingError::UnknownTheme { input } => {
                eprintln!("❌ Unknown theme: {input}");
                eprintln!("   Available themes: {}", THEME_NAMES.join(", "));
            }
            SettingError::InvalidBoolean(input) => {
                eprintln!("❌ Invalid boolean value: {input}");
                eprintln!("   Use 'on' or 'off' (also accepts true/false, yes/no)");
            }
            SettingError::InvalidValue { key, input, reason } => {
                eprintln!("❌ Invalid value for {key}: {input}");
                eprintln!("   {reason}");
            }
            SettingError::MissingArgs { hint, example } => {
                eprintln!("⚠️  {hint}");
                eprintln!("Example: {example}");
            }
            SettingError::ConfigError(msg) => {
                eprintln!("❌ Failed to save configuration: {msg}");
            }
        }
    }

    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SettingError::MissingArgs { .. } => 2,
            _ => 1,
        }
    }
}

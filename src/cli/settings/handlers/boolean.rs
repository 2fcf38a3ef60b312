//! Boolean setting handlers for on/off settings.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{format_bool, parse_bool, success_set, success_unset};
use crate::cli::settings::SettingHandler;
use crate::core::config::data::Config;

/// Data-driven handler for boolean (on/off) settings.
pub struct BooleanHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    default_display: &'static str,
    get: fn(&Config) -> Option<bool>,
    set_field: fn(&mut Config, Option<bool>),
}

impl SettingHandler for BooleanHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }

        let input = args.join(" ");
        let value = parse_bool(&input).ok_or(SettingError::InvalidBoolean(input))?;
        (self.set_field)(config, Some(value));
        Ok(success_set(self.key, format_bool(value)))
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        (self.set_field)(config, None);
        Ok(success_unset(self.key, self.default_display))
    }

    fn format(&self, config: &Config) -> String {
        match (self.get)(config) {
            Some(value) => format!("  {}: {}", self.key, format_bool(value)),
            None => format!("  {}: (unset, default: {})", self.key, self.default_display),
        }
    }
}

/// Create a handler for the `markdown` setting.
pub fn markdown_handler() -> BooleanHandler {
    BooleanHandler {
        key: "markdown",
        hint: "To set markdown rendering, specify on or off:",
        example: "nakshatra set markdown off",
        default_display: "on",
        get: |c| c.markdown,
        set_field: |c, v| c.markdown = v,
    }
}

/// Create a handler for the `syntax` setting.
pub fn syntax_handler() -> BooleanHandler {
    BooleanHandler {
        key: "syntax",
        hint: "To set syntax highlighting, specify on or off:",
        example: "nakshatra set syntax off",
        default_display: "on",
        get: |c| c.syntax,
        set_field: |c, v| c.syntax = v,
    }
}

/// Create a handler for the `typing-animation` setting.
pub fn typing_animation_handler() -> BooleanHandler {
    BooleanHandler {
        key: "typing-animation",
        hint: "To turn the typing effect for new replies on or off, specify on or off:",
        example: "nakshatra set typing-animation off",
        default_display: "on",
        get: |c| c.typing_animation,
        set_field: |c, v| c.typing_animation = v,
    }
}

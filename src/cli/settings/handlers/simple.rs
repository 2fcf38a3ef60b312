//! Simple setting handlers for single-value settings.

use std::net::SocketAddr;

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{
    success_set, success_unset, validate_backend_url, validate_theme,
};
use crate::cli::settings::SettingHandler;
use crate::core::config::data::Config;
use crate::core::constants::{
    BACKEND_URL_ENV, DEFAULT_BACKEND_URL, DEFAULT_LISTEN_ADDRESS, DEFAULT_REQUEST_TIMEOUT_SECS,
};

/// Handler for the `backend-url` setting.
pub struct BackendUrlHandler;

impl SettingHandler for BackendUrlHandler {
    fn key(&self) -> &'static str {
        "backend-url"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To set the backend, specify its base URL:",
                example: "nakshatra set backend-url https://astro.example.com",
            });
        }

        let url = validate_backend_url(&args.join(""))?;
        let message = success_set("backend-url", &url);
        config.backend_url = Some(url);
        Ok(message)
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        config.backend_url = None;
        Ok(success_unset("backend-url", DEFAULT_BACKEND_URL))
    }

    fn format(&self, config: &Config) -> String {
        match &config.backend_url {
            Some(url) => format!("  backend-url: {url}"),
            None => format!(
                "  backend-url: (unset, default: {DEFAULT_BACKEND_URL}; {BACKEND_URL_ENV} overrides)"
            ),
        }
    }
}

/// Handler for the `listen` setting used by `nakshatra serve`.
pub struct ListenHandler;

impl SettingHandler for ListenHandler {
    fn key(&self) -> &'static str {
        "listen"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To set the proxy listen address, specify host:port:",
                example: "nakshatra set listen 0.0.0.0:3000",
            });
        }

        let input = args.join("");
        let address: SocketAddr = input.trim().parse().map_err(|_| SettingError::InvalidValue {
            key: "listen",
            input: input.clone(),
            reason: "Expected an IP address and port, e.g. 127.0.0.1:3000",
        })?;
        let address = address.to_string();
        let message = success_set("listen", &address);
        config.listen = Some(address);
        Ok(message)
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        config.listen = None;
        Ok(success_unset("listen", DEFAULT_LISTEN_ADDRESS))
    }

    fn format(&self, config: &Config) -> String {
        match &config.listen {
            Some(address) => format!("  listen: {address}"),
            None => format!("  listen: (unset, default: {DEFAULT_LISTEN_ADDRESS})"),
        }
    }
}

/// Handler for the `request-timeout` setting, in seconds.
pub struct RequestTimeoutHandler;

impl SettingHandler for RequestTimeoutHandler {
    fn key(&self) -> &'static str {
        "request-timeout"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To set how long to wait for the backend, specify seconds:",
                example: "nakshatra set request-timeout 45",
            });
        }

        let input = args.join(" ");
        let secs = input
            .trim()
            .trim_end_matches('s')
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| SettingError::InvalidValue {
                key: "request-timeout",
                input: input.clone(),
                reason: "Expected a whole number of seconds greater than zero",
            })?;
        config.request_timeout_secs = Some(secs);
        Ok(success_set("request-timeout", &format!("{secs}s")))
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        config.request_timeout_secs = None;
        Ok(success_unset(
            "request-timeout",
            &format!("{DEFAULT_REQUEST_TIMEOUT_SECS}s"),
        ))
    }

    fn format(&self, config: &Config) -> String {
        match config.request_timeout_secs {
            Some(secs) => format!("  request-timeout: {secs}s"),
            None => format!("  request-timeout: (unset, default: {DEFAULT_REQUEST_TIMEOUT_SECS}s)"),
        }
    }
}

/// Handler for the `theme` setting.
pub struct ThemeHandler;

impl SettingHandler for ThemeHandler {
    fn key(&self) -> &'static str {
        "theme"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To set a theme, specify the theme name:",
                example: "nakshatra set theme light",
            });
        }

        let theme = validate_theme(&args.join(" "))?;
        let message = success_set("theme", &theme);
        config.theme = Some(theme);
        Ok(message)
    }

    fn unset(&self, config: &mut Config) -> Result<String, SettingError> {
        config.theme = None;
        Ok(success_unset("theme", "dark"))
    }

    fn format(&self, config: &Config) -> String {
        match &config.theme {
            Some(theme) => format!("  theme: {theme}"),
            None => "  theme: (unset, default: dark)".to_string(),
        }
    }
}

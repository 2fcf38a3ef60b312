use std::time::Duration;

use crate::core::config::data::Config;
use crate::core::constants::{
    BACKEND_URL_ENV, DEFAULT_BACKEND_URL, DEFAULT_LISTEN_ADDRESS, DEFAULT_REQUEST_TIMEOUT_SECS,
};

impl Config {
    /// Backend URL with precedence: explicit override, then the
    /// `NAKSHATRA_BACKEND_URL` environment variable, then the config file,
    /// then the built-in default.
    pub fn resolve_backend_url(&self, explicit: Option<&str>) -> String {
        let env = std::env::var(BACKEND_URL_ENV).ok();
        self.resolve_backend_url_with_env(explicit, env.as_deref())
    }

    pub(crate) fn resolve_backend_url_with_env(
        &self,
        explicit: Option<&str>,
        env: Option<&str>,
    ) -> String {
        [explicit, env, self.backend_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BACKEND_URL)
            .to_string()
    }

    pub fn listen_address(&self) -> &str {
        self.listen
            .as_deref()
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .unwrap_or(DEFAULT_LISTEN_ADDRESS)
    }

    pub fn request_timeout(&self) -> Duration {
        let secs = self
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn markdown_enabled(&self) -> bool {
        self.markdown.unwrap_or(true)
    }

    pub fn syntax_enabled(&self) -> bool {
        self.syntax.unwrap_or(true)
    }

    pub fn typing_animation_enabled(&self) -> bool {
        self.typing_animation.unwrap_or(true)
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the astrology backend, or of a proxy's `/api` prefix
    pub backend_url: Option<String>,
    /// Address `nakshatra serve` binds to (e.g., "127.0.0.1:3000")
    pub listen: Option<String>,
    /// Seconds to wait for a backend reply before showing the fallback bubble
    pub request_timeout_secs: Option<u64>,
    /// UI theme name ("dark", "light", "monochrome")
    pub theme: Option<String>,
    /// Enable markdown rendering of AI replies
    pub markdown: Option<bool>,
    /// Enable syntax highlighting for fenced code blocks when markdown is enabled
    pub syntax: Option<bool>,
    /// Reveal new AI replies with the typing effect
    pub typing_animation: Option<bool>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.config/nakshatra/config.toml` → `~/.config/nakshatra/config.toml`
/// - macOS: `/Users/user/Library/Application Support/...` → `~/Library/Application Support/...`
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

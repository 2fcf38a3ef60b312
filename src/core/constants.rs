//! Shared constants used across the application

/// Store key holding the current session identifier.
pub const SESSION_KEY: &str = "nakshatra_session_id";

/// Prefix for every per-session store key.
pub const SESSION_KEY_PREFIX: &str = "nakshatra:session:";

/// Backend used when neither the environment nor the config names one.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Environment variable that overrides the configured backend URL.
pub const BACKEND_URL_ENV: &str = "NAKSHATRA_BACKEND_URL";

/// Address the proxy binds to when none is configured.
pub const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:3000";

/// Header carrying the session identifier to the backend.
pub const SESSION_HEADER: &str = "X-Session-Id";

/// Fixed delay after which a pending chat request is abandoned.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Bubble shown in place of a reply when the chat request fails or times out.
pub const FALLBACK_CHAT_REPLY: &str = "🚀 All out of free stars! You have asked all the free questions we can handle. But do not worry, just go back and re-enter your details to keep the conversation going 🔮";

/// Bubble shown when the kundli request fails.
pub const KUNDLI_ERROR_REPLY: &str = "⚠️ Error fetching Kundli details. Please try again later.";

/// Bubble shown when the kundli request succeeds with an empty body.
pub const EMPTY_KUNDLI_REPLY: &str = "No response from AI.";

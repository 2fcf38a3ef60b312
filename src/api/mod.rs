//! Wire shapes shared by the backend client and the proxy routes.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatQuery {
    pub query: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatReply {
    #[serde(default)]
    pub response: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorPayload {
    pub error: String,
}

pub mod client;

pub use client::{normalize_kundli_reply, ApiError, AstrologyBackend, BackendClient};

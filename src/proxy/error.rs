use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::ErrorPayload;

/// Failures the proxy reports to its caller. The display text is the
/// `error` field of the JSON body.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Invalid JSON payload")]
    InvalidJson,

    #[error("Query is required and must be a string")]
    MissingQuery,

    #[error("Hi! Our servers are under a maintenance break, please try again shortly")]
    KundliMaintenance,

    #[error("Failed to fetch kundli")]
    KundliUnreachable,

    #[error("Backend error: {0}")]
    ChatBackend(String),

    #[error("Failed to fetch from backend")]
    ChatUnreachable,

    #[error("Backend unreachable")]
    PingFailed,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Not found")]
    NotFound,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidJson | ProxyError::MissingQuery => StatusCode::BAD_REQUEST,
            ProxyError::KundliMaintenance
            | ProxyError::KundliUnreachable
            | ProxyError::ChatBackend(_)
            | ProxyError::ChatUnreachable => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::PingFailed => StatusCode::BAD_GATEWAY,
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let payload = ErrorPayload {
            error: self.to_string(),
        };
        (self.status(), Json(payload)).into_response()
    }
}

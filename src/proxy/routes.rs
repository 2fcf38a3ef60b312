use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{error, info, warn};

use super::error::ProxyError;
use super::ProxyState;
use crate::core::constants::SESSION_HEADER;
use crate::utils::url::construct_api_url;

fn parse_json(body: &Bytes) -> Result<Value, ProxyError> {
    serde_json::from_slice(body).map_err(|_| ProxyError::InvalidJson)
}

fn session_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn forward(
    state: &ProxyState,
    endpoint: &str,
    headers: &HeaderMap,
    payload: &Value,
) -> reqwest::RequestBuilder {
    let url = construct_api_url(&state.backend_url, endpoint);
    let mut request = state.client.post(url).json(payload);
    if let Some(session) = session_header(headers) {
        request = request.header(SESSION_HEADER, session);
    }
    request
}

/// Relay a successful backend body: JSON stays JSON, anything else is text.
fn relay_body(body: String) -> Response {
    match serde_json::from_str::<Value>(&body) {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(_) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response(),
    }
}

pub async fn kundli_handler(
    State(state): State<Arc<ProxyState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let payload = parse_json(&body)?;

    let response = forward(&state, "kundli", &headers, &payload)
        .send()
        .await
        .map_err(|err| {
            error!(error = %err, "Error fetching kundli");
            ProxyError::KundliUnreachable
        })?;

    let status = response.status();
    let text = response.text().await.map_err(|err| {
        error!(error = %err, "Error reading kundli response");
        ProxyError::KundliUnreachable
    })?;

    if !status.is_success() {
        warn!(status = status.as_u16(), body = %text, "Backend returned error for kundli");
        return Err(ProxyError::KundliMaintenance);
    }

    info!("Kundli data received");
    Ok(relay_body(text))
}

pub async fn chat_handler(
    State(state): State<Arc<ProxyState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let payload = parse_json(&body)?;
    match payload.get("query") {
        Some(Value::String(query)) if !query.is_empty() => {
            info!(chars = query.chars().count(), "Forwarding chat query");
        }
        _ => return Err(ProxyError::MissingQuery),
    }

    let response = forward(&state, "chat", &headers, &payload)
        .send()
        .await
        .map_err(|err| {
            error!(error = %err, "Error forwarding to backend");
            ProxyError::ChatUnreachable
        })?;

    let status = response.status();
    let text = response.text().await.map_err(|err| {
        error!(error = %err, "Error reading chat response");
        ProxyError::ChatUnreachable
    })?;

    if !status.is_success() {
        warn!(status = status.as_u16(), body = %text, "Backend returned error for chat");
        return Err(ProxyError::ChatBackend(text));
    }

    Ok(relay_body(text))
}

pub async fn ping_handler(
    State(state): State<Arc<ProxyState>>,
    headers: HeaderMap,
) -> Result<Response, ProxyError> {
    let url = construct_api_url(&state.backend_url, "ping");
    let mut request = state.client.get(url);
    if let Some(session) = session_header(&headers) {
        request = request.header(SESSION_HEADER, session);
    }
    let response = request.send().await.map_err(|err| {
        warn!(error = %err, "Backend ping failed");
        ProxyError::PingFailed
    })?;

    if !response.status().is_success() {
        warn!(status = response.status().as_u16(), "Backend ping returned error");
        return Err(ProxyError::PingFailed);
    }
    let text = response.text().await.map_err(|_| ProxyError::PingFailed)?;
    Ok(relay_body(text))
}

pub async fn method_not_allowed() -> ProxyError {
    ProxyError::MethodNotAllowed
}

pub async fn not_found() -> ProxyError {
    ProxyError::NotFound
}

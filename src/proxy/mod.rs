//! HTTP proxy in front of the astrology backend.
//!
//! Exposes `/api/kundli`, `/api/chat` and `/api/ping`, forwarding to the
//! configured backend and mapping its failures onto small JSON error bodies
//! a browser or the terminal client can show.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, HeaderName, Method},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod error;
pub mod routes;


pub use error::ProxyError;

use routes::{chat_handler, kundli_handler, method_not_allowed, not_found, ping_handler};

pub struct ProxyState {
    pub client: reqwest::Client,
    pub backend_url: String,
}

impl ProxyState {
    pub fn new(backend_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            backend_url: backend_url.into(),
        })
    }
}

pub fn router(state: Arc<ProxyState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-session-id")])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/kundli", post(kundli_handler).fallback(method_not_allowed))
        .route("/api/chat", post(chat_handler).fallback(method_not_allowed))
        .route("/api/ping", get(ping_handler).fallback(method_not_allowed))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until Ctrl+C or SIGTERM.
pub async fn serve(address: &str, state: ProxyState) -> std::io::Result<()> {
    info!("Binding to {address}");
    let listener = TcpListener::bind(address).await?;
    info!(
        "Proxy running on {} (backend: {})",
        listener.local_addr()?,
        state.backend_url
    );
    serve_on(listener, Arc::new(state), shutdown_signal()).await?;
    info!("Proxy shut down");
    Ok(())
}

pub async fn serve_on<F>(
    listener: TcpListener,
    state: Arc<ProxyState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                warn!(error = %err, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                warn!(error = %err, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

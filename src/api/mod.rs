//! HTTP query API and status page

pub mod error;
pub mod handlers;
pub mod view;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

use crate::store::HistoryStore;

pub use error::ApiError;

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<HistoryStore>,
    /// Name reported by `/health` and the status page
    pub service: Arc<str>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<HistoryStore>, service: &str) -> Self {
        Self {
            store,
            service: Arc::from(service),
            started_at: Instant::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(view::status_page))
        .route("/health", get(handlers::health))
        .route(
            "/api/emails",
            get(handlers::list_emails).delete(handlers::clear_emails),
        )
        .route(
            "/api/emails/:id",
            get(handlers::get_email).delete(handlers::delete_email),
        )
        .route("/api/stats", get(handlers::stats))
        .with_state(state)
}

/// Serve the API until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "HTTP server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

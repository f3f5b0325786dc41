use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod dto;
pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/news", get(handlers::list_news))
        .route("/news/search", get(handlers::search_news))
        .route("/news/analyze", post(handlers::analyze_news))
        .route("/news/category/:name", get(handlers::news_by_category))
        .route("/news/:id", get(handlers::get_news))
        .route("/categories", get(handlers::list_categories))
        .route("/check", get(handlers::check_usage).post(handlers::check_title))
        .route("/stats", get(handlers::stats))
        .route("/ingest", post(handlers::trigger_ingest))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Binds `addr` and serves until `shutdown` resolves.
pub async fn serve(
    app: Router,
    addr: &str,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState};
    pub use fnd_core::{Error, Result};
}

#[cfg(test)]
mod tests;

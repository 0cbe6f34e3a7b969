//! HTTP surface for the runkit engine.
//!
//! | Method | Path                | Handler                |
//! |--------|---------------------|------------------------|
//! | GET    | `/health`           | [`routes::health_check`] |
//! | GET    | `/runs`             | [`routes::list_runs`]  |
//! | POST   | `/runs`             | [`routes::create_run`] |
//! | GET    | `/runs/{id}`        | [`routes::get_run`]    |
//! | POST   | `/runs/{id}/cancel` | [`routes::cancel_run`] |
//! | GET    | `/templates`        | [`routes::list_templates`] |
//! | GET    | `/events`           | [`routes::events_stream`] (SSE) |

pub mod error;
pub mod routes;
pub mod state;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use rk_core::Engine;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health_check))
        .route("/runs", get(routes::list_runs).post(routes::create_run))
        .route("/runs/{id}", get(routes::get_run))
        .route("/runs/{id}/cancel", post(routes::cancel_run))
        .route("/templates", get(routes::list_templates))
        .route("/events", get(routes::events_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on `addr` until the process is stopped.
pub async fn serve(addr: SocketAddr, engine: Engine) -> anyhow::Result<()> {
    let app = create_router(AppState::new(engine));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

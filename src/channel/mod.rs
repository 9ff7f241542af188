//! Client-facing command channel
//!
//! This module handles:
//! - Admission of persistent-channel frames into the command queue
//! - The WebSocket endpoint at `/ws`
//! - The stateless HTTP mirror under `/api` and `/ping`

mod admission;
mod http;
mod ws;

pub use admission::CommandChannel;

use crate::command::MirrorHandle;
use crate::session::SessionRegistry;
use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared state for every request handler
#[derive(Clone)]
pub struct AppState {
    pub channel: Arc<CommandChannel>,
    pub sessions: Arc<SessionRegistry>,
    pub mirror: MirrorHandle,
}

impl AppState {
    pub fn new(channel: CommandChannel, sessions: Arc<SessionRegistry>, mirror: MirrorHandle) -> Self {
        Self {
            channel: Arc::new(channel),
            sessions,
            mirror,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/pixelCount", get(http::pixel_count))
        .route("/ping", get(http::ping).post(http::ping))
        .route("/api/setColor", post(http::set_color))
        .route("/api/clear", get(http::clear).post(http::clear))
        .route("/api/setBrightness", post(http::set_brightness))
        .route("/api/show", post(http::show))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve both transports until the listener fails
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

//! WebSocket endpoint using Axum.
//!
//! Exposes a single route, `/ws`, and runs one [`Session`] per upgraded
//! connection against the shared note service.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};

use crate::session::{Session, SessionOptions, SharedService, Transport, TransportClosed};

/// Shared server state
#[derive(Clone)]
struct AppState {
    service: SharedService,
    options: SessionOptions,
    connections: Arc<AtomicUsize>,
}

impl Transport for WebSocket {
    async fn recv(&mut self) -> Option<String> {
        loop {
            match WebSocket::recv(self).await? {
                Ok(Message::Text(text)) => return Some(text),
                Ok(Message::Close(_)) => return None,
                // Ping/pong is answered by the transport, binary frames are not part of the protocol
                Ok(_) => continue,
                Err(err) => {
                    tracing::debug!(error = %err, "WebSocket receive failed");
                    return None;
                }
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), TransportClosed> {
        WebSocket::send(self, Message::Text(text))
            .await
            .map_err(|_| TransportClosed)
    }
}

/// Builds the router serving the note channel.
pub fn create_router(service: SharedService, options: SessionOptions) -> Router {
    let state = AppState {
        service,
        options,
        connections: Arc::new(AtomicUsize::new(0)),
    };

    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let count = state.connections.fetch_add(1, Ordering::Relaxed) + 1;
    tracing::info!(active = count, "WebSocket connection opened");

    Session::new(socket, state.service.clone(), state.options)
        .run()
        .await;

    let count = state.connections.fetch_sub(1, Ordering::Relaxed) - 1;
    tracing::info!(active = count, "WebSocket connection closed");
}

/// Serves the note channel on `addr` until Ctrl-C.
pub async fn serve(addr: SocketAddr, service: SharedService, options: SessionOptions) -> Result<()> {
    let router = create_router(service, options);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Serving note channel on ws://{}/ws", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

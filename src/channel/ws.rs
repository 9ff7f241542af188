//! Persistent WebSocket channel

use super::AppState;
use crate::session::Session;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use pixel_commander_shared::codec;
use std::net::SocketAddr;
use tracing::{debug, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

/// Run one connection: admission on the read side, replies and acks on the
/// write side
async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: AppState) {
    let Session {
        handle,
        mut outbound_rx,
    } = state.sessions.open(Some(addr)).await;
    let id = handle.id;
    info!("WebSocket client {} connected from {}", id, addr);

    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(reply) = outbound_rx.recv().await {
            let text = match codec::encode_reply(&reply) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode reply for client {}: {}", id, e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    loop {
        let frame = tokio::select! {
            frame = stream.next() => frame,
            _ = handle.closed() => {
                debug!("Session {} closed while connected", id);
                break;
            }
        };
        match frame {
            Some(Ok(Message::Text(text))) => {
                if let Some(reply) = state.channel.admit(&text, id) {
                    if let Err(e) = handle.send(reply).await {
                        debug!("Reply to client {} not sent: {}", id, e);
                        break;
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => break,
            // Binary frames are not part of the protocol; ping/pong is
            // handled by the websocket layer
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                debug!("Read error from client {}: {}", id, e);
                break;
            }
        }
    }

    state.sessions.close(id).await;
    writer.abort();
    info!(
        "WebSocket client {} disconnected after {:?}",
        id,
        handle.connected_at.elapsed()
    );
}

//! WebSocket endpoint for the live price feed.
//!
//! Each accepted socket is registered with the [`Broadcaster`]; a writer
//! task drains the client's channel into the socket while the read loop
//! handles `subscribe` requests. Malformed frames are logged and dropped,
//! the connection stays open.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};

use crate::feed::broadcaster::Broadcaster;
use crate::protocol::{ClientMessage, ServerMessage};

pub fn router(broadcaster: Arc<Broadcaster>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(broadcaster)
}

pub async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    let addr = format!("{host}:{port}");
    TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))
}

/// Serve until the shutdown signal flips.
pub async fn serve(
    listener: TcpListener,
    broadcaster: Arc<Broadcaster>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "WebSocket server listening");
    axum::serve(listener, router(broadcaster))
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
        .context("websocket server failed")?;
    Ok(())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(broadcaster): State<Arc<Broadcaster>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster))
}

async fn handle_socket(socket: WebSocket, broadcaster: Arc<Broadcaster>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let reply_tx = tx.clone();
    let client_id = match broadcaster.register(tx) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register client");
            return;
        }
    };

    let (mut ws_sink, mut ws_stream) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode outbound message");
                    continue;
                }
            };
            if ws_sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = ws_stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                handle_client_frame(client_id, text.as_str(), &broadcaster, &reply_tx)
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::info!(client_id, error = %e, "Client connection closed");
                break;
            }
        }
    }

    if let Err(e) = broadcaster.unregister(client_id) {
        tracing::error!(client_id, error = %e, "Failed to unregister client");
    }
    writer.abort();
}

fn handle_client_frame(
    client_id: u64,
    text: &str,
    broadcaster: &Broadcaster,
    reply_tx: &mpsc::UnboundedSender<ServerMessage>,
) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(client_id, error = %e, "Malformed client message, dropping");
            return;
        }
    };
    match msg {
        ClientMessage::Subscribe { ticker } => match broadcaster.subscribe(&ticker) {
            Ok(Some(reply)) => {
                // Receiver gone means the writer is tearing down; the read
                // loop will observe the close shortly.
                let _ = reply_tx.send(reply);
            }
            Ok(None) => {
                tracing::debug!(client_id, %ticker, "Subscribe request for unknown ticker");
            }
            Err(e) => {
                tracing::error!(client_id, error = %e, "Subscribe lookup failed");
            }
        },
    }
}

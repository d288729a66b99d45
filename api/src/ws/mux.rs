//! Per-connection serve loop: one writer task drains the outbound queue, the read
//! loop dispatches each text frame in order.

use axum::{
    body::Bytes,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::{sync::mpsc, time};
use util::config;

use super::router;
use crate::state::ApiState;

/// Transport settings for one connection.
#[derive(Debug, Clone, Copy)]
pub struct WsServerOptions {
    pub ping_every: Duration,
    pub outbound_buffer: usize,
}

impl WsServerOptions {
    pub fn from_config() -> Self {
        Self {
            ping_every: config::ws_ping_interval(),
            outbound_buffer: config::ws_outbound_buffer(),
        }
    }
}

pub async fn ws_entry(ws: WebSocketUpgrade, State(state): State<ApiState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve(socket, state, WsServerOptions::from_config()))
}

pub async fn serve(socket: WebSocket, state: ApiState, opts: WsServerOptions) {
    let (mut sink, mut rx) = socket.split();

    let (out_tx, mut out_rx) = mpsc::channel::<String>(opts.outbound_buffer.max(1));
    let conn = state.sockets().connect(out_tx).await;
    let socket_id = conn.id();
    tracing::info!(socket_id, "connection opened");

    // Outbound frames and WS-level keepalive pings share the sink.
    let writer = tokio::spawn(async move {
        let mut ping = time::interval(opts.ping_every.max(Duration::from_secs(1)));
        ping.tick().await;
        loop {
            let frame = tokio::select! {
                next = out_rx.recv() => match next {
                    Some(text) => Message::Text(text.into()),
                    None => break,
                },
                _ = ping.tick() => Message::Ping(Bytes::new()),
            };
            if sink.send(frame).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = rx.next().await {
        match frame {
            Message::Text(text) => router::dispatch(&state, &conn, text.as_str()).await,
            Message::Close(_) => break,
            // Pongs to client pings are queued by the protocol layer itself.
            _ => {}
        }
    }

    state.sockets().disconnect(socket_id).await;
    drop(conn);
    writer.abort();
    tracing::info!(socket_id, "connection closed");
}

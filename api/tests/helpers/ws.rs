use axum::Router;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Spawns the Axum app on a random local port
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

pub async fn connect_ws(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    ws
}

pub async fn send(ws: &mut WsClient, method: &str, params: Value) {
    let frame = serde_json::json!({ "method": method, "params": params });
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

/// Next text frame as JSON, skipping control frames.
pub async fn recv_frame(ws: &mut WsClient) -> Value {
    loop {
        let msg = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Next frame carrying `method`; anything else on the way is skipped.
pub async fn recv_method(ws: &mut WsClient, method: &str) -> Value {
    loop {
        let frame = recv_frame(ws).await;
        if frame["method"] == method {
            return frame;
        }
    }
}

/// Send a request and wait for the frame answering it.
pub async fn call(ws: &mut WsClient, method: &str, params: Value) -> Value {
    send(ws, method, params).await;
    recv_method(ws, method).await
}

/// No frame with `method` arrives within `ms`.
pub async fn assert_silent(ws: &mut WsClient, method: &str, ms: u64) {
    let waited = timeout(Duration::from_millis(ms), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let frame: Value = serde_json::from_str(text.as_str()).unwrap();
                    if frame["method"] == method {
                        return frame;
                    }
                }
                Some(_) => {}
                None => std::future::pending::<()>().await,
            }
        }
    })
    .await;
    assert!(waited.is_err(), "unexpected {method} frame: {waited:?}");
}

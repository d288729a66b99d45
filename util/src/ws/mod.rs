pub mod manager;
pub mod socket;

pub use manager::{PoolError, SocketPool};
pub use socket::{Socket, SocketClosed, SocketId};

use serde::Serialize;

/// Standard frame sent to a connection, both as a reply and as a server push.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T> {
    pub error: Option<&'a str>,
    pub method: Option<&'a str>,
    pub params: Option<T>,
}

impl<'a, T: Serialize> Envelope<'a, T> {
    pub fn ok(method: &'a str, params: T) -> Self {
        Self {
            error: None,
            method: Some(method),
            params: Some(params),
        }
    }

    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize frame");
                None
            }
        }
    }
}

impl<'a> Envelope<'a, ()> {
    pub fn error(method: Option<&'a str>, code: &'a str) -> Self {
        Self {
            error: Some(code),
            method,
            params: None,
        }
    }
}

/// Push a JSON-serialized [`Envelope`] for `method` to every member of `room`.
///
/// Returns the number of connections the frame was queued on.
pub async fn emit<T: Serialize>(pool: &SocketPool, room: &str, method: &str, payload: &T) -> usize {
    match Envelope::ok(method, payload).to_json() {
        Some(json) => pool.emit_room(room, &json).await,
        None => 0,
    }
}

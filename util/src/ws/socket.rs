//! A live connection handle with an outbound queue and per-connection scoped storage.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;

/// Identifier assigned by the [`SocketPool`](super::SocketPool) on connect.
pub type SocketId = u64;

type DataMap = HashMap<String, Arc<dyn Any + Send + Sync>>;

/// The outbound queue of the connection was closed (the writer task ended).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("socket {0} is closed")]
pub struct SocketClosed(pub SocketId);

/// Cheaply cloneable handle to one live connection.
///
/// Frames pushed through [`Socket::send`] are drained by the transport's writer task.
#[derive(Clone)]
pub struct Socket {
    id: SocketId,
    out_tx: mpsc::Sender<String>,
    data: Arc<RwLock<DataMap>>,
}

impl Socket {
    pub fn new(id: SocketId, out_tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            out_tx,
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn id(&self) -> SocketId {
        self.id
    }

    /// Queue a text frame for this connection only, waiting for buffer space.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), SocketClosed> {
        self.out_tx
            .send(text.into())
            .await
            .map_err(|_| SocketClosed(self.id))
    }

    /// Queue a text frame without waiting. Returns `false` if the buffer is full or closed.
    pub fn try_send(&self, text: String) -> bool {
        match self.out_tx.try_send(text) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(socket_id = self.id, "outbound buffer full; dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.out_tx.is_closed()
    }

    // -------------------- Scoped storage --------------------

    /// Store `value` under `key`, replacing any previous value.
    pub fn set_data<T: Any + Send + Sync>(&self, key: &str, value: T) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.insert(key.to_string(), Arc::new(value));
    }

    /// Fetch a clone of the value stored under `key`.
    ///
    /// Returns `None` if the key is absent or holds a value of another type.
    pub fn get_data<T: Any + Clone + Send + Sync>(&self, key: &str) -> Option<T> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        data.get(key)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    pub fn has_data(&self, key: &str) -> bool {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        data.contains_key(key)
    }

    pub fn delete_data(&self, key: &str) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.remove(key);
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Marker(i64);

    #[test]
    fn scoped_data_is_typed() {
        let (tx, _rx) = mpsc::channel(1);
        let s = Socket::new(1, tx);

        s.set_data("ticket", 42_i64);
        s.set_data("marker", Marker(7));

        assert_eq!(s.get_data::<i64>("ticket"), Some(42));
        assert_eq!(s.get_data::<Marker>("marker"), Some(Marker(7)));
        // wrong type reads as absent
        assert_eq!(s.get_data::<String>("ticket"), None);

        s.delete_data("ticket");
        assert!(!s.has_data("ticket"));
        assert!(s.has_data("marker"));
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        let s = Socket::new(9, tx);
        drop(rx);
        assert_eq!(s.send("x").await, Err(SocketClosed(9)));
        assert!(s.is_closed());
    }
}

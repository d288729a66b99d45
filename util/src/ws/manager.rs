//! A thread-safe registry of live connections and the named rooms they belong to.
//!
//! Rooms are broadcast groups over sockets. Persistent rooms outlive their members;
//! other rooms are dropped as soon as the last member leaves. Emitting to a room that
//! does not exist is a silent no-op, since teardown can race with in-flight notifications.

use super::socket::{Socket, SocketId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, mpsc};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("room '{0}' already exists")]
    RoomAlreadyExists(String),
    #[error("room '{0}' not found")]
    RoomNotFound(String),
    #[error("socket {0} not found")]
    SocketNotFound(SocketId),
}

#[derive(Debug, Default)]
struct Room {
    persistent: bool,
    members: HashSet<SocketId>,
}

#[derive(Default)]
struct Registry {
    sockets: HashMap<SocketId, Socket>,
    rooms: HashMap<String, Room>,
}

impl Registry {
    fn drop_if_abandoned(&mut self, name: &str) {
        let abandoned = self
            .rooms
            .get(name)
            .is_some_and(|r| !r.persistent && r.members.is_empty());
        if abandoned {
            tracing::debug!(room = name, "dropping empty room");
            self.rooms.remove(name);
        }
    }
}

/// Shared handle; clones see the same registry.
#[derive(Clone, Default)]
pub struct SocketPool {
    inner: Arc<RwLock<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl SocketPool {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------- Connections --------------------

    /// Register a new connection whose outbound frames go to `out_tx`.
    pub async fn connect(&self, out_tx: mpsc::Sender<String>) -> Socket {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let socket = Socket::new(id, out_tx);
        self.inner.write().await.sockets.insert(id, socket.clone());
        socket
    }

    /// Forget a connection and remove it from every room it occupied.
    pub async fn disconnect(&self, id: SocketId) {
        let mut reg = self.inner.write().await;
        reg.sockets.remove(&id);

        let joined: Vec<String> = reg
            .rooms
            .iter_mut()
            .filter_map(|(name, room)| room.members.remove(&id).then(|| name.clone()))
            .collect();
        for name in joined {
            reg.drop_if_abandoned(&name);
        }
    }

    pub async fn get(&self, id: SocketId) -> Option<Socket> {
        self.inner.read().await.sockets.get(&id).cloned()
    }

    pub async fn socket_count(&self) -> usize {
        self.inner.read().await.sockets.len()
    }

    // -------------------- Rooms --------------------

    pub async fn create_room(&self, name: &str, persistent: bool) -> Result<(), PoolError> {
        let mut reg = self.inner.write().await;
        if reg.rooms.contains_key(name) {
            return Err(PoolError::RoomAlreadyExists(name.to_string()));
        }
        reg.rooms.insert(
            name.to_string(),
            Room {
                persistent,
                members: HashSet::new(),
            },
        );
        Ok(())
    }

    /// Create `name` unless it already exists. Returns `true` if it was created.
    pub async fn ensure_room(&self, name: &str, persistent: bool) -> bool {
        self.create_room(name, persistent).await.is_ok()
    }

    pub async fn room_exists(&self, name: &str) -> bool {
        self.inner.read().await.rooms.contains_key(name)
    }

    /// Remove `name` and all of its memberships. Returns `false` if there was no such room.
    pub async fn delete_room(&self, name: &str) -> bool {
        self.inner.write().await.rooms.remove(name).is_some()
    }

    pub async fn join_room(&self, id: SocketId, name: &str) -> Result<(), PoolError> {
        let mut reg = self.inner.write().await;
        if !reg.sockets.contains_key(&id) {
            return Err(PoolError::SocketNotFound(id));
        }
        let room = reg
            .rooms
            .get_mut(name)
            .ok_or_else(|| PoolError::RoomNotFound(name.to_string()))?;
        room.members.insert(id);
        Ok(())
    }

    /// Create the room if needed and join it, under a single write lock.
    pub async fn join_or_create_room(
        &self,
        id: SocketId,
        name: &str,
        persistent: bool,
    ) -> Result<(), PoolError> {
        let mut reg = self.inner.write().await;
        if !reg.sockets.contains_key(&id) {
            return Err(PoolError::SocketNotFound(id));
        }
        reg.rooms
            .entry(name.to_string())
            .or_insert_with(|| Room {
                persistent,
                members: HashSet::new(),
            })
            .members
            .insert(id);
        Ok(())
    }

    /// Leave `name`. Leaving a room one is not in (or that does not exist) is a no-op.
    pub async fn leave_room(&self, id: SocketId, name: &str) {
        let mut reg = self.inner.write().await;
        let left = reg
            .rooms
            .get_mut(name)
            .is_some_and(|room| room.members.remove(&id));
        if left {
            reg.drop_if_abandoned(name);
        }
    }

    pub async fn is_member(&self, id: SocketId, name: &str) -> bool {
        self.inner
            .read()
            .await
            .rooms
            .get(name)
            .is_some_and(|r| r.members.contains(&id))
    }

    pub async fn room_size(&self, name: &str) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(name)
            .map_or(0, |r| r.members.len())
    }

    /// Queue `text` on every member of `name` and return how many accepted it.
    ///
    /// A missing room delivers to nobody. Members whose buffer is full miss this frame.
    pub async fn emit_room(&self, name: &str, text: &str) -> usize {
        let targets: Vec<Socket> = {
            let reg = self.inner.read().await;
            match reg.rooms.get(name) {
                Some(room) => room
                    .members
                    .iter()
                    .filter_map(|id| reg.sockets.get(id).cloned())
                    .collect(),
                None => return 0,
            }
        };

        targets
            .iter()
            .filter(|s| s.try_send(text.to_string()))
            .count()
    }
}

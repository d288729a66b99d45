//! Shared infrastructure handed to every service and connection handler.
//!
//! Holds the database connection and the socket pool. Both are cheap to clone.

use crate::ws::SocketPool;
use sea_orm::DatabaseConnection;

#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    sockets: SocketPool,
}

impl AppState {
    pub fn new(db: DatabaseConnection, sockets: SocketPool) -> Self {
        Self { db, sockets }
    }

    /// Returns a shared reference to the internal `DatabaseConnection`.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn sockets(&self) -> &SocketPool {
        &self.sockets
    }
}

//! Everything a connection handler needs, assembled once at startup.

use sea_orm::DatabaseConnection;
use services::events::{MessageEventBus, TicketEventBus};
use services::{MessageService, SessionService, TicketService};
use std::sync::Arc;
use std::time::Duration;
use util::config;
use util::pool::WorkerPool;
use util::state::AppState;
use util::ws::SocketPool;

use crate::ws::session;
use crate::ws::tickets::notify;

/// Knobs that are read from the global config in production and pinned in tests.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub jwt_secret: String,
    pub session_lifetime: Duration,
    pub token_lifetime: Duration,
    pub query_timeout: Duration,
    pub event_pool_size: usize,
    pub event_schedule_timeout: Duration,
}

impl ApiSettings {
    pub fn from_config() -> Self {
        Self {
            jwt_secret: config::jwt_secret(),
            session_lifetime: config::session_lifetime(),
            token_lifetime: config::token_lifetime(),
            query_timeout: config::query_timeout(),
            event_pool_size: config::event_pool_size(),
            event_schedule_timeout: config::event_schedule_timeout(),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    app: AppState,
    pub tickets: TicketService,
    pub messages: MessageService,
    pub sessions: SessionService,
}

impl ApiState {
    /// Build the services, create the static rooms and hook room notifications
    /// onto the event buses.
    pub async fn build(db: DatabaseConnection, settings: &ApiSettings) -> Self {
        let sockets = SocketPool::new();
        for room in [session::AUTH_ROOM, session::AGENTS_ROOM] {
            sockets.ensure_room(room, true).await;
        }

        let workers = WorkerPool::new(settings.event_pool_size, settings.event_schedule_timeout);
        let ticket_bus = Arc::new(TicketEventBus::new(workers.clone()));
        let message_bus = Arc::new(MessageEventBus::new(workers));
        notify::subscribe(&sockets, &ticket_bus, &message_bus);

        Self {
            tickets: TicketService::new(db.clone(), ticket_bus, settings.query_timeout),
            messages: MessageService::new(db.clone(), message_bus, settings.query_timeout),
            sessions: SessionService::new(
                db.clone(),
                settings.session_lifetime,
                settings.token_lifetime,
                &settings.jwt_secret,
            ),
            app: AppState::new(db, sockets),
        }
    }

    pub fn app(&self) -> &AppState {
        &self.app
    }

    pub fn sockets(&self) -> &SocketPool {
        self.app.sockets()
    }
}

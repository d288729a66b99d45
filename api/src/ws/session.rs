//! Binding a login session to a connection, and the role gate in front of ticket methods.

use db::models::user::Role;
use serde_json::Value;
use services::access::Operation;
use services::{ServiceError, Session, SessionService};
use util::ws::Socket;

use super::error::HandlerError;
use super::types::{AuthenticateReq, AuthenticateRes};
use crate::state::ApiState;

/// Every authenticated connection.
pub const AUTH_ROOM: &str = "auth";
/// Authenticated agents; receives queue refreshes.
pub const AGENTS_ROOM: &str = "agents";

const SESSION_KEY: &str = "sess";

/// `user/authenticate`: trade a short-lived token for a bound session.
pub async fn authenticate(
    state: &ApiState,
    conn: &Socket,
    params: Value,
) -> Result<AuthenticateRes, HandlerError> {
    if conn.has_data(SESSION_KEY) {
        return Err(ServiceError::AlreadyAuthenticated.into());
    }
    let req: AuthenticateReq = serde_json::from_value(params)?;

    let session = state.sessions.validate_token(&req.token).await?;
    conn.set_data(SESSION_KEY, session.clone());

    let sockets = state.sockets();
    sockets.join_or_create_room(conn.id(), AUTH_ROOM, true).await?;
    if session.role == Role::Agent {
        sockets.join_or_create_room(conn.id(), AGENTS_ROOM, true).await?;
    }

    tracing::info!(socket_id = conn.id(), user_id = session.user_id, role = %session.role, "connection authenticated");
    Ok(AuthenticateRes {
        user_id: session.user_id,
        role: session.role,
    })
}

/// Load the bound session and check that its role may perform `op`.
///
/// An expired session is unbound before reporting `session_expired`.
pub async fn require(
    state: &ApiState,
    conn: &Socket,
    op: Operation,
) -> Result<Session, HandlerError> {
    let session: Session = conn
        .get_data(SESSION_KEY)
        .ok_or(ServiceError::NotAuthenticated)?;

    if SessionService::is_expired(&session) {
        unbind(state, conn).await;
        return Err(ServiceError::SessionExpired.into());
    }
    if !op.permits(session.role) {
        return Err(ServiceError::InsufficientPermissions.into());
    }
    Ok(session)
}

async fn unbind(state: &ApiState, conn: &Socket) {
    conn.delete_data(SESSION_KEY);
    let sockets = state.sockets();
    sockets.leave_room(conn.id(), AUTH_ROOM).await;
    sockets.leave_room(conn.id(), AGENTS_ROOM).await;
    tracing::debug!(socket_id = conn.id(), "expired session unbound");
}

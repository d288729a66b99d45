//! Role-gated ticket methods. The caller's session has already been checked against
//! the operation's allowed roles.

use db::models::user::Role;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use services::{ServiceError, Session};
use services::access::Operation;
use services::validate::{CreateTicketReq, SendMessageReq, TicketReq};
use util::ws::Socket;
use validator::Validate;

use super::rooms;
use crate::state::ApiState;
use crate::ws::error::HandlerError;
use crate::ws::types::{NewTicketRes, TicketListRes};

/// Decode and validate request params; nothing reaches a service unchecked.
fn params<T: DeserializeOwned + Validate>(raw: Value) -> Result<T, HandlerError> {
    let req: T = serde_json::from_value(raw)?;
    req.validate().map_err(ServiceError::from)?;
    Ok(req)
}

fn reply<T: Serialize>(res: T) -> Result<Value, HandlerError> {
    Ok(serde_json::to_value(res)?)
}

pub async fn handle(
    state: &ApiState,
    conn: &Socket,
    session: &Session,
    op: Operation,
    raw: Value,
) -> Result<Value, HandlerError> {
    match op {
        Operation::CreateTicket => {
            let req: CreateTicketReq = params(raw)?;
            let ticket_id = state.tickets.create(session.user_id, &req.message).await?;
            reply(NewTicketRes { ticket_id })
        }
        Operation::AcceptTicket => {
            let req: TicketReq = params(raw)?;
            state.tickets.accept(session.user_id, req.ticket_id).await?;
            Ok(Value::Null)
        }
        Operation::EndTicket => {
            let req: TicketReq = params(raw)?;
            state
                .tickets
                .end(session.user_id, session.role, req.ticket_id)
                .await?;
            Ok(Value::Null)
        }
        Operation::SendMessage => {
            let req: SendMessageReq = params(raw)?;
            state
                .messages
                .send(session.user_id, session.role, req.ticket_id, &req.message)
                .await?;
            Ok(Value::Null)
        }
        Operation::ViewTicket => {
            let req: TicketReq = params(raw)?;
            let details = state
                .tickets
                .get_messages(session.user_id, session.role, req.ticket_id)
                .await?;
            rooms::create_or_rejoin(state.sockets(), conn, req.ticket_id).await?;
            reply(details)
        }
        Operation::LeaveTicket => {
            // Clients step out; an agent leaving closes the conversation room.
            let left = match session.role {
                Role::Agent => rooms::close_current(state.sockets(), conn).await,
                _ => rooms::leave_current(state.sockets(), conn).await,
            };
            tracing::debug!(socket_id = conn.id(), ticket_id = ?left, "left ticket room");
            Ok(Value::Null)
        }
        Operation::ListTickets => {
            let tickets = state.tickets.get_tickets(session.user_id, session.role).await?;
            reply(TicketListRes { tickets })
        }
    }
}

//! Method table: parse a frame, gate it, run it, answer with an envelope.

use serde::Serialize;
use serde_json::Value;
use services::access::Operation;
use util::ws::{Envelope, Socket};

use super::error::HandlerError;
use super::session;
use super::tickets::handlers;
use super::types::Request;
use crate::state::ApiState;

/// Methods that need an authenticated session, and the operation they perform.
const GATED: &[(&str, Operation)] = &[
    ("ticket/new", Operation::CreateTicket),
    ("ticket/accept", Operation::AcceptTicket),
    ("ticket/end", Operation::EndTicket),
    ("ticket/message/new", Operation::SendMessage),
    ("ticket/join", Operation::ViewTicket),
    ("ticket/leave", Operation::LeaveTicket),
    ("ticket/list", Operation::ListTickets),
];

pub fn gated_operation(method: &str) -> Option<Operation> {
    GATED
        .iter()
        .find(|(name, _)| *name == method)
        .map(|(_, op)| *op)
}

pub async fn dispatch(state: &ApiState, conn: &Socket, raw: &str) {
    let req: Request = match serde_json::from_str(raw) {
        Ok(req) => req,
        Err(err) => {
            tracing::debug!(socket_id = conn.id(), error = %err, "unparseable frame");
            send(conn, &Envelope::error(None, "bad_request")).await;
            return;
        }
    };

    let method = req.method.as_str();
    match route(state, conn, method, req.params).await {
        Ok(params) => send(conn, &Envelope::ok(method, params)).await,
        Err(err) => {
            if err.is_infrastructure() {
                tracing::error!(socket_id = conn.id(), method, error = %err, "request failed");
            } else {
                tracing::debug!(socket_id = conn.id(), method, code = err.code(), "request rejected");
            }
            send(conn, &Envelope::error(Some(method), err.code())).await;
        }
    }
}

async fn route(
    state: &ApiState,
    conn: &Socket,
    method: &str,
    params: Value,
) -> Result<Value, HandlerError> {
    match method {
        "ping" => Ok(Value::from("pong")),
        "user/authenticate" => {
            let res = session::authenticate(state, conn, params).await?;
            Ok(serde_json::to_value(res)?)
        }
        _ => {
            let op = gated_operation(method).ok_or(HandlerError::MethodNotFound)?;
            let sess = session::require(state, conn, op).await?;
            handlers::handle(state, conn, &sess, op, params).await
        }
    }
}

async fn send<T: Serialize>(conn: &Socket, frame: &Envelope<'_, T>) {
    let Some(json) = frame.to_json() else { return };
    if conn.send(json).await.is_err() {
        tracing::debug!(socket_id = conn.id(), "reply dropped, connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operation_is_reachable() {
        assert_eq!(gated_operation("ticket/new"), Some(Operation::CreateTicket));
        assert_eq!(gated_operation("ticket/leave"), Some(Operation::LeaveTicket));
        assert_eq!(gated_operation("user/authenticate"), None);
        assert_eq!(gated_operation("ticket/delete"), None);

        let mut ops: Vec<_> = GATED.iter().map(|(_, op)| format!("{op:?}")).collect();
        ops.sort();
        ops.dedup();
        assert_eq!(ops.len(), GATED.len());
    }
}

//! Ticket lifecycle: create, accept, end and read.
//!
//! Every mutation runs in one transaction that reads the ticket with an exclusive
//! lock before deciding, writes through a guarded update, and commits. Events are
//! published only after the commit succeeded.

use crate::access::Operation;
use crate::error::ServiceError;
use crate::events::{TicketChanged, TicketEvent, TicketEventBus};
use crate::timed;
use crate::validate::{CreateTicketReq, TicketReq, escape_html};
use chrono::Utc;
use db::models::ticket_messages::{self, MessageView};
use db::models::tickets::{self, TicketMeta, TicketStatus, TicketSummary};
use db::models::user::Role;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketInfo {
    pub id: i64,
    pub status: TicketStatus,
    #[serde(rename = "agentID")]
    pub agent_id: Option<i64>,
}

/// A ticket with its full conversation, as shown when a participant opens it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketDetails {
    pub ticket: TicketInfo,
    pub messages: Vec<MessageView>,
}

#[derive(Clone)]
pub struct TicketService {
    db: DatabaseConnection,
    bus: Arc<TicketEventBus>,
    query_timeout: Duration,
}

impl TicketService {
    pub fn new(db: DatabaseConnection, bus: Arc<TicketEventBus>, query_timeout: Duration) -> Self {
        Self {
            db,
            bus,
            query_timeout,
        }
    }

    /// Open a ticket for `client_id` with `message` as its first message.
    pub async fn create(&self, client_id: i64, message: &str) -> Result<i64, ServiceError> {
        let req = CreateTicketReq {
            message: message.to_owned(),
        };
        req.validate()?;
        let content = escape_html(&req.message);

        let ticket_id = timed(self.query_timeout, async {
            let txn = self.db.begin().await?;

            if let Some(active) = tickets::Model::find_last_active_id(&txn, client_id, true).await? {
                tracing::debug!(client_id, active, "client already has an active ticket");
                return Err(ServiceError::TicketStillActive);
            }

            let now = Utc::now();
            let ticket = tickets::Model::insert(&txn, client_id, now).await?;
            ticket_messages::Model::insert(&txn, ticket.id, client_id, &content, now).await?;

            txn.commit().await?;
            Ok(ticket.id)
        })
        .await?;

        tracing::info!(ticket_id, client_id, "ticket created");
        self.publish(
            TicketEvent::NewTicket,
            TicketChanged {
                ticket_id,
                client_id,
                agent_id: None,
            },
        )
        .await;

        Ok(ticket_id)
    }

    pub async fn accept(&self, agent_id: i64, ticket_id: i64) -> Result<(), ServiceError> {
        TicketReq { ticket_id }.validate()?;
        let meta = timed(self.query_timeout, async {
            let txn = self.db.begin().await?;

            let meta = locked_meta(&txn, ticket_id).await?;
            match meta.status() {
                TicketStatus::Ended => return Err(ServiceError::TicketAlreadyEnded),
                TicketStatus::Accepted => return Err(ServiceError::TicketAlreadyAccepted),
                TicketStatus::Created => {}
            }

            if !tickets::Model::set_agent(&txn, ticket_id, agent_id).await? {
                return Err(lost_race(&txn, ticket_id).await);
            }

            txn.commit().await?;
            Ok(meta)
        })
        .await?;

        tracing::info!(ticket_id, agent_id, "ticket accepted");
        self.publish(
            TicketEvent::AcceptedTicket,
            TicketChanged {
                ticket_id,
                client_id: meta.client_id,
                agent_id: Some(agent_id),
            },
        )
        .await;

        Ok(())
    }

    /// End a ticket as its client or its agent.
    ///
    /// An agent ending a ticket that nobody accepted becomes its agent in the same step.
    pub async fn end(&self, user_id: i64, role: Role, ticket_id: i64) -> Result<(), ServiceError> {
        Operation::EndTicket.check(role)?;
        TicketReq { ticket_id }.validate()?;

        let changed = timed(self.query_timeout, async {
            let txn = self.db.begin().await?;

            let meta = locked_meta(&txn, ticket_id).await?;
            ensure_participant(&meta, user_id, role)?;

            let now = Utc::now();
            let (applied, agent_id) = match (meta.status(), role) {
                (TicketStatus::Ended, _) => return Err(ServiceError::TicketAlreadyEnded),
                (TicketStatus::Created, Role::Agent) => (
                    tickets::Model::set_agent_and_ended(&txn, ticket_id, user_id, now).await?,
                    Some(user_id),
                ),
                _ => (
                    tickets::Model::set_ended(&txn, ticket_id, now).await?,
                    meta.agent_id,
                ),
            };
            if !applied {
                return Err(lost_race(&txn, ticket_id).await);
            }

            txn.commit().await?;
            Ok(TicketChanged {
                ticket_id,
                client_id: meta.client_id,
                agent_id,
            })
        })
        .await?;

        tracing::info!(ticket_id, user_id, %role, "ticket ended");
        self.publish(TicketEvent::EndedTicket, changed).await;

        Ok(())
    }

    /// Ticket status and conversation. Clients may only read their own tickets.
    pub async fn get_messages(
        &self,
        user_id: i64,
        role: Role,
        ticket_id: i64,
    ) -> Result<TicketDetails, ServiceError> {
        Operation::ViewTicket.check(role)?;
        TicketReq { ticket_id }.validate()?;

        timed(self.query_timeout, async {
            let meta = tickets::Model::find_meta(&self.db, ticket_id, false)
                .await?
                .ok_or(ServiceError::TicketNotFound)?;
            if role == Role::Client && meta.client_id != user_id {
                return Err(ServiceError::TicketNotOwned);
            }

            let messages = ticket_messages::Model::find_for_ticket(&self.db, ticket_id).await?;
            Ok(TicketDetails {
                ticket: TicketInfo {
                    id: ticket_id,
                    status: meta.status(),
                    agent_id: meta.agent_id,
                },
                messages,
            })
        })
        .await
    }

    /// Agents see every ticket; clients only their own.
    pub async fn get_tickets(
        &self,
        user_id: i64,
        role: Role,
    ) -> Result<Vec<TicketSummary>, ServiceError> {
        Operation::ListTickets.check(role)?;

        let only_client = (role == Role::Client).then_some(user_id);
        timed(self.query_timeout, async {
            Ok(tickets::Model::find_summaries(&self.db, only_client).await?)
        })
        .await
    }

    async fn publish(&self, event: TicketEvent, payload: TicketChanged) {
        let done = self.bus.publish(event, payload).await;
        tracing::debug!(?event, handlers = done, "ticket event delivered");
    }
}

pub(crate) async fn locked_meta<C>(db: &C, ticket_id: i64) -> Result<TicketMeta, ServiceError>
where
    C: ConnectionTrait,
{
    tickets::Model::find_meta(db, ticket_id, true)
        .await?
        .ok_or(ServiceError::TicketNotFound)
}

/// Clients must own the ticket; agents must be its agent once one is assigned.
pub(crate) fn ensure_participant(
    meta: &TicketMeta,
    user_id: i64,
    role: Role,
) -> Result<(), ServiceError> {
    let owned = match role {
        Role::Client => meta.client_id == user_id,
        Role::Agent => meta.agent_id.is_none_or(|a| a == user_id),
        Role::Admin => false,
    };
    if owned {
        Ok(())
    } else {
        Err(ServiceError::TicketNotOwned)
    }
}

/// Map a guarded update that matched nothing to the conflict that caused it.
pub(crate) async fn lost_race<C>(db: &C, ticket_id: i64) -> ServiceError
where
    C: ConnectionTrait,
{
    match tickets::Model::find_meta(db, ticket_id, false).await {
        Ok(None) => ServiceError::TicketNotFound,
        Ok(Some(meta)) => match meta.status() {
            TicketStatus::Ended => ServiceError::TicketAlreadyEnded,
            TicketStatus::Accepted => ServiceError::TicketAlreadyAccepted,
            TicketStatus::Created => {
                ServiceError::Internal(format!("ticket {ticket_id} update matched no row"))
            }
        },
        Err(err) => ServiceError::Database(err),
    }
}

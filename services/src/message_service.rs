//! Message delivery: validate, sanitize, store inside the lifecycle transaction, then announce.

use crate::access::Operation;
use crate::error::ServiceError;
use crate::events::{MessageEvent, MessageEventBus};
use crate::ticket_service::{ensure_participant, locked_meta};
use crate::timed;
use crate::validate::{SendMessageReq, escape_html};
use chrono::Utc;
use db::models::ticket_messages;
use db::models::tickets::TicketStatus;
use db::models::user::Role;
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

#[derive(Clone)]
pub struct MessageService {
    db: DatabaseConnection,
    bus: Arc<MessageEventBus>,
    query_timeout: Duration,
}

impl MessageService {
    pub fn new(db: DatabaseConnection, bus: Arc<MessageEventBus>, query_timeout: Duration) -> Self {
        Self {
            db,
            bus,
            query_timeout,
        }
    }

    /// Post `text` to a ticket as `user_id`.
    ///
    /// Clients may write before an agent accepted; agents only once they are the agent.
    pub async fn send(
        &self,
        user_id: i64,
        role: Role,
        ticket_id: i64,
        text: &str,
    ) -> Result<(), ServiceError> {
        Operation::SendMessage.check(role)?;
        let req = SendMessageReq {
            ticket_id,
            message: text.to_owned(),
        };
        req.validate()?;
        let content = escape_html(&req.message);

        let view = timed(self.query_timeout, async {
            let txn = self.db.begin().await?;

            let meta = locked_meta(&txn, ticket_id).await?;
            ensure_participant(&meta, user_id, role)?;
            match (meta.status(), role) {
                (TicketStatus::Ended, _) => return Err(ServiceError::TicketAlreadyEnded),
                (TicketStatus::Created, Role::Agent) => return Err(ServiceError::TicketNotAccepted),
                _ => {}
            }

            let view =
                ticket_messages::Model::insert(&txn, ticket_id, user_id, &content, Utc::now())
                    .await?;
            txn.commit().await?;
            Ok(view)
        })
        .await?;

        tracing::debug!(ticket_id, user_id, message_id = view.id, "message stored");
        let done = self.bus.publish(MessageEvent::NewMessage, view).await;
        tracing::debug!(ticket_id, handlers = done, "message event delivered");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;

    #[tokio::test]
    async fn send_then_read_back_escaped() {
        let f = fixture().await;
        let id = f.tickets.create(f.client.id, "Hello").await.unwrap();
        f.tickets.accept(f.agent.id, id).await.unwrap();

        f.messages
            .send(f.agent.id, Role::Agent, id, r#"Try <Ctrl> & "F5""#)
            .await
            .unwrap();

        let details = f.tickets.get_messages(f.client.id, Role::Client, id).await.unwrap();
        assert_eq!(details.messages.len(), 2);
        assert_eq!(details.messages[1].content, "Try &lt;Ctrl&gt; &amp; &#34;F5&#34;");
        assert_eq!(details.messages[1].user.id, f.agent.id);

        let published = f.seen_messages();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].ticket_id, id);
        assert_eq!(published[0].content, details.messages[1].content);
    }

    #[tokio::test]
    async fn client_may_write_before_acceptance_but_agent_may_not() {
        let f = fixture().await;
        let id = f.tickets.create(f.client.id, "Hello").await.unwrap();

        f.messages.send(f.client.id, Role::Client, id, "anyone?").await.unwrap();

        let err = f.messages.send(f.agent.id, Role::Agent, id, "hi").await.unwrap_err();
        assert!(matches!(err, ServiceError::TicketNotAccepted));
    }

    #[tokio::test]
    async fn other_agent_cannot_write() {
        let f = fixture().await;
        let id = f.tickets.create(f.client.id, "Hello").await.unwrap();
        f.tickets.accept(f.other_agent.id, id).await.unwrap();

        let err = f.messages.send(f.agent.id, Role::Agent, id, "hijack").await.unwrap_err();
        assert!(matches!(err, ServiceError::TicketNotOwned));
    }

    #[tokio::test]
    async fn concurrent_sends_on_ended_ticket_fail() {
        let f = fixture().await;
        let id = f.tickets.create(f.client.id, "Hello").await.unwrap();
        f.tickets.end(f.client.id, Role::Client, id).await.unwrap();

        let (a, b) = tokio::join!(
            f.messages.send(f.client.id, Role::Client, id, "one"),
            f.messages.send(f.client.id, Role::Client, id, "two")
        );
        assert!(matches!(a, Err(ServiceError::TicketAlreadyEnded)));
        assert!(matches!(b, Err(ServiceError::TicketAlreadyEnded)));

        let details = f.tickets.get_messages(f.client.id, Role::Client, id).await.unwrap();
        assert_eq!(details.messages.len(), 1);
        assert!(f.seen_messages().is_empty());
    }

    #[tokio::test]
    async fn invalid_text_never_opens_a_transaction() {
        let f = fixture().await;
        let err = f
            .messages
            .send(f.client.id, Role::Client, 404, &"x".repeat(101))
            .await
            .unwrap_err();
        // validation runs before the ticket is even looked up
        assert_eq!(err.code(), "invalid_input");
    }
}

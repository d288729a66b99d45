use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ConnectionTrait, QueryOrder, QuerySelect, QueryTrait};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};

use super::{ticket_messages, user};

/// A support conversation opened by a client.
///
/// The status is never stored; see [`TicketStatus::derive`].
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub client_id: i64,
    pub agent_id: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TicketStatus {
    Created,
    Accepted,
    Ended,
}

impl TicketStatus {
    /// `ended` wins over everything; otherwise an agent means accepted.
    pub fn derive(agent_id: Option<i64>, ended_at: Option<DateTime<Utc>>) -> Self {
        match (ended_at, agent_id) {
            (Some(_), _) => TicketStatus::Ended,
            (None, None) => TicketStatus::Created,
            (None, Some(_)) => TicketStatus::Accepted,
        }
    }
}

/// The subset of a ticket that lifecycle decisions are made on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketMeta {
    pub client_id: i64,
    pub agent_id: Option<i64>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl TicketMeta {
    pub fn status(&self) -> TicketStatus {
        TicketStatus::derive(self.agent_id, self.ended_at)
    }
}

impl From<Model> for TicketMeta {
    fn from(m: Model) -> Self {
        Self {
            client_id: m.client_id,
            agent_id: m.agent_id,
            ended_at: m.ended_at,
        }
    }
}

impl Model {
    pub fn status(&self) -> TicketStatus {
        TicketStatus::derive(self.agent_id, self.ended_at)
    }
}

/// One row of a ticket list: the ticket, who opened it, and how it started.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSummary {
    pub id: i64,
    pub status: TicketStatus,
    pub client: user::UserMeta,
    pub first_message: String,
    pub time: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ClientId",
        to = "super::user::Column::Id"
    )]
    Client,

    #[sea_orm(has_many = "super::ticket_messages::Entity")]
    Messages,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::ticket_messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn insert<C>(db: &C, client_id: i64, created_at: DateTime<Utc>) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        ActiveModel {
            client_id: Set(client_id),
            agent_id: Set(None),
            created_at: Set(created_at),
            ended_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Claim an open ticket for `agent_id`.
    ///
    /// Only applies while the ticket has no agent and has not ended. Returns `false`
    /// when the guard did not match, i.e. another transition got there first.
    pub async fn set_agent<C>(db: &C, id: i64, agent_id: i64) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let res = Entity::update_many()
            .col_expr(Column::AgentId, Expr::value(agent_id))
            .filter(Column::Id.eq(id))
            .filter(Column::AgentId.is_null())
            .filter(Column::EndedAt.is_null())
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    /// Stamp the end time. Only applies while the ticket has not ended.
    pub async fn set_ended<C>(db: &C, id: i64, ended_at: DateTime<Utc>) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let res = Entity::update_many()
            .col_expr(Column::EndedAt, Expr::value(ended_at))
            .filter(Column::Id.eq(id))
            .filter(Column::EndedAt.is_null())
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    /// Assign and end in one step, for an agent closing a ticket nobody accepted yet.
    pub async fn set_agent_and_ended<C>(
        db: &C,
        id: i64,
        agent_id: i64,
        ended_at: DateTime<Utc>,
    ) -> Result<bool, DbErr>
    where
        C: ConnectionTrait,
    {
        let res = Entity::update_many()
            .col_expr(Column::AgentId, Expr::value(agent_id))
            .col_expr(Column::EndedAt, Expr::value(ended_at))
            .filter(Column::Id.eq(id))
            .filter(Column::AgentId.is_null())
            .filter(Column::EndedAt.is_null())
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    /// Id of the newest non-ended ticket of `client_id`.
    ///
    /// With `for_update` the row is read with an exclusive lock where the engine supports it.
    pub async fn find_last_active_id<C>(
        db: &C,
        client_id: i64,
        for_update: bool,
    ) -> Result<Option<i64>, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut query = Entity::find()
            .filter(Column::ClientId.eq(client_id))
            .filter(Column::EndedAt.is_null())
            .order_by_desc(Column::Id);
        if for_update {
            query = query.lock_exclusive();
        }
        Ok(query.one(db).await?.map(|t| t.id))
    }

    pub async fn find_meta<C>(db: &C, id: i64, for_update: bool) -> Result<Option<TicketMeta>, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut query = Entity::find_by_id(id);
        if for_update {
            query = query.lock_exclusive();
        }
        Ok(query.one(db).await?.map(TicketMeta::from))
    }

    /// Ticket list ordered by id. `client_id` restricts it to one client's tickets.
    ///
    /// Tickets without any message are skipped.
    pub async fn find_summaries<C>(
        db: &C,
        client_id: Option<i64>,
    ) -> Result<Vec<TicketSummary>, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut query = Entity::find().order_by_asc(Column::Id);
        if let Some(client_id) = client_id {
            query = query.filter(Column::ClientId.eq(client_id));
        }
        let tickets = query.all(db).await?;
        if tickets.is_empty() {
            return Ok(Vec::new());
        }

        let ticket_ids: Vec<i64> = tickets.iter().map(|t| t.id).collect();
        let first_ids = ticket_messages::Entity::find()
            .select_only()
            .column_as(Expr::expr(Func::min(Expr::col(ticket_messages::Column::Id))), "first_id")
            .group_by(ticket_messages::Column::TicketId)
            .into_query();

        let first_messages: HashMap<i64, ticket_messages::Model> = ticket_messages::Entity::find()
            .filter(ticket_messages::Column::Id.in_subquery(first_ids))
            .filter(ticket_messages::Column::TicketId.is_in(ticket_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.ticket_id, m))
            .collect();

        let mut client_ids: Vec<i64> = tickets.iter().map(|t| t.client_id).collect();
        client_ids.sort_unstable();
        client_ids.dedup();
        let clients: HashMap<i64, user::Model> = user::Entity::find()
            .filter(user::Column::Id.is_in(client_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(tickets
            .into_iter()
            .filter_map(|t| {
                let first = first_messages.get(&t.id)?;
                let client = clients.get(&t.client_id)?;
                Some(TicketSummary {
                    id: t.id,
                    status: t.status(),
                    client: user::UserMeta::from(client.clone()),
                    first_message: first.content.clone(),
                    time: first.sent_at,
                })
            })
            .collect())
    }
}

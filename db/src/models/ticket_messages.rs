use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, ConnectionTrait, QueryOrder, entity::prelude::*};
use serde::{Deserialize, Serialize};

use super::user::{self, UserMeta};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "ticket_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub ticket_id: i64,
    pub user_id: i64,

    /// Already HTML-escaped.
    pub content: String,

    pub sent_at: DateTime<Utc>,
}

/// A message as shown to participants, with its author resolved.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: i64,
    #[serde(rename = "ticketID")]
    pub ticket_id: i64,
    pub user: UserMeta,
    pub content: String,
    pub time: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tickets::Entity",
        from = "Column::TicketId",
        to = "super::tickets::Column::Id"
    )]
    Ticket,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::tickets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ticket.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Store a message and return it with its author's display info.
    pub async fn insert<C>(
        db: &C,
        ticket_id: i64,
        user_id: i64,
        content: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<MessageView, DbErr>
    where
        C: ConnectionTrait,
    {
        let msg = ActiveModel {
            ticket_id: Set(ticket_id),
            user_id: Set(user_id),
            content: Set(content.to_owned()),
            sent_at: Set(sent_at),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let author = user::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("user {user_id} not found")))?;

        Ok(msg.into_view(author))
    }

    /// All messages of a ticket in display order.
    pub async fn find_for_ticket<C>(db: &C, ticket_id: i64) -> Result<Vec<MessageView>, DbErr>
    where
        C: ConnectionTrait,
    {
        let rows = Entity::find()
            .filter(Column::TicketId.eq(ticket_id))
            .order_by_asc(Column::Id)
            .find_also_related(user::Entity)
            .all(db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(msg, author)| author.map(|a| msg.into_view(a)))
            .collect())
    }

    fn into_view(self, author: user::Model) -> MessageView {
        MessageView {
            id: self.id,
            ticket_id: self.ticket_id,
            user: author.into(),
            content: self.content,
            time: self.sent_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tickets;
    use crate::models::user::Role;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_messages_in_insertion_order_with_authors() {
        let db = setup_test_db().await;
        let c = user::Model::create(&db, "c@example.com", "Rūta", "Vaitkutė", Role::Client)
            .await
            .unwrap();
        let a = user::Model::create(&db, "a@example.com", "Paulius", "Žukas", Role::Agent)
            .await
            .unwrap();
        let t = tickets::Model::insert(&db, c.id, Utc::now()).await.unwrap();

        let first = Model::insert(&db, t.id, c.id, "Hello", Utc::now()).await.unwrap();
        assert_eq!(first.user.first_name, "Rūta");

        Model::insert(&db, t.id, a.id, "Hi, how can I help?", Utc::now())
            .await
            .unwrap();

        let all = Model::find_for_ticket(&db, t.id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].content, "Hello");
        assert_eq!(all[1].user.id, a.id);

        assert!(Model::find_for_ticket(&db, t.id + 1).await.unwrap().is_empty());
    }
}

use chrono::{DateTime, Utc};
use db::models::ticket_messages::MessageView;
use db::models::tickets::TicketSummary;
use db::models::user::{Role, UserMeta};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound frame: `{"method": "...", "params": {...}}`.
#[derive(Debug, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Deserialize)]
pub struct AuthenticateReq {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthenticateRes {
    #[serde(rename = "userID")]
    pub user_id: i64,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct NewTicketRes {
    #[serde(rename = "ticketID")]
    pub ticket_id: i64,
}

#[derive(Debug, Serialize)]
pub struct TicketListRes {
    pub tickets: Vec<TicketSummary>,
}

/* ---------- Server pushes ---------- */

#[derive(Debug, Serialize)]
pub struct TicketPush {
    #[serde(rename = "ticketID")]
    pub ticket_id: i64,
}

#[derive(Debug, Serialize)]
pub struct MessagePush<'a> {
    #[serde(rename = "ticketID")]
    pub ticket_id: i64,
    pub user: &'a UserMeta,
    pub content: &'a str,
    pub time: DateTime<Utc>,
}

impl<'a> From<&'a MessageView> for MessagePush<'a> {
    fn from(m: &'a MessageView) -> Self {
        Self {
            ticket_id: m.ticket_id,
            user: &m.user,
            content: &m.content,
            time: m.time,
        }
    }
}

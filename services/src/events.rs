//! Events emitted after a ticket or message change is committed.

use db::models::ticket_messages::MessageView;
use util::events::EventBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketEvent {
    NewTicket,
    AcceptedTicket,
    EndedTicket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageEvent {
    NewMessage,
}

/// State of the ticket right after the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketChanged {
    pub ticket_id: i64,
    pub client_id: i64,
    pub agent_id: Option<i64>,
}

pub type TicketEventBus = EventBus<TicketEvent, TicketChanged>;
pub type MessageEventBus = EventBus<MessageEvent, MessageView>;

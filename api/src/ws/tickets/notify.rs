//! Event-bus subscribers that turn committed ticket changes into room pushes.

use services::events::{MessageEvent, MessageEventBus, TicketEvent, TicketEventBus};
use util::ws::{SocketPool, emit};

use super::rooms;
use crate::ws::session::AGENTS_ROOM;
use crate::ws::types::{MessagePush, TicketPush};

pub const QUEUE_REFRESH: &str = "ticket/queue/refresh";
pub const TICKET_ACCEPTED: &str = "ticket/accepted";
pub const TICKET_ENDED: &str = "ticket/ended";
pub const MESSAGE_NEW: &str = "ticket/message/new";

pub fn subscribe(sockets: &SocketPool, tickets: &TicketEventBus, messages: &MessageEventBus) {
    for kind in [
        TicketEvent::NewTicket,
        TicketEvent::AcceptedTicket,
        TicketEvent::EndedTicket,
    ] {
        let sockets = sockets.clone();
        tickets.subscribe(kind, move |_| {
            let sockets = sockets.clone();
            async move {
                let n = emit(&sockets, AGENTS_ROOM, QUEUE_REFRESH, &()).await;
                tracing::debug!(?kind, delivered = n, "queue refresh pushed");
            }
        });
    }

    let s = sockets.clone();
    tickets.subscribe(TicketEvent::AcceptedTicket, move |changed| {
        let sockets = s.clone();
        async move {
            let push = TicketPush {
                ticket_id: changed.ticket_id,
            };
            emit(&sockets, &rooms::room_name(changed.ticket_id), TICKET_ACCEPTED, &push).await;
        }
    });

    let s = sockets.clone();
    tickets.subscribe(TicketEvent::EndedTicket, move |changed| {
        let sockets = s.clone();
        async move {
            let push = TicketPush {
                ticket_id: changed.ticket_id,
            };
            emit(&sockets, &rooms::room_name(changed.ticket_id), TICKET_ENDED, &push).await;
            // A missing room is fine here: nobody had the ticket open.
            rooms::delete(&sockets, changed.ticket_id).await;
        }
    });

    let s = sockets.clone();
    messages.subscribe(MessageEvent::NewMessage, move |view| {
        let sockets = s.clone();
        async move {
            let push = MessagePush::from(view.as_ref());
            let n = emit(&sockets, &rooms::room_name(view.ticket_id), MESSAGE_NEW, &push).await;
            tracing::debug!(ticket_id = view.ticket_id, delivered = n, "message pushed");
        }
    });
}

use crate::events::{MessageEvent, MessageEventBus, TicketEvent, TicketEventBus};
use crate::{MessageService, TicketService};
use db::models::ticket_messages::MessageView;
use db::models::user::{self, Role};
use db::test_utils::{create_user, setup_test_db};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use util::pool::WorkerPool;

pub struct Fixture {
    pub tickets: TicketService,
    pub messages: MessageService,
    pub client: user::Model,
    pub other_client: user::Model,
    pub agent: user::Model,
    pub other_agent: user::Model,
    ticket_events: Arc<Mutex<Vec<TicketEvent>>>,
    message_events: Arc<Mutex<Vec<MessageView>>>,
}

impl Fixture {
    pub fn seen_ticket_events(&self) -> Vec<TicketEvent> {
        self.ticket_events.lock().unwrap().clone()
    }

    pub fn seen_messages(&self) -> Vec<MessageView> {
        self.message_events.lock().unwrap().clone()
    }
}

/// Services over a fresh in-memory database, with buses that record what was published.
pub async fn fixture() -> Fixture {
    let db = setup_test_db().await;
    let pool = WorkerPool::new(4, Duration::from_millis(100));

    let ticket_bus = Arc::new(TicketEventBus::new(pool.clone()));
    let ticket_events = Arc::new(Mutex::new(Vec::new()));
    for kind in [
        TicketEvent::NewTicket,
        TicketEvent::AcceptedTicket,
        TicketEvent::EndedTicket,
    ] {
        let seen = ticket_events.clone();
        ticket_bus.subscribe(kind, move |_payload| {
            let seen = seen.clone();
            async move { seen.lock().unwrap().push(kind) }
        });
    }

    let message_bus = Arc::new(MessageEventBus::new(pool));
    let message_events = Arc::new(Mutex::new(Vec::new()));
    let seen = message_events.clone();
    message_bus.subscribe(MessageEvent::NewMessage, move |payload: Arc<MessageView>| {
        let seen = seen.clone();
        async move { seen.lock().unwrap().push((*payload).clone()) }
    });

    let timeout = Duration::from_secs(5);
    Fixture {
        tickets: TicketService::new(db.clone(), ticket_bus, timeout),
        messages: MessageService::new(db.clone(), message_bus, timeout),
        client: create_user(&db, "Client", Role::Client).await,
        other_client: create_user(&db, "OtherClient", Role::Client).await,
        agent: create_user(&db, "Agent", Role::Agent).await,
        other_agent: create_user(&db, "OtherAgent", Role::Agent).await,
        ticket_events,
        message_events,
    }
}

pub mod session;
pub mod ticket_messages;
pub mod tickets;
pub mod user;

pub use session::Entity as Session;
pub use ticket_messages::Entity as TicketMessage;
pub use tickets::Entity as Ticket;
pub use user::Entity as User;

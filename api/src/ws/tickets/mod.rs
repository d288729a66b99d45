pub mod handlers;
pub mod notify;
pub mod rooms;

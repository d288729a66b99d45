use axum::{Router, routing::get};

use crate::state::ApiState;

pub mod error;
pub mod mux;
pub mod router;
pub mod session;
pub mod tickets;
pub mod types;

pub fn ws_routes(state: ApiState) -> Router {
    Router::new()
        .route("/ws", get(mux::ws_entry))
        .with_state(state)
}

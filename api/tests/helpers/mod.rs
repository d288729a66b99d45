pub mod app;
pub mod ws;

pub use app::{TestApp, spawn_app, spawn_app_with};
pub use ws::{WsClient, assert_silent, call, connect_ws, recv_method, send};

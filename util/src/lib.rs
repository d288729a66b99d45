pub mod config;
pub mod events;
pub mod pool;
pub mod state;
pub mod ws;

pub mod state;
pub mod ws;

pub use state::{ApiSettings, ApiState};

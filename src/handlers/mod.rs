pub mod health;
pub mod suggest;

pub use health::{health_handler, ready_handler};
pub use suggest::{suggest_debug_handler, suggest_handler};

//! suggestd - Autocomplete suggestion orchestration engine
//!
//! Exposes the scatter/gather retrieval core (component registry, worker
//! pool, retrieval algorithms, rescorers, dedup, request pipeline) plus a
//! thin axum HTTP surface, enabling integration tests and embedding.

pub mod algo;
pub mod config;
pub mod dedup;
pub mod error;
pub mod falcon;
pub mod handlers;
pub mod manager;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod pool;
pub mod registry;
pub mod rescore;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use handlers::{health_handler, ready_handler, suggest_debug_handler, suggest_handler};
pub use manager::SuggestionManager;
pub use state::AppState;

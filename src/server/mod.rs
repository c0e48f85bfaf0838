//! HTTP server - configuration, shared state, routing and handlers

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use router::create_router;
pub use state::AppState;

//! HTTP surface of EcoScan: multipart uploads in, waste categories out.

pub mod api;
pub mod config;
pub mod error;
pub mod state;

pub use api::create_router;
pub use config::{Cli, ConfigError, ServerConfig};
pub use error::ApiError;
pub use state::AppState;

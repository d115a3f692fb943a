pub mod config;
pub mod error;
pub mod state;

pub use config::ConnectionConfig;
pub use error::{ConfigError, ConnectionError, QueryError, RunError};
pub use state::ConnectionState;

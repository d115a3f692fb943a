use thiserror::Error;

use crate::state::ConnectionState;

/// Failure to reach, authenticate against, or use a graph connection.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Invalid connection config: {0}")]
    InvalidConfig(String),

    #[error("Cannot reach graph database at {uri}: {reason}")]
    Unreachable { uri: String, reason: String },

    #[error("Connection to {uri} rejected: {reason}")]
    Rejected { uri: String, reason: String },

    #[error("Connection is {0}, expected open")]
    NotOpen(ConnectionState),

    #[error("Connection lost during query: {0}")]
    Lost(String),

    #[error("Failed to start blocking runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Failure of the query itself: bad template, bad bindings, or a database error.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Missing values for query parameters: {}", .0.join(", "))]
    MissingParameters(Vec<String>),

    #[error("Query has no RETURN clause")]
    MissingReturn,

    #[error("Unsupported projection `{0}`: name the returned columns explicitly")]
    UnsupportedProjection(String),

    #[error("Result row has no column `{0}`")]
    MissingColumn(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Either failure kind, as returned from `run`.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl RunError {
    pub fn is_connection(&self) -> bool {
        matches!(self, RunError::Connection(_))
    }

    pub fn is_query(&self) -> bool {
        matches!(self, RunError::Query(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

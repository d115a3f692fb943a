//! Synchronous facade over [`crate::runner`] for callers without an async runtime.
//!
//! Each connection owns a private current-thread runtime, so calls block the
//! calling thread until the database answers. Do not use these from inside an
//! async context.

use tokio::runtime::{Builder, Runtime};

use graphread_common::{ConnectionConfig, ConnectionError, ConnectionState, RunError};

use crate::params::QueryRequest;
use crate::row::ResultRow;
use crate::runner;

fn runtime() -> Result<Runtime, ConnectionError> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

/// `inner` is declared first so the driver pool drops before its runtime.
pub struct Connection {
    inner: runner::Connection,
    runtime: Runtime,
}

impl Connection {
    pub fn new(config: ConnectionConfig) -> Result<Self, ConnectionError> {
        Ok(Self {
            inner: runner::Connection::new(config),
            runtime: runtime()?,
        })
    }

    pub fn open(config: ConnectionConfig) -> Result<Self, ConnectionError> {
        let mut connection = Self::new(config)?;
        connection.connect()?;
        Ok(connection)
    }

    pub fn connect(&mut self) -> Result<(), ConnectionError> {
        self.runtime.block_on(self.inner.connect())
    }

    pub fn run(&mut self, request: &QueryRequest) -> Result<Vec<ResultRow>, RunError> {
        self.runtime.block_on(self.inner.run(request))
    }

    pub fn close(&mut self) {
        self.inner.close();
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }
}

pub struct QueryRunner {
    inner: runner::QueryRunner,
    runtime: Runtime,
}

impl QueryRunner {
    pub fn new(config: ConnectionConfig) -> Result<Self, ConnectionError> {
        Ok(Self {
            inner: runner::QueryRunner::new(config),
            runtime: runtime()?,
        })
    }

    pub fn run(&mut self, request: &QueryRequest) -> Result<Vec<ResultRow>, RunError> {
        self.runtime.block_on(self.inner.run(request))
    }

    pub fn close(&mut self) {
        self.inner.close();
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> ConnectionConfig {
        ConnectionConfig::new("localhost", 7687, "neo4j", "test", "neo4j")
    }

    #[test]
    fn blocking_state_machine() {
        let mut connection = Connection::new(local()).unwrap();
        assert_eq!(connection.state(), ConnectionState::Unopened);

        let err = connection
            .run(&QueryRequest::new("RETURN 1 AS one"))
            .unwrap_err();
        assert!(matches!(
            err,
            RunError::Connection(ConnectionError::NotOpen(ConnectionState::Unopened))
        ));

        connection.close();
        connection.close();
        assert_eq!(connection.state(), ConnectionState::Closed);
    }

    #[test]
    fn blocking_open_rejects_invalid_config() {
        let err = Connection::open(local().with_scheme(""))
            .err()
            .expect("open should fail");
        assert!(matches!(err, ConnectionError::InvalidConfig(_)));
    }
}

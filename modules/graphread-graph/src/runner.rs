use tracing::{debug, info};

use graphread_common::{ConnectionConfig, ConnectionError, ConnectionState, RunError};

use crate::client::GraphClient;
use crate::params::QueryRequest;
use crate::row::ResultRow;

/// A connection to one graph database, with an explicit lifecycle:
/// `Unopened -> Open -> Closed`. `Closed` is terminal.
///
/// The driver pool is released on `close` or when the connection is dropped,
/// whichever comes first.
pub struct Connection {
    config: ConnectionConfig,
    state: ConnectionState,
    client: Option<GraphClient>,
}

impl Connection {
    /// A connection that has not contacted the database yet.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Unopened,
            client: None,
        }
    }

    /// Connect to the configured endpoint and database.
    pub async fn open(config: ConnectionConfig) -> Result<Self, ConnectionError> {
        let mut connection = Self::new(config);
        connection.connect().await?;
        Ok(connection)
    }

    /// Move an unopened connection to `Open`. A no-op when already open.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        match self.state {
            ConnectionState::Open => return Ok(()),
            ConnectionState::Closed => return Err(ConnectionError::NotOpen(self.state)),
            ConnectionState::Unopened => {}
        }

        let client = GraphClient::connect(&self.config).await?;
        info!(
            uri = %self.config.uri(),
            database = %self.config.database,
            "Opened graph connection"
        );
        self.client = Some(client);
        self.state = ConnectionState::Open;
        Ok(())
    }

    /// Execute `request` read-only and return every row, in the order the
    /// database produced them. Nothing is returned unless the whole result
    /// set was read.
    pub async fn run(&mut self, request: &QueryRequest) -> Result<Vec<ResultRow>, RunError> {
        let client = match (&self.state, &self.client) {
            (ConnectionState::Open, Some(client)) => client,
            _ => return Err(ConnectionError::NotOpen(self.state).into()),
        };

        let shape = request.validate()?;
        debug!(
            columns = ?shape.columns,
            parameters = request.parameters.len(),
            "Running read query"
        );

        let rows = client.read_rows(request.to_query(), &shape.columns).await?;
        debug!(rows = rows.len(), "Read query complete");
        Ok(rows)
    }

    /// Release the connection. Safe to call in any state, any number of times.
    pub fn close(&mut self) {
        if self.client.take().is_some() {
            info!(uri = %self.config.uri(), "Closed graph connection");
        }
        self.state = ConnectionState::Closed;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The underlying client while the connection is open.
    pub fn client(&self) -> Option<&GraphClient> {
        self.client.as_ref()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Runs read queries against one database, opening the connection on first use.
pub struct QueryRunner {
    connection: Connection,
}

impl QueryRunner {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            connection: Connection::new(config),
        }
    }

    pub async fn run(&mut self, request: &QueryRequest) -> Result<Vec<ResultRow>, RunError> {
        if self.connection.state() == ConnectionState::Unopened {
            self.connection.connect().await?;
        }
        self.connection.run(request).await
    }

    pub fn close(&mut self) {
        self.connection.close();
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

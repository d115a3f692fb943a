use neo4rs::{query, ConfigBuilder, Graph, Txn};
use tracing::warn;

use graphread_common::{ConnectionConfig, ConnectionError, QueryError, RunError};

use crate::row::ResultRow;

/// Thin wrapper around neo4rs::Graph providing connection setup.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
}

impl GraphClient {
    /// Connect with the given config and verify the endpoint answers.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, ConnectionError> {
        config.validate()?;
        let uri = config.uri();
        let driver_config = ConfigBuilder::default()
            .uri(uri.as_str())
            .user(config.username.as_str())
            .password(config.password.as_str())
            .db(config.database.as_str())
            .fetch_size(config.fetch_size)
            .max_connections(config.max_connections)
            .build()
            .map_err(|e| ConnectionError::InvalidConfig(e.to_string()))?;
        let graph = Graph::connect(driver_config)
            .await
            .map_err(|e| connect_error(&uri, e))?;

        let client = Self { graph };
        client.ping().await.map_err(|e| connect_error(&uri, e))?;
        Ok(client)
    }

    /// Round trip in an explicit transaction; `Graph::execute` retries refused
    /// connections with backoff.
    async fn ping(&self) -> Result<(), neo4rs::Error> {
        let mut txn = self.graph.start_txn().await?;
        let outcome = txn.run(query("RETURN 1 AS ping")).await;
        if let Err(e) = txn.rollback().await {
            warn!(error = %e, "Rollback of ping transaction failed (ignored)");
        }
        outcome
    }

    /// Get a reference to the underlying neo4rs Graph.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }

    /// Run `q` in a transaction that is always rolled back, collecting `columns`
    /// of every row. Nothing the query does is ever committed.
    pub(crate) async fn read_rows(
        &self,
        q: neo4rs::Query,
        columns: &[String],
    ) -> Result<Vec<ResultRow>, RunError> {
        let mut txn = self.graph.start_txn().await.map_err(run_error)?;
        let outcome = drain(&mut txn, q, columns).await;
        if let Err(e) = txn.rollback().await {
            warn!(error = %e, "Rollback of read transaction failed (ignored)");
        }
        outcome
    }
}

async fn drain(
    txn: &mut Txn,
    q: neo4rs::Query,
    columns: &[String],
) -> Result<Vec<ResultRow>, RunError> {
    let mut stream = txn.execute(q).await.map_err(run_error)?;
    let mut rows = Vec::new();
    while let Some(row) = stream.next(txn.handle()).await.map_err(run_error)? {
        rows.push(ResultRow::from_driver(&row, columns)?);
    }
    Ok(rows)
}

fn connect_error(uri: &str, err: neo4rs::Error) -> ConnectionError {
    match err {
        neo4rs::Error::AuthenticationError(reason) => ConnectionError::Rejected {
            uri: uri.to_string(),
            reason,
        },
        other => ConnectionError::Unreachable {
            uri: uri.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Transport failures mean the connection is gone; anything else the database
/// reported is a problem with the query.
fn run_error(err: neo4rs::Error) -> RunError {
    match err {
        neo4rs::Error::IOError { .. } | neo4rs::Error::ConnectionError => {
            ConnectionError::Lost(err.to_string()).into()
        }
        other => QueryError::Database(other.to_string()).into(),
    }
}

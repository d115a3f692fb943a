pub mod blocking;
pub mod client;
pub mod cypher;
pub mod params;
pub mod row;
pub mod runner;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use client::GraphClient;
pub use cypher::QueryShape;
pub use graphread_common::{
    ConfigError, ConnectionConfig, ConnectionError, ConnectionState, QueryError, RunError,
};
pub use neo4rs::query;
pub use params::{parse_assignment, ParamValue, QueryRequest};
pub use row::{GraphValue, ResultRow};
pub use runner::{Connection, QueryRunner};

/// Genre popularity among users of one state, most watched first.
pub const GENRES_BY_STATE: &str = "\
MATCH (u:User {state: $state})-[:WATCHED]->(m)-[:HAS]->(g:Genre)
RETURN g.name AS genre, count(g) AS freq
ORDER BY freq DESC";

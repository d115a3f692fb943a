//! Smoke test: run the genre query against a live database.
//! Run with: cargo test -p graphread-graph --test cloud_connect -- --ignored

use graphread_graph::{Connection, ConnectionConfig, GraphValue, QueryRequest, GENRES_BY_STATE};

#[tokio::test]
#[ignore] // requires live Neo4j credentials
async fn cloud_connect() {
    let config = ConnectionConfig::from_env().expect("NEO4J_* environment required");
    let state = std::env::var("GRAPHREAD_STATE").unwrap_or_else(|_| "Texas".to_string());

    let mut connection = Connection::open(config).await.expect("Failed to connect");
    let rows = connection
        .run(&QueryRequest::new(GENRES_BY_STATE).param("state", state))
        .await
        .expect("Query failed");

    let freqs: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.get("freq").and_then(GraphValue::as_f64))
        .collect();
    assert_eq!(freqs.len(), rows.len());
    assert!(freqs.windows(2).all(|w| w[0] >= w[1]));

    connection.close();
}

use std::env;
use std::fmt;

use crate::error::{ConfigError, ConnectionError};

pub const DEFAULT_PORT: u16 = 7687;
pub const DEFAULT_DATABASE: &str = "neo4j";
pub const DEFAULT_SCHEME: &str = "neo4j";
pub const DEFAULT_FETCH_SIZE: usize = 500;
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// Where and as whom to connect. Supplied once at startup and read-only after.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,

    // Transport options, applied when the connection is opened.
    pub scheme: String,
    pub fetch_size: usize,
    pub max_connections: usize,
}

impl ConnectionConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            database: database.into(),
            scheme: DEFAULT_SCHEME.to_string(),
            fetch_size: DEFAULT_FETCH_SIZE,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Load configuration from environment variables (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let port = match get("NEO4J_PORT") {
            Some(raw) => parse_var("NEO4J_PORT", &raw)?,
            None => DEFAULT_PORT,
        };
        let fetch_size = match get("NEO4J_FETCH_SIZE") {
            Some(raw) => parse_var("NEO4J_FETCH_SIZE", &raw)?,
            None => DEFAULT_FETCH_SIZE,
        };
        let max_connections = match get("NEO4J_MAX_CONNECTIONS") {
            Some(raw) => parse_var("NEO4J_MAX_CONNECTIONS", &raw)?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            host: required("NEO4J_HOST")?,
            port,
            username: required("NEO4J_USER")?,
            password: required("NEO4J_PASSWORD")?,
            database: get("NEO4J_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            scheme: get("NEO4J_SCHEME").unwrap_or_else(|| DEFAULT_SCHEME.to_string()),
            fetch_size,
            max_connections,
        })
    }

    /// Bolt URI derived from scheme, host and port.
    pub fn uri(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Check the local invariants. Reachability is left to the connection attempt.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        let fields = [
            ("host", &self.host),
            ("username", &self.username),
            ("password", &self.password),
            ("database", &self.database),
            ("scheme", &self.scheme),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ConnectionError::InvalidConfig(format!("{name} must not be empty")));
            }
        }
        if self.port == 0 {
            return Err(ConnectionError::InvalidConfig("port must be non-zero".into()));
        }
        if self.fetch_size == 0 || self.max_connections == 0 {
            return Err(ConnectionError::InvalidConfig(
                "fetch_size and max_connections must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn log_redacted(&self) {
        tracing::info!("Connection config loaded:");
        tracing::info!("  NEO4J_URI: {}", self.uri());
        tracing::info!("  NEO4J_USER: {}", self.username);
        tracing::info!("  NEO4J_PASSWORD: {}", redact(&self.password));
        tracing::info!("  NEO4J_DATABASE: {}", self.database);
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("database", &self.database)
            .field("scheme", &self.scheme)
            .field("fetch_size", &self.fetch_size)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

fn parse_var<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

fn redact(val: &str) -> String {
    if val.is_empty() {
        "<not set>".to_string()
    } else {
        format!("<redacted>({} chars)", val.chars().count())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn local() -> ConnectionConfig {
        ConnectionConfig::new("localhost", 7687, "neo4j", "test", "neo4j")
    }

    #[test]
    fn uri_uses_scheme_host_and_port() {
        assert_eq!(local().uri(), "neo4j://localhost:7687");
        assert_eq!(local().with_scheme("bolt").uri(), "bolt://localhost:7687");
    }

    #[test]
    fn from_vars_applies_defaults() {
        let config = ConnectionConfig::from_vars(vars(&[
            ("NEO4J_HOST", "db.internal"),
            ("NEO4J_USER", "reader"),
            ("NEO4J_PASSWORD", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database, "neo4j");
        assert_eq!(config.scheme, "neo4j");
        assert_eq!(config.fetch_size, DEFAULT_FETCH_SIZE);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn from_vars_reads_every_option() {
        let config = ConnectionConfig::from_vars(vars(&[
            ("NEO4J_HOST", "db.internal"),
            ("NEO4J_PORT", "7688"),
            ("NEO4J_USER", "reader"),
            ("NEO4J_PASSWORD", "secret"),
            ("NEO4J_DATABASE", "movies"),
            ("NEO4J_SCHEME", "bolt+s"),
            ("NEO4J_FETCH_SIZE", "100"),
            ("NEO4J_MAX_CONNECTIONS", "2"),
        ]))
        .unwrap();

        assert_eq!(config.uri(), "bolt+s://db.internal:7688");
        assert_eq!(config.database, "movies");
        assert_eq!(config.fetch_size, 100);
        assert_eq!(config.max_connections, 2);
    }

    #[test]
    fn from_vars_requires_credentials() {
        let err = ConnectionConfig::from_vars(vars(&[
            ("NEO4J_HOST", "db.internal"),
            ("NEO4J_USER", "reader"),
            ("NEO4J_PASSWORD", "  "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("NEO4J_PASSWORD")));
    }

    #[test]
    fn from_vars_rejects_bad_port() {
        let err = ConnectionConfig::from_vars(vars(&[
            ("NEO4J_HOST", "db.internal"),
            ("NEO4J_PORT", "bolt"),
            ("NEO4J_USER", "reader"),
            ("NEO4J_PASSWORD", "secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "NEO4J_PORT", .. }));
    }

    #[test]
    fn validate_rejects_empty_fields() {
        assert!(local().validate().is_ok());

        let mut config = local();
        config.database = String::new();
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid connection config: database must not be empty"
        );

        let mut config = local();
        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", local().with_scheme("bolt"));
        assert!(!rendered.contains("\"test\""));
        assert!(rendered.contains("<redacted>(4 chars)"));
    }
}

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use graphread_graph::{
    parse_assignment, ConnectionConfig, GraphValue, ParamValue, QueryRequest, QueryRunner,
    ResultRow, GENRES_BY_STATE,
};

#[derive(Parser, Debug)]
#[command(name = "graphread", about = "Run parameterized read queries against a graph database")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    #[arg(long, env = "NEO4J_HOST", default_value = "localhost", global = true)]
    host: String,

    #[arg(long, env = "NEO4J_PORT", default_value_t = 7687, global = true)]
    port: u16,

    #[arg(long, env = "NEO4J_USER", default_value = "neo4j", global = true)]
    user: String,

    #[arg(long, env = "NEO4J_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    #[arg(long, env = "NEO4J_DATABASE", default_value = "neo4j", global = true)]
    database: String,

    /// URI scheme: neo4j, neo4j+s, bolt, bolt+s
    #[arg(long, env = "NEO4J_SCHEME", default_value = "neo4j", global = true)]
    scheme: String,

    #[arg(long, env = "NEO4J_FETCH_SIZE", default_value_t = 500, global = true)]
    fetch_size: usize,

    /// Upper bound on pooled driver connections
    #[arg(long, env = "NEO4J_MAX_CONNECTIONS", default_value_t = 10, global = true)]
    max_connections: usize,
}

impl ConnectionArgs {
    fn into_config(self) -> Result<ConnectionConfig> {
        let password = self
            .password
            .context("a password is required (--password or NEO4J_PASSWORD)")?;
        Ok(
            ConnectionConfig::new(self.host, self.port, self.user, password, self.database)
                .with_scheme(self.scheme)
                .with_fetch_size(self.fetch_size)
                .with_max_connections(self.max_connections),
        )
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Most watched genres among users of one state
    Genres {
        #[arg(long, default_value = "Texas")]
        state: String,

        #[arg(long, value_enum, default_value_t = Format::Lines)]
        format: Format,
    },
    /// Run an arbitrary read query
    Query(QueryArgs),
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Query text
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    cypher: Option<String>,

    /// Read the query text from a file
    #[arg(long)]
    file: Option<PathBuf>,

    /// Parameter binding, repeatable: --param state=Texas
    #[arg(long = "param", value_parser = parse_assignment)]
    params: Vec<(String, ParamValue)>,

    /// Parameters as a JSON object, merged before --param values
    #[arg(long)]
    params_json: Option<String>,

    /// Column printed in `lines` format (defaults to the first column)
    #[arg(long)]
    column: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Lines)]
    format: Format,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    /// One value of one column per line
    Lines,
    /// Header plus tab-separated columns
    Tsv,
    /// One JSON object per row
    Json,
}

impl QueryArgs {
    fn into_request(self) -> Result<QueryRequest> {
        let template = match (self.cypher, self.file) {
            (Some(text), _) => text,
            (None, Some(path)) => std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read query file {}", path.display()))?,
            (None, None) => anyhow::bail!("either --cypher or --file is required"),
        };

        let mut request = QueryRequest::new(template);
        if let Some(raw) = self.params_json {
            let json: serde_json::Value =
                serde_json::from_str(&raw).context("--params-json is not valid JSON")?;
            request = request.params_json(json).map_err(anyhow::Error::msg)?;
        }
        for (name, value) in self.params {
            request = request.param(name, value);
        }
        Ok(request)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("graphread=info".parse()?))
        .with_writer(io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = cli.connection.into_config()?;
    config.log_redacted();

    let (request, format, column) = match cli.command {
        Command::Genres { state, format } => (
            QueryRequest::new(GENRES_BY_STATE).param("state", state),
            format,
            Some("genre".to_string()),
        ),
        Command::Query(args) => {
            let format = args.format;
            let column = args.column.clone();
            (args.into_request()?, format, column)
        }
    };

    let mut runner = QueryRunner::new(config);
    let result = runner.run(&request).await;
    runner.close();
    let rows = result?;

    info!(rows = rows.len(), "Query complete");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    print_rows(&mut out, &rows, format, column.as_deref())?;
    out.flush()?;
    Ok(())
}

fn print_rows(
    out: &mut impl Write,
    rows: &[ResultRow],
    format: Format,
    column: Option<&str>,
) -> Result<()> {
    match format {
        Format::Lines => {
            for row in rows {
                let value = match column {
                    Some(name) => row
                        .get(name)
                        .with_context(|| format!("result has no column `{name}`"))?,
                    None => match row.values().next() {
                        Some(value) => value,
                        None => continue,
                    },
                };
                writeln!(out, "{value}")?;
            }
        }
        Format::Tsv => {
            if let Some(first) = rows.first() {
                writeln!(out, "{}", first.columns().collect::<Vec<_>>().join("\t"))?;
            }
            for row in rows {
                let cells: Vec<String> = row.values().map(GraphValue::to_string).collect();
                writeln!(out, "{}", cells.join("\t"))?;
            }
        }
        Format::Json => {
            for row in rows {
                writeln!(out, "{}", serde_json::to_string(row)?)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genre_rows() -> Vec<ResultRow> {
        vec![
            ResultRow::new(vec![
                ("genre".into(), GraphValue::String("Drama".into())),
                ("freq".into(), GraphValue::Integer(12)),
            ]),
            ResultRow::new(vec![
                ("genre".into(), GraphValue::String("Comedy".into())),
                ("freq".into(), GraphValue::Integer(9)),
            ]),
        ]
    }

    fn render(format: Format, column: Option<&str>) -> String {
        let mut out = Vec::new();
        print_rows(&mut out, &genre_rows(), format, column).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn lines_print_one_column() {
        assert_eq!(render(Format::Lines, Some("genre")), "Drama\nComedy\n");
        assert_eq!(render(Format::Lines, None), "Drama\nComedy\n");
        assert_eq!(render(Format::Lines, Some("freq")), "12\n9\n");
    }

    #[test]
    fn lines_reject_unknown_column() {
        let mut out = Vec::new();
        assert!(print_rows(&mut out, &genre_rows(), Format::Lines, Some("title")).is_err());
    }

    #[test]
    fn tsv_and_json_print_every_column() {
        assert_eq!(render(Format::Tsv, None), "genre\tfreq\nDrama\t12\nComedy\t9\n");
        assert_eq!(
            render(Format::Json, None),
            "{\"genre\":\"Drama\",\"freq\":12}\n{\"genre\":\"Comedy\",\"freq\":9}\n"
        );
    }

    #[test]
    fn query_args_merge_parameters() {
        let cli = Cli::try_parse_from([
            "graphread",
            "--password",
            "secret",
            "query",
            "--cypher",
            "MATCH (u:User {state: $state}) RETURN u.name AS name LIMIT $limit",
            "--params-json",
            r#"{"state": "Ohio", "limit": 5}"#,
            "--param",
            "state=Texas",
        ])
        .unwrap();

        let Command::Query(args) = cli.command else {
            panic!("expected query subcommand");
        };
        let request = args.into_request().unwrap();
        assert_eq!(request.parameters["state"], ParamValue::String("Texas".into()));
        assert_eq!(request.parameters["limit"], ParamValue::Integer(5));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn query_requires_text() {
        assert!(Cli::try_parse_from(["graphread", "query"]).is_err());
        assert!(Cli::try_parse_from([
            "graphread", "query", "--cypher", "RETURN 1 AS one", "--file", "q.cypher"
        ])
        .is_err());
    }

    #[test]
    fn genres_defaults_to_texas() {
        let cli = Cli::try_parse_from(["graphread", "genres"]).unwrap();
        match cli.command {
            Command::Genres { state, format } => {
                assert_eq!(state, "Texas");
                assert_eq!(format, Format::Lines);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn missing_password_is_reported() {
        let args = ConnectionArgs {
            host: "localhost".into(),
            port: 7687,
            user: "neo4j".into(),
            password: None,
            database: "neo4j".into(),
            scheme: "neo4j".into(),
            fetch_size: 500,
            max_connections: 10,
        };
        assert!(args.into_config().is_err());
    }

    #[test]
    fn pool_size_flag_reaches_config() {
        let cli = Cli::try_parse_from([
            "graphread",
            "--password",
            "secret",
            "--max-connections",
            "3",
            "genres",
        ])
        .unwrap();
        let config = cli.connection.into_config().unwrap();
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.fetch_size, 500);
    }
}

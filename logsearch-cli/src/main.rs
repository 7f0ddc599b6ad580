//! Logsearch command-line client
//!
//! Queries a search backend's HTTP API and prints JSON to stdout.
//!
//! # Example
//!
//! ```bash
//! logsearch --url http://localhost:9200/logs count 'level:error'
//! logsearch --url http://localhost:9200/logs query 'level:error' --limit 5 --fields timestamp,message
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use logsearch::prelude::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Logsearch command-line client
#[derive(Parser, Debug)]
#[command(name = "logsearch")]
#[command(about = "Query a search backend's HTTP API")]
struct Args {
    /// Base URL of the search backend (e.g., http://localhost:9200/logs)
    #[arg(long, env = "LOGSEARCH_URL")]
    url: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Drop requested fields a document does not have instead of printing null
    #[arg(long)]
    omit_missing: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print backend statistics
    Stats,
    /// Count documents matching a query
    Count {
        /// Search expression
        query: String,
    },
    /// Print matching documents, one JSON object per line
    Query {
        /// Search expression
        query: String,
        /// Page size
        #[arg(long)]
        limit: Option<u64>,
        /// Sort clause in field:direction form
        #[arg(long)]
        sort: Option<String>,
        /// Comma-separated fields to keep
        #[arg(long, value_delimiter = ',')]
        fields: Option<Vec<String>>,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_client(args: &Args) -> Result<Client> {
    let mut config = ClientConfig::default();
    config.url.clone_from(&args.url);
    if args.omit_missing {
        config = config.with_missing_fields(MissingFieldPolicy::Omit);
    }

    let mut builder = Client::builder(config).with_event_sink(Arc::new(LoggingEventSink::debug()));

    // The query text is sent verbatim; flags fill in the rest of the descriptor.
    if let Command::Query {
        sort, fields, limit, ..
    } = &args.command
    {
        let sort = sort.clone();
        let fields = fields.clone();
        let limit = *limit;
        builder = builder.with_interpreter(move |input: &str| {
            let mut descriptor = PassthroughInterpreter.parse(input)?;
            if let Some(limit) = limit {
                descriptor = descriptor.with_limit(limit);
            }
            if let Some(ref sort) = sort {
                descriptor = descriptor.with_sort(sort.clone());
            }
            if let Some(ref fields) = fields {
                descriptor = descriptor.with_fields(fields.iter().map(|f| f.trim().to_string()));
            }
            Ok::<_, ParseError>(descriptor)
        });
    }

    builder.build().context("failed to create search client")
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    let client = build_client(&args)?;

    match &args.command {
        Command::Stats => {
            let stats = client.stats().await.context("stats request failed")?;
            print_json(&stats)?;
        }
        Command::Count { query } => {
            let count = client.count(query).await.context("count request failed")?;
            print_json(&count)?;
        }
        Command::Query { query, .. } => {
            let mut handle = client.query(query, QueryOptions::new())?;
            while let Some(event) = handle.next().await {
                match event {
                    QueryEvent::Data(record) => {
                        println!("{}", serde_json::Value::Object(record));
                    }
                    QueryEvent::Error(err) => bail!("query failed: {err}"),
                    QueryEvent::End => break,
                }
            }
        }
    }

    Ok(())
}

use callbus::module::options::RedisOptions;
use callbus::module::store;
use std::str::FromStr;
use structopt::StructOpt;

/// Format in which log lines are emitted
#[derive(Debug)]
pub enum LogFormat {
    /// Human readable, multi-line where needed
    Text,
    /// Human readable, one line per event
    Compact,
    /// Machine readable JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "text" => Ok(LogFormat::Text),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Top-level command line interface
#[derive(Debug, StructOpt)]
#[structopt(name = "callbus", about = "Messaging backbone of the callbus services")]
pub struct MainOptions {
    /// Log level filter, tracing env-filter syntax
    #[structopt(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log: String,

    /// Log output format
    #[structopt(
        long,
        default_value = "text",
        global = true,
        value_name = "text|compact|json"
    )]
    pub log_format: LogFormat,

    /// Port on which a status server exposes the health of all jobs
    #[structopt(long, global = true, value_name = "port")]
    pub status_server: Option<u16>,

    /// What to run
    #[structopt(subcommand)]
    pub command: Command,
}

/// Modules and tools selectable from the command line
#[derive(Debug, StructOpt)]
pub enum Command {
    /// Runs the store service module
    Store(store::Options),
    /// Issues a one-shot request and prints the reply
    Query(QueryOptions),
}

/// Options for the one-shot query tool
#[derive(Debug, StructOpt)]
pub struct QueryOptions {
    /// Redis connection options
    #[structopt(flatten)]
    pub redis: RedisOptions,

    /// Instance identity to issue the call under; freshly generated when omitted.
    /// Reusing an identity of a running process steals its replies!
    #[structopt(long, value_name = "id")]
    pub instance: Option<String>,

    /// Time budget for the call in milliseconds
    #[structopt(long, default_value = "5000", value_name = "ms")]
    pub timeout_ms: u64,

    /// Call to issue
    #[structopt(subcommand)]
    pub call: QueryCall,
}

/// Supported one-shot calls
#[derive(Debug, StructOpt)]
pub enum QueryCall {
    /// Fetches the profile of a store
    StoreInfo {
        /// Identifier of the store
        store_id: u64,
    },
}

use super::super::options::{QueueingOptions, RedisOptions};
use std::path::PathBuf;
use structopt::StructOpt;

/// Options for the store module
#[derive(Debug, StructOpt)]
pub struct Options {
    /// Redis connection options
    #[structopt(flatten)]
    pub redis: RedisOptions,

    /// Queueing identity options
    #[structopt(flatten)]
    pub queueing: QueueingOptions,

    /// Path to the JSON document seeding the store directory
    #[structopt(long, env = "STORE_DIRECTORY", value_name = "path")]
    pub directory: PathBuf,
}

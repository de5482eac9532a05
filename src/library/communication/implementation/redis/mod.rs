//! Trait implementations using [`redis`](::redis) streams

const STREAM_PAYLOAD_KEY: &str = "payload";
const STREAM_ROUTING_KEY: &str = "routing";
const STREAM_ID_NEW: &str = "*";
const STREAM_ID_HEAD: &str = "0";
const STREAM_ID_TAIL: &str = "$";
const STREAM_ID_ADDITIONS: &str = ">";

use thiserror::Error;

mod factory;
mod publisher;
mod queue_entry;
mod queue_provider;

pub use factory::*;
pub use publisher::*;
pub use queue_entry::*;
pub use queue_provider::*;

#[derive(Debug, Error)]
enum RedisQueueError {
    #[error("payload field missing from queue entry")]
    MissingPayload,
}

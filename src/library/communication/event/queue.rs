use super::super::super::BoxedError;
use crate::library::EmptyResult;
use async_trait::async_trait;
use serde::Deserialize;

/// Describes a notification queue and its parameters
#[derive(Debug, PartialEq, Eq)]
pub struct QueueDescriptor {
    key: String,
    limit: usize,
}

impl QueueDescriptor {
    /// Creates a new instance from raw parts
    pub fn new(key: String, limit: usize) -> Self {
        Self { key, limit }
    }

    /// Value which may be used by queue implementations to identify a queue
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Retrieves the key (ref [`key()`](QueueDescriptor::key) method) with an extension added
    pub fn key_with_extension(
        &self,
        extension: &str, /* QueueDescriptorExtension */
    ) -> String {
        format!("{}.{}", self.key, extension)
    }

    /// Maximum number of notifications to be retained in the queue
    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Adds additional information to the key of a queue, specialising it further
///
/// Intended for those rare situations where the key of a queue can not be
/// determined at compile-time. Within this project that is exactly one place:
/// reply queues, whose keys carry the identity of the process instance that
/// owns them. Beware that using arbitrary ephemeral keys leads to resource
/// creep and memory leaks by unused queues, so think twice before finding a
/// second use for this!
pub type QueueDescriptorExtension = String;

/// Hint by which partitioned transports assign entries to partitions
///
/// Transports that shard a queue guarantee publish order only within one
/// routing key. Unpartitioned transports (a single stream is totally ordered
/// anyway) are free to ignore the hint, but must round-trip it unchanged.
pub type RoutingKey = String;

/// Location within the queue
#[derive(Clone)]
pub enum QueueLocation {
    /// Start of the queue (not necessarily the first notification as a queue is limited in length)
    Head,
    /// End of the queue (exclusive of the last message)
    Tail,
}

/// Entry retrieved from a [`Queue`](QueueDescriptor) providing a raw payload
#[async_trait]
pub trait RawQueueEntry {
    /// Payload of the item
    fn payload(&self) -> &[u8];

    /// Acknowledge the item as processed
    async fn acknowledge(&mut self) -> EmptyResult;
}

/// Useful functions for [`QueueEntry`] implementations with default implementations
pub trait QueueEntry: RawQueueEntry {
    /// Attempts to parse the wire-format payload into a given data structure
    fn parse_payload<'a, T>(&'a self) -> Result<T, BoxedError>
    where
        T: Deserialize<'a>;
}

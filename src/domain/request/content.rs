use crate::library::communication::event::{Notification, QueueDescriptor, RoutingKey};
use crate::library::communication::request::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const QUEUE_KEY: &str = "content.create";
const REPLY_QUEUE_KEY: &str = "content.create.reply";
const QUEUE_SIZE: usize = 1_000;

/// Request to register a new piece of content for a store
///
/// Routed by store so creations for the same store arrive in submission order.
/// Handlers are expected to be idempotent — a lost reply causes the caller to
/// repeat the request.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentCreateRequest {
    /// Store the content belongs to
    pub store_id: u64,
    /// Headline of the content
    pub title: String,
    /// Body text
    pub body: String,
    /// Free-form labels used by search and curation
    pub tags: Vec<String>,
}

/// Reply to a [`ContentCreateRequest`]
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentCreateResponse {
    /// Identifier assigned to the new content
    pub content_id: Uuid,
    /// When the content was registered
    pub created_at: DateTime<Utc>,
}

impl Notification for ContentCreateRequest {
    fn queue() -> QueueDescriptor {
        QueueDescriptor::new(QUEUE_KEY.into(), QUEUE_SIZE)
    }
}

impl Request for ContentCreateRequest {
    type Response = ContentCreateResponse;

    fn reply_queue() -> QueueDescriptor {
        QueueDescriptor::new(REPLY_QUEUE_KEY.into(), QUEUE_SIZE)
    }

    fn routing_key(&self) -> Option<RoutingKey> {
        Some(self.store_id.to_string())
    }
}

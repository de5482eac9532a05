use crate::library::communication::event::{Notification, QueueDescriptor, RoutingKey};
use crate::library::communication::request::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const QUEUE_KEY: &str = "publishing.sns";
const REPLY_QUEUE_KEY: &str = "publishing.sns.reply";
const QUEUE_SIZE: usize = 1_000;

/// Social network a piece of content can be pushed to
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum SnsChannel {
    /// Instagram feed post
    Instagram,
    /// YouTube short
    Youtube,
    /// Facebook page post
    Facebook,
}

/// Request to publish a piece of content to a social network
///
/// Routed by content so repeated publications of the same content keep their
/// order (e.g. a delete racing a re-publish).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnsPublishRequest {
    /// Content to publish
    pub content_id: Uuid,
    /// Where to publish it
    pub channel: SnsChannel,
}

/// Reply to a [`SnsPublishRequest`]
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnsPublishResponse {
    /// Where the post ended up
    pub post_url: String,
    /// When the network accepted it
    pub published_at: DateTime<Utc>,
}

impl Notification for SnsPublishRequest {
    fn queue() -> QueueDescriptor {
        QueueDescriptor::new(QUEUE_KEY.into(), QUEUE_SIZE)
    }
}

impl Request for SnsPublishRequest {
    type Response = SnsPublishResponse;

    fn reply_queue() -> QueueDescriptor {
        QueueDescriptor::new(REPLY_QUEUE_KEY.into(), QUEUE_SIZE)
    }

    fn routing_key(&self) -> Option<RoutingKey> {
        Some(self.content_id.to_string())
    }
}

use crate::library::communication::event::{Notification, QueueDescriptor, RoutingKey};
use crate::library::communication::request::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const QUEUE_KEY: &str = "media.upload-ack";
const REPLY_QUEUE_KEY: &str = "media.upload-ack.reply";
const QUEUE_SIZE: usize = 1_000;

/// Request for a signed upload acknowledgement for a rendered video
///
/// The media service owns the object store credentials; everybody else asks it
/// for a pre-signed URL instead of touching the store directly.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadAckRequest {
    /// Content the upload belongs to
    pub content_id: Uuid,
    /// Object key the upload will live under
    pub object_key: String,
    /// Size of the upload in bytes
    pub byte_size: u64,
}

/// Reply to an [`UploadAckRequest`]
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadAckResponse {
    /// Pre-signed URL the upload may be PUT to
    pub upload_url: String,
    /// When the URL stops being valid
    pub expires_at: DateTime<Utc>,
}

impl Notification for UploadAckRequest {
    fn queue() -> QueueDescriptor {
        QueueDescriptor::new(QUEUE_KEY.into(), QUEUE_SIZE)
    }
}

impl Request for UploadAckRequest {
    type Response = UploadAckResponse;

    fn reply_queue() -> QueueDescriptor {
        QueueDescriptor::new(REPLY_QUEUE_KEY.into(), QUEUE_SIZE)
    }

    fn routing_key(&self) -> Option<RoutingKey> {
        Some(self.content_id.to_string())
    }
}

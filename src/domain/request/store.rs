use crate::library::communication::event::{Notification, QueueDescriptor, RoutingKey};
use crate::library::communication::request::Request;
use serde::{Deserialize, Serialize};

const QUEUE_KEY: &str = "store.info";
const REPLY_QUEUE_KEY: &str = "store.info.reply";
const QUEUE_SIZE: usize = 1_000;

/// Request for the profile of one store
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreInfoRequest {
    /// Unique identifier of the store
    pub store_id: u64,
}

/// Reply to a [`StoreInfoRequest`]
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct StoreInfoResponse {
    /// Display name of the store
    pub name: String,
    /// Line of business the store operates in
    pub industry: String,
    /// Street address, where the store maintains one
    pub address: Option<String>,
}

impl Notification for StoreInfoRequest {
    fn queue() -> QueueDescriptor {
        QueueDescriptor::new(QUEUE_KEY.into(), QUEUE_SIZE)
    }
}

impl Request for StoreInfoRequest {
    type Response = StoreInfoResponse;

    fn reply_queue() -> QueueDescriptor {
        QueueDescriptor::new(REPLY_QUEUE_KEY.into(), QUEUE_SIZE)
    }

    fn routing_key(&self) -> Option<RoutingKey> {
        Some(self.store_id.to_string())
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn route_by_store() {
        let request = StoreInfoRequest { store_id: 42 };
        assert_eq!(request.routing_key().as_deref(), Some("42"));
    }

    #[test]
    fn round_trip_through_json() {
        let response = StoreInfoResponse {
            name: "Cafe A".into(),
            industry: "F&B".into(),
            address: None,
        };

        let serialized = serde_json::to_string(&response).unwrap();
        let deserialized: StoreInfoResponse = serde_json::from_str(&serialized).unwrap();

        assert_eq!(response, deserialized);
    }
}

use super::super::error::RemoteError;
use super::super::event::{Notification, QueueDescriptor, QueueDescriptorExtension, RoutingKey};
use super::{CorrelationId, Request};
use serde::{Deserialize, Serialize};

/// Wire envelope wrapping a request payload
///
/// Everything the answering side needs beyond the payload itself travels here:
/// the correlation token the reply has to carry back and the reply extension
/// naming the queue owned by the issuing instance.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(bound = "")]
pub struct RequestEnvelope<R: Request> {
    /// Token the reply has to carry back
    pub correlation: CorrelationId,
    /// Reply queue extension identifying the issuing instance
    pub reply_to: QueueDescriptorExtension,
    /// Partition hint, usually the business entity the payload concerns
    pub routing: Option<RoutingKey>,
    /// Actual request data
    pub payload: R,
}

impl<R: Request> RequestEnvelope<R> {
    /// Wraps a payload for transmission, deriving the routing hint from the payload
    pub fn new(
        correlation: CorrelationId,
        payload: R,
        reply_to: QueueDescriptorExtension,
    ) -> Self {
        let routing = payload.routing_key();

        Self {
            correlation,
            reply_to,
            routing,
            payload,
        }
    }
}

impl<R: Request> Notification for RequestEnvelope<R> {
    fn queue() -> QueueDescriptor {
        R::queue()
    }
}

/// Outcome of processing one request
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "body", rename_all = "snake_case")]
pub enum ReplyOutcome<T> {
    /// The handler produced a reply payload
    Success(T),
    /// The handler rejected the request or failed while processing it
    Failure(RemoteError),
}

impl<T> ReplyOutcome<T> {
    /// Converts the outcome into a std [`Result`]
    pub fn into_result(self) -> Result<T, RemoteError> {
        match self {
            ReplyOutcome::Success(value) => Ok(value),
            ReplyOutcome::Failure(error) => Err(error),
        }
    }
}

/// Wire envelope carrying the outcome of a request back to its issuer
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(bound = "")]
pub struct ReplyEnvelope<R: Request> {
    /// Token of the originating request
    pub correlation: CorrelationId,
    /// Result produced by the remote handler
    pub outcome: ReplyOutcome<R::Response>,
}

impl<R: Request> ReplyEnvelope<R> {
    /// Creates an envelope carrying a successful reply
    pub fn success(correlation: CorrelationId, response: R::Response) -> Self {
        Self {
            correlation,
            outcome: ReplyOutcome::Success(response),
        }
    }

    /// Creates an envelope carrying a handler failure
    pub fn failure(correlation: CorrelationId, error: RemoteError) -> Self {
        Self {
            correlation,
            outcome: ReplyOutcome::Failure(error),
        }
    }
}

impl<R: Request> Notification for ReplyEnvelope<R> {
    fn queue() -> QueueDescriptor {
        R::reply_queue()
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct MockRequest {
        entity: u64,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct MockResponse {
        label: String,
    }

    impl Notification for MockRequest {
        fn queue() -> QueueDescriptor {
            QueueDescriptor::new("mock".into(), 42)
        }
    }

    impl Request for MockRequest {
        type Response = MockResponse;

        fn reply_queue() -> QueueDescriptor {
            QueueDescriptor::new("mock.reply".into(), 42)
        }

        fn routing_key(&self) -> Option<RoutingKey> {
            Some(self.entity.to_string())
        }
    }

    #[test]
    fn round_trip_request_envelopes() {
        let envelope = RequestEnvelope::new(
            CorrelationId::generate(),
            MockRequest { entity: 7 },
            "mock-instance".into(),
        );

        let serialized = serde_json::to_vec(&envelope).unwrap();
        let deserialized: RequestEnvelope<MockRequest> =
            serde_json::from_slice(&serialized).unwrap();

        assert_eq!(envelope, deserialized);
    }

    #[test]
    fn round_trip_reply_envelopes() {
        let success = ReplyEnvelope::<MockRequest>::success(
            CorrelationId::generate(),
            MockResponse {
                label: "hello".into(),
            },
        );
        let failure = ReplyEnvelope::<MockRequest>::failure(
            CorrelationId::generate(),
            RemoteError::from_message("nope"),
        );

        for envelope in [success, failure] {
            let serialized = serde_json::to_vec(&envelope).unwrap();
            let deserialized: ReplyEnvelope<MockRequest> =
                serde_json::from_slice(&serialized).unwrap();

            assert_eq!(envelope, deserialized);
        }
    }

    #[test]
    fn derive_routing_from_the_payload() {
        let envelope = RequestEnvelope::new(
            CorrelationId::generate(),
            MockRequest { entity: 7 },
            "mock-instance".into(),
        );

        assert_eq!(envelope.routing.as_deref(), Some("7"));
    }

    #[test]
    fn tag_reply_outcomes_on_the_wire() {
        let envelope = ReplyEnvelope::<MockRequest>::success(
            CorrelationId::generate(),
            MockResponse {
                label: "hello".into(),
            },
        );

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["outcome"]["status"], "success");
        assert_eq!(value["outcome"]["body"]["label"], "hello");
    }
}

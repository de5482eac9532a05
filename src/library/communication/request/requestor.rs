use super::super::super::BoxedError;
use super::super::error::RemoteError;
use super::super::event::{NotificationPublisher, QueueDescriptorExtension};
use super::{CorrelationId, RegisterError, ReplyRegistry, Request, RequestEnvelope};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Failure modes of one request/reply call
///
/// Callers branch on the variant to decide whether retrying makes sense, see
/// [`is_retryable`](RequestError::is_retryable).
#[derive(Error, Debug)]
pub enum RequestError {
    /// No reply arrived before the caller's deadline. The waiter has been removed,
    /// a reply arriving later is discarded, and the whole call may be retried.
    #[error("no reply arrived before the deadline")]
    TimedOut,
    /// Handing the request to the broker failed. No waiter is left behind.
    #[error("publishing the request failed")]
    PublishFailed(#[source] BoxedError),
    /// The remote handler processed the request and answered with an error.
    /// This is a decision of the remote side, not a transport problem.
    #[error("remote handler rejected the request")]
    Rejected(#[source] RemoteError),
    /// The local endpoint is going away and drained all in-flight calls
    #[error("the endpoint is shutting down")]
    ShuttingDown,
    /// The registry already holds as many in-flight calls as configured
    #[error("too many requests are already awaiting replies")]
    TooManyPending,
}

impl RequestError {
    /// Whether the call may be repeated with a chance of success
    ///
    /// Transport level failures are transient and worth a retry (with backoff).
    /// A rejection is not: the remote side saw the request and said no.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RequestError::Rejected(_))
    }
}

/// Handler for issuing requests and awaiting their replies
#[async_trait]
pub trait Requestor<R: Request> {
    /// Sends out a request and waits for the matching reply or the given timeout,
    /// whichever comes first
    async fn request(&self, payload: R, timeout: Duration) -> Result<R::Response, RequestError>;
}

/// [`Requestor`] implementation correlating calls through a [`ReplyRegistry`]
///
/// Instances derived from the same channel share its registry, so any number of
/// them may be created cheaply (e.g. one per HTTP worker).
pub struct CorrelatedRequestor<R: Request, P> {
    registry: Arc<ReplyRegistry<R>>,
    publisher: P,
    reply_to: QueueDescriptorExtension,
}

impl<R, P> CorrelatedRequestor<R, P>
where
    R: Request,
    P: NotificationPublisher,
{
    /// Creates a new instance from raw parts
    pub fn new(
        registry: Arc<ReplyRegistry<R>>,
        publisher: P,
        reply_to: QueueDescriptorExtension,
    ) -> Self {
        Self {
            registry,
            publisher,
            reply_to,
        }
    }
}

#[async_trait]
impl<R, P> Requestor<R> for CorrelatedRequestor<R, P>
where
    R: Request + Send + Sync,
    P: NotificationPublisher + Send + Sync,
{
    async fn request(&self, payload: R, timeout: Duration) -> Result<R::Response, RequestError> {
        let deadline = Instant::now() + timeout;

        // Register before publishing so a reply racing the publish cannot get lost
        let pending = loop {
            match self.registry.clone().register(CorrelationId::generate(), deadline) {
                Ok(pending) => break pending,
                Err(RegisterError::TokenCollision) => continue,
                Err(RegisterError::CapacityExhausted) => {
                    return Err(RequestError::TooManyPending)
                }
            }
        };

        let envelope = RequestEnvelope::new(pending.correlation(), payload, self.reply_to.clone());
        let routing = envelope
            .routing
            .clone()
            .unwrap_or_else(|| envelope.correlation.to_string());

        if let Err(error) = self.publisher.publish_keyed(&envelope, routing).await {
            // Dropping the pending handle deregisters the waiter, nothing leaks
            return Err(RequestError::PublishFailed(error));
        }

        pending.outcome().await
    }
}

#[cfg(test)]
mod does {
    use super::super::super::event::{
        Notification, QueueDescriptor, QueueDescriptorExtension, RawNotificationPublisher,
        RoutingKey,
    };
    use super::super::super::implementation::json::JsonNotificationPublisher;
    use super::super::ReplyOutcome;
    use super::*;
    use crate::library::EmptyResult;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use std::sync::Mutex;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct MockRequest {
        value: u64,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct MockResponse {
        doubled: u64,
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
    }

    /// Publisher that records every raw payload it is handed
    #[derive(Clone, Default)]
    struct CapturingPublisher {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    #[async_trait]
    impl RawNotificationPublisher for CapturingPublisher {
        async fn publish_raw(
            &self,
            data: &[u8],
            _descriptor: QueueDescriptor,
            _extension: Option<QueueDescriptorExtension>,
            _routing: Option<RoutingKey>,
        ) -> EmptyResult {
            self.sent.lock().unwrap().push(data.to_vec());
            Ok(())
        }
    }

    impl JsonNotificationPublisher for CapturingPublisher {}

    /// Publisher whose broker is permanently unreachable
    #[derive(Clone, Default)]
    struct UnreachablePublisher;

    #[async_trait]
    impl RawNotificationPublisher for UnreachablePublisher {
        async fn publish_raw(
            &self,
            _data: &[u8],
            _descriptor: QueueDescriptor,
            _extension: Option<QueueDescriptorExtension>,
            _routing: Option<RoutingKey>,
        ) -> EmptyResult {
            Err("connection refused".into())
        }
    }

    impl JsonNotificationPublisher for UnreachablePublisher {}

    #[tokio::test]
    async fn resolve_calls_through_the_registry() {
        let registry = Arc::new(ReplyRegistry::<MockRequest>::new(16));
        let publisher = CapturingPublisher::default();
        let requestor = CorrelatedRequestor::new(
            registry.clone(),
            publisher.clone(),
            "mock-instance".into(),
        );

        let call = tokio::spawn(async move {
            requestor
                .request(MockRequest { value: 21 }, Duration::from_secs(5))
                .await
        });

        // Wait for the envelope to be published, then answer it by hand
        let envelope: RequestEnvelope<MockRequest> = loop {
            let sent = publisher.sent.lock().unwrap().first().cloned();
            match sent {
                Some(bytes) => break serde_json::from_slice(&bytes).unwrap(),
                None => tokio::time::sleep(Duration::from_millis(5)).await,
            }
        };

        assert_eq!(envelope.payload, MockRequest { value: 21 });
        assert_eq!(envelope.reply_to, "mock-instance");

        assert!(registry.resolve(
            envelope.correlation,
            ReplyOutcome::Success(MockResponse { doubled: 42 })
        ));

        let response = call.await.unwrap().unwrap();
        assert_eq!(response, MockResponse { doubled: 42 });
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn leave_no_waiter_behind_when_publishing_fails() {
        let registry = Arc::new(ReplyRegistry::<MockRequest>::new(16));
        let requestor = CorrelatedRequestor::new(
            registry.clone(),
            UnreachablePublisher,
            "mock-instance".into(),
        );

        let result = requestor
            .request(MockRequest { value: 1 }, Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(RequestError::PublishFailed(_))));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn fail_fast_beyond_the_pending_limit() {
        let registry = Arc::new(ReplyRegistry::<MockRequest>::new(1));
        let _occupied = registry
            .clone()
            .register(
                CorrelationId::generate(),
                Instant::now() + Duration::from_secs(10),
            )
            .unwrap();

        let requestor = CorrelatedRequestor::new(
            registry.clone(),
            CapturingPublisher::default(),
            "mock-instance".into(),
        );

        let result = requestor
            .request(MockRequest { value: 1 }, Duration::from_secs(5))
            .await;

        assert!(matches!(result, Err(RequestError::TooManyPending)));
    }

    #[test]
    fn classify_retryability() {
        assert!(RequestError::TimedOut.is_retryable());
        assert!(RequestError::ShuttingDown.is_retryable());
        assert!(RequestError::TooManyPending.is_retryable());
        assert!(RequestError::PublishFailed("broken".into()).is_retryable());
        assert!(!RequestError::Rejected(RemoteError::from_message("no")).is_retryable());
    }
}

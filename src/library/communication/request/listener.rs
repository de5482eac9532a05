use super::super::event::Consumer;
use super::{ReplyEnvelope, ReplyRegistry, Request};
use crate::library::EmptyResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Consumer feeding incoming replies into a [`ReplyRegistry`]
///
/// Runs on the reply queue of one call type under the consumer group owned by
/// this process instance. Replies whose correlation token matches no waiter are
/// discarded silently — they belong to callers that timed out, got cancelled or
/// are duplicates of an already processed reply.
pub struct ReplyListener<R: Request> {
    registry: Arc<ReplyRegistry<R>>,
}

impl<R: Request> ReplyListener<R> {
    /// Creates a new instance resolving waiters of the given registry
    pub fn new(registry: Arc<ReplyRegistry<R>>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl<R> Consumer for ReplyListener<R>
where
    R: Request + Send + Sync,
{
    type Notification = ReplyEnvelope<R>;

    async fn consume(&self, reply: Self::Notification) -> EmptyResult {
        if !self.registry.resolve(reply.correlation, reply.outcome) {
            debug!(
                correlation = %reply.correlation,
                "Discarding reply with no pending waiter"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod does {
    use super::super::super::event::{Notification, QueueDescriptor};
    use super::super::{CorrelationId, ReplyOutcome, RequestError};
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct MockRequest;

    impl Notification for MockRequest {
        fn queue() -> QueueDescriptor {
            QueueDescriptor::new("mock".into(), 42)
        }
    }

    impl Request for MockRequest {
        type Response = u64;

        fn reply_queue() -> QueueDescriptor {
            QueueDescriptor::new("mock.reply".into(), 42)
        }
    }

    #[tokio::test]
    async fn tolerate_orphan_replies() {
        let registry = Arc::new(ReplyRegistry::<MockRequest>::new(16));
        let listener = ReplyListener::new(registry.clone());

        let pending = registry
            .clone()
            .register(
                CorrelationId::generate(),
                Instant::now() + Duration::from_secs(10),
            )
            .unwrap();

        // A reply nobody asked for must neither fail nor touch the unrelated waiter
        let orphan = ReplyEnvelope::<MockRequest>::success(CorrelationId::generate(), 7);
        listener.consume(orphan).await.unwrap();

        assert_eq!(registry.len(), 1);

        let expected = ReplyEnvelope::<MockRequest>::success(pending.correlation(), 42);
        listener.consume(expected).await.unwrap();

        assert_eq!(pending.outcome().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn translate_failure_outcomes() {
        let registry = Arc::new(ReplyRegistry::<MockRequest>::new(16));
        let listener = ReplyListener::new(registry.clone());

        let pending = registry
            .clone()
            .register(
                CorrelationId::generate(),
                Instant::now() + Duration::from_secs(10),
            )
            .unwrap();

        let reply = ReplyEnvelope::<MockRequest> {
            correlation: pending.correlation(),
            outcome: ReplyOutcome::Failure(
                crate::library::communication::RemoteError::from_message("out of stock"),
            ),
        };
        listener.consume(reply).await.unwrap();

        assert!(matches!(
            pending.outcome().await,
            Err(RequestError::Rejected(_))
        ));
    }
}

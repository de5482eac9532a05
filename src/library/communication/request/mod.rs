//! Request and reply messaging on top of consumer-group queues
//!
//! Queues only know fire-and-forget delivery, yet services regularly need a
//! synchronous-looking answer from another service ("give me the info for store
//! X"). This module builds that call semantic out of two queue subscriptions and
//! a process-local table:
//!
//! 1. A [`Requestor`] wraps the payload into a [`RequestEnvelope`] carrying a
//!    fresh [`CorrelationId`] and the reply extension of its instance, registers
//!    a waiter in the [`ReplyRegistry`] and publishes the envelope.
//! 2. Any instance of the answering service — they all share one consumer group
//!    on the request queue — picks it up. Its [`Responder`] runs the business
//!    handler and publishes a [`ReplyEnvelope`] with the same token to the reply
//!    queue named by the request.
//! 3. The issuing instance alone consumes that reply queue (its consumer group is
//!    derived from its [`InstanceIdentity`](super::event::InstanceIdentity)), and
//!    its [`ReplyListener`] resolves the registered waiter.
//!
//! Calls fail in well-defined ways — see [`RequestError`] — and every waiter is
//! resolved exactly once: by a reply, by the deadline sweep, by caller
//! cancellation or by a shutdown drain, whichever happens first. An
//! [`RpcChannel`] bundles the pieces belonging to one call type.

mod channel;
mod correlation;
mod envelope;
mod listener;
mod registry;
mod request;
mod requestor;
mod responder;

pub use channel::*;
pub use correlation::*;
pub use envelope::*;
pub use listener::*;
pub use registry::*;
pub use request::*;
pub use requestor::*;
pub use responder::*;

#[cfg(test)]
mod does {
    use super::super::event::{
        ConsumerExt, ConsumerGroupDescriptor, InstanceIdentity, Notification,
        NotificationPublisher, QueueDescriptor, QueueProvider, RawNotificationPublisher,
        RoutingKey,
    };
    use super::super::implementation::memory::MemoryBroker;
    use super::*;
    use crate::library::BoxedError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct LookupRequest {
        store_id: u64,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
    struct LookupProfile {
        name: String,
        industry: String,
    }

    impl Notification for LookupRequest {
        fn queue() -> QueueDescriptor {
            QueueDescriptor::new("lookup".into(), 100)
        }
    }

    impl Request for LookupRequest {
        type Response = LookupProfile;

        fn reply_queue() -> QueueDescriptor {
            QueueDescriptor::new("lookup.reply".into(), 100)
        }

        fn routing_key(&self) -> Option<RoutingKey> {
            Some(self.store_id.to_string())
        }
    }

    struct Directory;

    #[async_trait]
    impl RequestProcessor for Directory {
        type Request = LookupRequest;

        async fn process(&self, request: LookupRequest) -> Result<LookupProfile, BoxedError> {
            match request.store_id {
                42 => Ok(LookupProfile {
                    name: "Cafe A".into(),
                    industry: "F&B".into(),
                }),
                id => Err(format!("store {} does not exist", id).into()),
            }
        }
    }

    /// Boots the requester side: reply subscription first, then the deadline sweep.
    /// Returns once the subscription is established so sends cannot outrun it.
    async fn start_requester(broker: &MemoryBroker, instance: &str) -> RpcChannel<LookupRequest> {
        let identity = InstanceIdentity::new("gateway", instance);
        let config = RpcChannelConfig {
            sweep_period: Duration::from_millis(10),
            ..RpcChannelConfig::default()
        };
        let channel = RpcChannel::with_config(identity, config);

        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let listener = channel.listener();
        let group = channel.consumer_group();
        let consumer = channel.identity().to_string();
        let extension = Some(channel.reply_extension());
        let provider = broker.clone();

        tokio::spawn(async move {
            let stream = provider
                .consume(
                    LookupRequest::reply_queue(),
                    &group,
                    &consumer,
                    10,
                    None,
                    &extension,
                )
                .await
                .unwrap();

            ready_tx.send(()).ok();
            listener.consume_stream(stream).await.ok();
        });

        let sweeper = channel.clone();
        tokio::spawn(async move { sweeper.enforce_deadlines().await });

        ready_rx.await.unwrap();
        channel
    }

    fn start_responder(broker: &MemoryBroker) {
        let responder = Responder::new(Directory, broker.clone());
        let provider = broker.clone();

        tokio::spawn(async move {
            responder
                .consume_queue(
                    provider,
                    &ConsumerGroupDescriptor::shared("directory"),
                    "responder-1",
                    &None,
                )
                .await
                .ok();
        });
    }

    #[tokio::test]
    async fn answer_lookups_end_to_end() {
        let broker = MemoryBroker::default();
        start_responder(&broker);
        let channel = start_requester(&broker, "a").await;
        let requestor = channel.requestor(broker.clone());

        let profile = requestor
            .request(LookupRequest { store_id: 42 }, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(
            profile,
            LookupProfile {
                name: "Cafe A".into(),
                industry: "F&B".into()
            }
        );
        assert_eq!(channel.pending(), 0);
    }

    #[tokio::test]
    async fn surface_rejections_before_the_deadline() {
        let broker = MemoryBroker::default();
        start_responder(&broker);
        let channel = start_requester(&broker, "a").await;
        let requestor = channel.requestor(broker.clone());

        let started = Instant::now();
        let result = requestor
            .request(LookupRequest { store_id: 7 }, Duration::from_secs(10))
            .await;

        assert!(matches!(result, Err(RequestError::Rejected(_))));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(channel.pending(), 0);
    }

    #[tokio::test]
    async fn time_out_without_a_responder() {
        let broker = MemoryBroker::default();
        let channel = start_requester(&broker, "a").await;
        let requestor = channel.requestor(broker.clone());

        let started = Instant::now();
        let result = requestor
            .request(LookupRequest { store_id: 42 }, Duration::from_millis(100))
            .await;
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(RequestError::TimedOut)));
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(500));
        assert_eq!(channel.pending(), 0);
    }

    #[tokio::test]
    async fn keep_replies_between_instances_separate() {
        let broker = MemoryBroker::default();
        start_responder(&broker);
        let channel_a = start_requester(&broker, "a").await;
        let channel_b = start_requester(&broker, "b").await;
        let requestor_a = channel_a.requestor(broker.clone());
        let requestor_b = channel_b.requestor(broker.clone());

        let (a, b) = tokio::join!(
            requestor_a.request(LookupRequest { store_id: 42 }, Duration::from_secs(1)),
            requestor_b.request(LookupRequest { store_id: 42 }, Duration::from_secs(1)),
        );

        assert_eq!(a.unwrap().name, "Cafe A");
        assert_eq!(b.unwrap().name, "Cafe A");
        assert_eq!(channel_a.pending(), 0);
        assert_eq!(channel_b.pending(), 0);

        // Each instance received exactly its own reply, on its own queue
        assert_eq!(broker.published("lookup.reply.gateway-a"), 1);
        assert_eq!(broker.published("lookup.reply.gateway-b"), 1);
    }

    #[tokio::test]
    async fn discard_orphan_replies() {
        let broker = MemoryBroker::default();
        let channel = start_requester(&broker, "a").await;

        // A reply whose caller is long gone arrives out of nowhere
        let orphan = ReplyEnvelope::<LookupRequest>::success(
            CorrelationId::generate(),
            LookupProfile {
                name: "Ghost".into(),
                industry: "None".into(),
            },
        );
        broker
            .publish_with_extension(&orphan, channel.reply_extension())
            .await
            .unwrap();
        sleep(Duration::from_millis(50)).await;

        // The listener shrugged it off and keeps working
        start_responder(&broker);
        let requestor = channel.requestor(broker.clone());
        let profile = requestor
            .request(LookupRequest { store_id: 42 }, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(profile.name, "Cafe A");
        assert_eq!(channel.pending(), 0);
    }

    #[tokio::test]
    async fn skip_poison_replies() {
        let broker = MemoryBroker::default();
        let channel = start_requester(&broker, "a").await;

        broker
            .publish_raw(
                b"definitely not an envelope",
                LookupRequest::reply_queue(),
                Some(channel.reply_extension()),
                None,
            )
            .await
            .unwrap();
        sleep(Duration::from_millis(50)).await;

        start_responder(&broker);
        let requestor = channel.requestor(broker.clone());
        let profile = requestor
            .request(LookupRequest { store_id: 42 }, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(profile.name, "Cafe A");
    }

    #[tokio::test]
    async fn drain_every_pending_call_at_shutdown() {
        let broker = MemoryBroker::default();
        let channel = start_requester(&broker, "a").await;

        let calls: Vec<_> = (0..3)
            .map(|_| {
                let requestor = channel.requestor(broker.clone());
                tokio::spawn(async move {
                    requestor
                        .request(LookupRequest { store_id: 42 }, Duration::from_secs(10))
                        .await
                })
            })
            .collect();

        // Wait until all three are registered
        let patience = Instant::now();
        while channel.pending() < 3 {
            assert!(patience.elapsed() < Duration::from_secs(1));
            sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(channel.drain(), 3);
        assert_eq!(channel.pending(), 0);

        for call in calls {
            let result = call.await.unwrap();
            assert!(matches!(result, Err(RequestError::ShuttingDown)));
        }
    }
}

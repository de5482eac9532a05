use super::super::super::event::{
    QueueDescriptor, QueueDescriptorExtension, RawNotificationPublisher, RoutingKey,
};
use super::super::json::JsonNotificationPublisher;
use super::{BoxedConnection, RedisConnectionVariant, RedisFactory};
use super::{STREAM_ID_NEW, STREAM_PAYLOAD_KEY, STREAM_ROUTING_KEY};
use crate::library::EmptyResult;
use async_trait::async_trait;
use redis::streams::StreamMaxlen;
use redis::AsyncCommands;

/// Notification publisher using [`XADD`](https://redis.io/commands/xadd)
///
/// A single redis stream is totally ordered, so the routing hint has no influence
/// on delivery here. It is stored as an additional entry field and travels along
/// unchanged for transports (or tooling) that care.
#[derive(Clone)]
pub struct RedisPublisher<F: RedisFactory> {
    factory: F,
}

impl<F> RedisPublisher<F>
where
    F: RedisFactory,
{
    /// Creates a new instance from an existing connection factory
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<F> JsonNotificationPublisher for RedisPublisher<F> where F: RedisFactory + Send + Sync {}

#[async_trait]
impl<F> RawNotificationPublisher for RedisPublisher<F>
where
    F: RedisFactory + Send + Sync,
{
    async fn publish_raw(
        &self,
        data: &[u8],
        descriptor: QueueDescriptor,
        extension: Option<QueueDescriptorExtension>,
        routing: Option<RoutingKey>,
    ) -> EmptyResult {
        let limit = StreamMaxlen::Approx(descriptor.limit());
        let key = match extension {
            Some(extension) => descriptor.key_with_extension(&extension),
            None => descriptor.key().to_owned(),
        };

        let mut fields: Vec<(&str, &[u8])> = vec![(STREAM_PAYLOAD_KEY, data)];
        if let Some(routing) = routing.as_deref() {
            fields.push((STREAM_ROUTING_KEY, routing.as_bytes()));
        }

        let mut con = BoxedConnection(
            self.factory
                .connection(RedisConnectionVariant::Multiplexed)
                .await?,
        );

        con.xadd_maxlen::<_, _, _, _, ()>(key, limit, STREAM_ID_NEW, &fields)
            .await?;

        Ok(())
    }
}

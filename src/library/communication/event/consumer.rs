use super::super::super::{BoxedError, EmptyResult};
use super::Notification;
use super::{ConsumerGroupDescriptor, QueueDescriptorExtension};
use super::{QueueEntry, QueueProvider};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::any::type_name;
use std::time::Duration;
use tracing::warn;

const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_CONCURRENCY: usize = DEFAULT_BATCH_SIZE;
const DEFAULT_IDLE_TIMEOUT: Option<Duration> = None;

/// Entity which may consume and process [`Notifications`](Notification)
#[async_trait]
pub trait Consumer {
    /// Notification to consume
    type Notification: Notification;

    /// Processes an event notification and returns whether it succeeded or failed
    async fn consume(&self, notification: Self::Notification) -> EmptyResult;
}

/// Helper functions to aid the consumption of messages
#[async_trait]
pub trait ConsumerExt {
    /// Consumes notifications from a queue using the given provider and acknowledges
    /// those that have been successfully processed.
    async fn consume_queue<Q>(
        &self,
        provider: Q,
        group: &ConsumerGroupDescriptor,
        consumer: &str, // &ConsumerIdentifier
        extension: &Option<QueueDescriptorExtension>,
    ) -> EmptyResult
    where
        Q: QueueProvider + Send + Sync;

    /// Drives an already established entry stream
    ///
    /// Split out of [`consume_queue`](ConsumerExt::consume_queue) so callers that need
    /// to act between subscription and consumption (e.g. signalling readiness once the
    /// queue is guaranteed to retain entries for them) can do so.
    async fn consume_stream<'a, E>(
        &self,
        stream: BoxStream<'a, Result<E, BoxedError>>,
    ) -> EmptyResult
    where
        E: QueueEntry + Send + Sync + 'a;
}

#[async_trait]
impl<C> ConsumerExt for C
where
    C: Consumer + Send + Sync,
    C::Notification: DeserializeOwned + Send + Sync,
{
    async fn consume_queue<Q>(
        &self,
        provider: Q,
        group: &ConsumerGroupDescriptor,
        consumer: &str, // &ConsumerIdentifier
        extension: &Option<QueueDescriptorExtension>,
    ) -> EmptyResult
    where
        Q: QueueProvider + Send + Sync,
    {
        let stream = provider
            .consume(
                C::Notification::queue(),
                group,
                consumer,
                DEFAULT_BATCH_SIZE,
                DEFAULT_IDLE_TIMEOUT,
                extension,
            )
            .await?;

        self.consume_stream(stream).await
    }

    async fn consume_stream<'a, E>(
        &self,
        stream: BoxStream<'a, Result<E, BoxedError>>,
    ) -> EmptyResult
    where
        E: QueueEntry + Send + Sync + 'a,
    {
        stream
            .for_each_concurrent(Some(DEFAULT_CONCURRENCY), |item| async move {
                match item {
                    Ok(mut entry) => match entry.parse_payload::<C::Notification>() {
                        Ok(notification) => match self.consume(notification).await {
                            Ok(_) => {
                                if let Err(error) = entry.acknowledge().await {
                                    warn!(
                                        "Failed to acknowledge {}: {}",
                                        type_name::<C::Notification>(),
                                        error
                                    )
                                }
                            }
                            // Not acknowledged, the entry stays pending and is redelivered
                            Err(error) => warn!(
                                "Failed to consume {}: {}",
                                type_name::<C::Notification>(),
                                error
                            ),
                        },
                        Err(error) => {
                            // Poison entry. Acknowledge it anyway so it can not wedge
                            // the consumer group for every entry queued behind it.
                            warn!(
                                "Failed to deserialize {}, skipping entry: {}",
                                type_name::<C::Notification>(),
                                error
                            );

                            if let Err(error) = entry.acknowledge().await {
                                warn!(
                                    "Failed to acknowledge skipped {}: {}",
                                    type_name::<C::Notification>(),
                                    error
                                )
                            }
                        }
                    },
                    Err(error) => warn!(
                        "Failed to receive notification {}: {}",
                        type_name::<C::Notification>(),
                        error
                    ),
                }
            })
            .await;

        Ok(())
    }
}

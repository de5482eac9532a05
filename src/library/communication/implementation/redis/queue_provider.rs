use super::super::super::event::{
    ConsumerGroupDescriptor, QueueDescriptor, QueueDescriptorExtension, QueueLocation,
    QueueProvider,
};
use super::{
    BoxedConnection, RedisConnectionVariant, RedisFactory, RedisQueueEntry, STREAM_ID_ADDITIONS,
    STREAM_ID_HEAD, STREAM_ID_TAIL,
};
use crate::library::BoxedError;
use async_trait::async_trait;
use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use redis::aio::ConnectionLike;
use redis::streams::StreamId;
use redis::streams::StreamReadOptions;
use redis::streams::StreamReadReply;
use redis::AsyncCommands;
use redis::RedisResult;
use std::convert::TryInto;
use std::time::Duration;
use tracing::error;

/// Queue provider implementation using [Redis Streams](https://redis.io/topics/streams-intro)
pub struct RedisQueueProvider<F: RedisFactory + Send + Sync> {
    factory: F,
}

impl<F: RedisFactory + Send + Sync> RedisQueueProvider<F> {
    /// Creates a new instance with a given [`RedisFactory`]
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl<F> QueueProvider for RedisQueueProvider<F>
where
    F: RedisFactory + Send + Sync,
{
    type Entry = RedisQueueEntry<BoxedConnection>;

    /// Consumes a redis stream data structure using the following steps:
    ///
    /// 1. Create the stream and/or consumer group if it does not exist
    /// 2. Stream entries from the PEL until the queue head is reached
    /// 3. Wait for and stream new entries in a blocking manner
    /// 4. Bail if no message has been received within `idle_timeout` or block indefinitely
    async fn consume(
        &self,
        queue: QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        consumer: &str, // &ConsumerIdentifier
        batch_size: usize,
        idle_timeout: Option<Duration>,
        extension: &Option<QueueDescriptorExtension>,
    ) -> Result<BoxStream<Result<Self::Entry, BoxedError>>, BoxedError> {
        let key = match extension {
            Some(extension) => queue.key_with_extension(extension),
            None => queue.key().to_owned(),
        };

        // Dedicated connection for the blocking XREADGROUP command
        let mut con = BoxedConnection(
            self.factory
                .connection(RedisConnectionVariant::Owned)
                .await?,
        );

        create_consumer_group(&mut con, &key, group).await;

        let block_duration = idle_timeout
            .map(|d| d.as_millis().try_into().unwrap_or_default())
            .unwrap_or_default();

        let read_options = StreamReadOptions::default()
            .group(group.identifier().to_string(), consumer)
            .count(batch_size)
            .block(block_duration);

        let entry_stream = stream_entries(con, read_options, key.clone());

        // Auxiliary stream that infinitely creates handles to a shared connection.
        // One gets associated with every entry so it can be acknowledged later.
        let ack_con_stream = acknowledgement_connections(&self.factory);

        let stream = entry_stream
            .zip(ack_con_stream)
            .map(assemble_entry(key, group))
            .boxed();

        Ok(stream)
    }
}

fn assemble_entry(
    key: String,
    group: &ConsumerGroupDescriptor,
) -> impl Fn(
    (
        RedisResult<StreamId>,
        Result<BoxedConnection, BoxedError>,
    ),
) -> Result<RedisQueueEntry<BoxedConnection>, BoxedError> {
    let group = group.identifier().to_string();

    move |(entry, con)| {
        let entry = entry?;
        let ack_con = con?;
        let entry = RedisQueueEntry::new(ack_con, entry, key.clone(), group.clone())?;

        Ok(entry)
    }
}

async fn create_consumer_group<C: ConnectionLike + Send>(
    con: &mut C,
    key: &str,
    group: &ConsumerGroupDescriptor,
) {
    let start_id = match group.start() {
        QueueLocation::Head => STREAM_ID_HEAD,
        QueueLocation::Tail => STREAM_ID_TAIL,
    };

    // Failure usually means the group exists already (BUSYGROUP), which is fine
    con.xgroup_create_mkstream::<_, _, _, ()>(key, group.identifier().to_string(), start_id)
        .await
        .ok();
}

fn acknowledgement_connections<F: RedisFactory + Send + Sync>(
    factory: &F,
) -> BoxStream<Result<BoxedConnection, BoxedError>> {
    stream::repeat_with(move || async move {
        factory
            .connection(RedisConnectionVariant::Multiplexed)
            .await
            .map(BoxedConnection)
    })
    .then(|f| f)
    .boxed()
}

fn stream_entries<'a, C: ConnectionLike + Send + Sync + 'a>(
    con: C,
    options: StreamReadOptions,
    key: String,
) -> BoxStream<'a, RedisResult<StreamId>> {
    let initial_id: String = STREAM_ID_HEAD.to_string();

    let stream = stream::unfold((con, options, initial_id), move |(mut con, options, id)| {
        let key = key.to_owned();

        async move {
            let result = con
                .xread_options::<_, _, StreamReadReply>(&[&key], &[&id], &options)
                .await;

            match result {
                Ok(mut reply) => {
                    if let Some(stream) = reply.keys.pop() {
                        assert_eq!(stream.key, key);

                        // Already operating on "latest", continue doing so
                        if id == STREAM_ID_ADDITIONS {
                            Some((Ok(stream.ids), (con, options, id)))
                        }
                        // Processing pending entries after a crash, run through them
                        else if let Some(next_id) =
                            stream.ids.last().map(|entry| entry.id.to_owned())
                        {
                            Some((Ok(stream.ids), (con, options, next_id)))
                        }
                        // Pending entries exhausted, move over to "latest"
                        else {
                            Some((
                                Ok(stream.ids),
                                (con, options, STREAM_ID_ADDITIONS.to_string()),
                            ))
                        }
                    } else {
                        None
                    }
                }
                Err(e) => {
                    error!("Encountered error reading from redis stream {:?}", e);
                    None
                }
            }
        }
    });

    // Reading happens in batches (options.count may be >1) but the resulting
    // stream yields one entry at a time to make it easier to use.
    stream
        .flat_map(|result| match result {
            Ok(batch) => stream::iter(batch).map(Ok).boxed(),
            Err(e) => stream::once(async { Err(e) }).boxed(),
        })
        .boxed()
}

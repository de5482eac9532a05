use super::RedisCommunicationFactory;
use crate::library::communication::event::{ConsumerExt, QueueProvider};
use crate::library::communication::request::{Request, RpcChannel};
use crate::library::communication::CommunicationFactory;
use crate::library::EmptyResult;
use async_trait::async_trait;
use futures::{pin_mut, select, FutureExt};
use jatsl::{Job, JobManager};
use std::sync::Arc;
use tracing::info;

const REPLY_BATCH_SIZE: usize = 10;

/// Job consuming the reply queue of one [`RpcChannel`]
///
/// Subscribes under the consumer group owned by this process instance and only
/// then reports ready. Modules must wait for that readiness before they let the
/// first requestor loose, otherwise a reply from a fast colocated responder
/// could arrive while nobody is listening yet.
pub struct ReplyListenerJob<R: Request> {
    channel: RpcChannel<R>,
    redis_url: String,
}

impl<R: Request> ReplyListenerJob<R> {
    /// Creates a new job feeding replies into the given channel
    pub fn new(channel: RpcChannel<R>, redis_url: String) -> Self {
        Self { channel, redis_url }
    }
}

#[async_trait]
impl<R> Job for ReplyListenerJob<R>
where
    R: Request + Send + Sync,
{
    const NAME: &'static str = "ReplyListenerJob";

    fn name(&self) -> String {
        format!("{}({})", Self::NAME, R::reply_queue().key())
    }

    async fn execute(&self, manager: JobManager) -> EmptyResult {
        let factory =
            RedisCommunicationFactory::new(self.redis_url.clone(), Arc::new(manager.clone()));
        let provider = factory.queue_provider();

        let listener = self.channel.listener();
        let group = self.channel.consumer_group();
        let consumer = self.channel.identity().to_string();
        let extension = Some(self.channel.reply_extension());

        let stream = provider
            .consume(
                R::reply_queue(),
                &group,
                &consumer,
                REPLY_BATCH_SIZE,
                None,
                &extension,
            )
            .await?;

        // The subscription exists, requestors may fire from here on
        manager.ready().await;

        listener.consume_stream(stream).await
    }
}

/// Job enforcing the deadlines of one [`RpcChannel`]
///
/// Sweeps the channel's registry until the job is terminated and drains whatever
/// is still outstanding on its way out, so no caller hangs into the shutdown.
pub struct DeadlineSweepJob<R: Request> {
    channel: RpcChannel<R>,
}

impl<R: Request> DeadlineSweepJob<R> {
    /// Creates a new job sweeping the given channel
    pub fn new(channel: RpcChannel<R>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl<R> Job for DeadlineSweepJob<R>
where
    R: Request + Send + Sync,
{
    const NAME: &'static str = "DeadlineSweepJob";

    fn name(&self) -> String {
        format!("{}({})", Self::NAME, R::queue().key())
    }

    async fn execute(&self, manager: JobManager) -> EmptyResult {
        manager.ready().await;

        let sweep = self.channel.enforce_deadlines().fuse();
        let termination = manager.termination_signal().fuse();
        pin_mut!(sweep, termination);

        select! {
            () = sweep => {}
            () = termination => {}
        }

        let drained = self.channel.drain();
        if drained > 0 {
            info!(drained, "Drained outstanding calls during shutdown");
        }

        Ok(())
    }
}

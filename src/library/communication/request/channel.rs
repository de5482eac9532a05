use super::super::event::{
    ConsumerGroupDescriptor, InstanceIdentity, NotificationPublisher, QueueDescriptorExtension,
};
use super::{CorrelatedRequestor, ReplyListener, ReplyRegistry, Request};
use std::sync::Arc;
use std::time::Duration;

/// Tunables for an [`RpcChannel`]
#[derive(Debug, Clone)]
pub struct RpcChannelConfig {
    /// Upper bound of concurrently outstanding calls
    pub capacity: usize,
    /// Granularity of the deadline sweep
    ///
    /// Bounds how far past its deadline a caller may wait, so keep it well below
    /// the smallest timeout handed to a requestor.
    pub sweep_period: Duration,
}

impl Default for RpcChannelConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            sweep_period: Duration::from_millis(25),
        }
    }
}

/// Bundle tying together everything one call type needs on the requester side
///
/// Owns the [`ReplyRegistry`] and the [`InstanceIdentity`] from which requestors,
/// the reply listener and the deadline sweep are derived. Channels are plain
/// values without any global state, so one process may operate any number of them
/// — one per call type is the usual arrangement.
///
/// The listener must be consuming (and the sweep running) before the first
/// requestor is used; the harness jobs take care of that ordering.
pub struct RpcChannel<R: Request> {
    registry: Arc<ReplyRegistry<R>>,
    identity: InstanceIdentity,
    config: RpcChannelConfig,
}

impl<R: Request> RpcChannel<R> {
    /// Creates a channel with default tunables
    pub fn new(identity: InstanceIdentity) -> Self {
        Self::with_config(identity, RpcChannelConfig::default())
    }

    /// Creates a channel with explicit tunables
    pub fn with_config(identity: InstanceIdentity, config: RpcChannelConfig) -> Self {
        Self {
            registry: Arc::new(ReplyRegistry::new(config.capacity)),
            identity,
            config,
        }
    }

    /// Identity of the process instance owning this channel
    pub fn identity(&self) -> &InstanceIdentity {
        &self.identity
    }

    /// Queue key extension under which replies for this channel travel
    pub fn reply_extension(&self) -> QueueDescriptorExtension {
        self.identity.reply_extension()
    }

    /// Consumer group under which the reply queue is consumed
    ///
    /// Owned exclusively by this instance — sharing it across instances would
    /// load-balance replies to processes that never asked.
    pub fn consumer_group(&self) -> ConsumerGroupDescriptor {
        ConsumerGroupDescriptor::instance(&self.identity)
    }

    /// Derives a requestor publishing through the given publisher
    pub fn requestor<P: NotificationPublisher>(&self, publisher: P) -> CorrelatedRequestor<R, P> {
        CorrelatedRequestor::new(self.registry.clone(), publisher, self.reply_extension())
    }

    /// Derives the listener feeding replies into this channel's registry
    pub fn listener(&self) -> ReplyListener<R> {
        ReplyListener::new(self.registry.clone())
    }

    /// Runs the deadline sweep, forever
    pub async fn enforce_deadlines(&self) {
        self.registry.enforce_deadlines(self.config.sweep_period).await
    }

    /// Fails every outstanding call because the process is going away
    pub fn drain(&self) -> usize {
        self.registry.drain()
    }

    /// Number of calls currently awaiting a reply
    pub fn pending(&self) -> usize {
        self.registry.len()
    }
}

impl<R: Request> Clone for RpcChannel<R> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            identity: self.identity.clone(),
            config: self.config.clone(),
        }
    }
}

use super::super::error::RemoteError;
use super::super::event::{Consumer, NotificationPublisher};
use super::{ReplyEnvelope, ReplyOutcome, Request, RequestEnvelope};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{error, warn};

/// Structure which processes requests and produces replies
///
/// This is the seam towards the business layer: everything that talks to a
/// database, an object store or a third-party API lives behind this trait and
/// stays invisible to the messaging machinery.
#[async_trait]
pub trait RequestProcessor {
    /// Type of request to process
    type Request: Request;

    /// Handler for requests, returning a reply payload
    ///
    /// An `Err(_)` is a legitimate answer — it travels back to the caller as a
    /// typed rejection. Reserve it for "the request cannot be fulfilled"; a
    /// broken backend should rather surface as such an error too than panic.
    async fn process(
        &self,
        request: Self::Request,
    ) -> Result<<Self::Request as Request>::Response, BoxedError>;
}

/// Tunables for a [`Responder`]
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Longest a single handler invocation may run
    ///
    /// One stuck request must not starve the shared consumer group for everything
    /// queued behind it. An overrunning handler is answered with a failure reply.
    pub handler_budget: Duration,
    /// How often to attempt delivering a reply before giving up on it
    pub publish_attempts: usize,
    /// Pause between delivery attempts
    pub publish_retry_delay: Duration,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            handler_budget: Duration::from_secs(30),
            publish_attempts: 3,
            publish_retry_delay: Duration::from_millis(100),
        }
    }
}

/// Consumer answering requests through a [`RequestProcessor`]
///
/// Runs on the request queue under the group shared by all instances of the
/// service, so any instance may answer any request. The reply carries the
/// correlation token of the request and is published to the reply queue named
/// by the request envelope.
pub struct Responder<P: RequestProcessor, Pub> {
    processor: P,
    publisher: Pub,
    config: ResponderConfig,
}

impl<P, Pub> Responder<P, Pub>
where
    P: RequestProcessor,
    Pub: NotificationPublisher,
{
    /// Creates a new responder with default tunables
    pub fn new(processor: P, publisher: Pub) -> Self {
        Self::with_config(processor, publisher, ResponderConfig::default())
    }

    /// Creates a new responder with explicit tunables
    pub fn with_config(processor: P, publisher: Pub, config: ResponderConfig) -> Self {
        Self {
            processor,
            publisher,
            config,
        }
    }
}

#[async_trait]
impl<P, Pub> Consumer for Responder<P, Pub>
where
    P: RequestProcessor + Send + Sync,
    P::Request: Send + Sync,
    Pub: NotificationPublisher + Send + Sync,
{
    type Notification = RequestEnvelope<P::Request>;

    async fn consume(&self, request: Self::Notification) -> EmptyResult {
        let RequestEnvelope {
            correlation,
            reply_to,
            payload,
            ..
        } = request;

        // Handler failures become failure replies. The caller should learn that its
        // request was rejected instead of burning its whole deadline; timeouts stay
        // reserved for a broker partition or a responder that is truly gone.
        let outcome = match timeout(self.config.handler_budget, self.processor.process(payload))
            .await
        {
            Ok(Ok(response)) => ReplyOutcome::Success(response),
            Ok(Err(error)) => ReplyOutcome::Failure(RemoteError::from_boxed(error)),
            Err(_) => ReplyOutcome::Failure(RemoteError::from_message(format!(
                "handler exceeded its budget of {:?}",
                self.config.handler_budget
            ))),
        };

        let reply = ReplyEnvelope::<P::Request> {
            correlation,
            outcome,
        };

        self.deliver(&reply, reply_to).await;

        Ok(())
    }
}

impl<P, Pub> Responder<P, Pub>
where
    P: RequestProcessor + Send + Sync,
    P::Request: Send + Sync,
    Pub: NotificationPublisher + Send + Sync,
{
    /// Attempts to deliver a reply, retrying a bounded number of times
    ///
    /// When every attempt fails the reply is abandoned and the request is
    /// acknowledged regardless. Reply delivery is at-most-once; the caller's
    /// deadline covers the remaining gap.
    async fn deliver(&self, reply: &ReplyEnvelope<P::Request>, reply_to: String) {
        for attempt in 1..=self.config.publish_attempts {
            match self
                .publisher
                .publish_with_extension(reply, reply_to.clone())
                .await
            {
                Ok(_) => return,
                Err(publish_error) => {
                    warn!(
                        attempt,
                        correlation = %reply.correlation,
                        "Failed to deliver reply: {}",
                        publish_error
                    );

                    if attempt < self.config.publish_attempts {
                        sleep(self.config.publish_retry_delay).await;
                    }
                }
            }
        }

        error!(
            correlation = %reply.correlation,
            "Abandoning undeliverable reply, the caller will run into its deadline"
        );
    }
}

use super::{CorrelationId, ReplyOutcome, Request, RequestError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::debug;

/// Reason why a waiter could not be registered
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegisterError {
    /// The registry holds as many waiters as it is configured to
    #[error("the registry is at capacity")]
    CapacityExhausted,
    /// The correlation token already belongs to a waiter that is still in flight
    #[error("the correlation token is already in use")]
    TokenCollision,
}

struct Waiter<T> {
    tx: oneshot::Sender<Result<T, RequestError>>,
    deadline: Instant,
}

/// Table of in-flight calls awaiting their replies
///
/// This is the only shared mutable state of the request/reply layer. Entries are
/// created by requestors before they publish and removed by exactly one of four
/// events: a matching reply arrives, the deadline sweep expires them, the owning
/// [`PendingReply`] is dropped, or the registry is drained at shutdown. Whichever
/// comes first wins; all later attempts on the same token are no-ops.
///
/// The registry is deliberately not process-global. Every channel owns its own
/// instance so independent call types can coexist without interference and tests
/// can run any number of them side by side.
pub struct ReplyRegistry<R: Request> {
    waiters: Mutex<HashMap<CorrelationId, Waiter<R::Response>>>,
    capacity: usize,
}

impl<R: Request> ReplyRegistry<R> {
    /// Creates an empty registry holding at most `capacity` concurrent waiters
    ///
    /// The cap bounds memory during a broker outage: once it is reached, new
    /// calls fail fast instead of queueing unboundedly.
    pub fn new(capacity: usize) -> Self {
        Self {
            waiters: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    fn waiters(&self) -> MutexGuard<HashMap<CorrelationId, Waiter<R::Response>>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new waiter under the given token
    ///
    /// Has to happen *before* the request is published, otherwise a reply from a
    /// colocated responder could arrive with nobody to receive it.
    pub fn register(
        self: Arc<Self>,
        id: CorrelationId,
        deadline: Instant,
    ) -> Result<PendingReply<R>, RegisterError> {
        let rx = {
            let mut waiters = self.waiters();

            if waiters.len() >= self.capacity {
                return Err(RegisterError::CapacityExhausted);
            }

            if waiters.contains_key(&id) {
                return Err(RegisterError::TokenCollision);
            }

            let (tx, rx) = oneshot::channel();
            waiters.insert(id, Waiter { tx, deadline });
            rx
        };

        Ok(PendingReply {
            registry: self,
            id,
            rx,
        })
    }

    /// Hands an incoming outcome to the matching waiter
    ///
    /// Returns `false` when no waiter is registered for the token. That is the
    /// *normal* path for late or duplicated replies — the caller has moved on —
    /// and must never be treated as an error by the consuming loop.
    pub fn resolve(&self, id: CorrelationId, outcome: ReplyOutcome<R::Response>) -> bool {
        match self.waiters().remove(&id) {
            Some(waiter) => {
                // A dropped receiver means the caller has given up in the meantime
                waiter
                    .tx
                    .send(outcome.into_result().map_err(RequestError::Rejected))
                    .ok();
                true
            }
            None => false,
        }
    }

    /// Removes a waiter without resolving it
    pub fn deregister(&self, id: CorrelationId) -> bool {
        self.waiters().remove(&id).is_some()
    }

    /// Fails every waiter whose deadline has passed and returns how many there were
    pub fn expire_overdue(&self, now: Instant) -> usize {
        let mut waiters = self.waiters();

        let overdue: Vec<CorrelationId> = waiters
            .iter()
            .filter(|(_, waiter)| waiter.deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in &overdue {
            if let Some(waiter) = waiters.remove(id) {
                waiter.tx.send(Err(RequestError::TimedOut)).ok();
            }
        }

        overdue.len()
    }

    /// Fails every remaining waiter because the process is going away
    pub fn drain(&self) -> usize {
        let drained: Vec<Waiter<R::Response>> =
            self.waiters().drain().map(|(_, waiter)| waiter).collect();
        let count = drained.len();

        for waiter in drained {
            waiter.tx.send(Err(RequestError::ShuttingDown)).ok();
        }

        count
    }

    /// Number of waiters currently in flight
    pub fn len(&self) -> usize {
        self.waiters().len()
    }

    /// Whether no waiter is currently in flight
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Periodically expires overdue waiters, forever
    ///
    /// Deadlines are enforced by this sweep alone, independent of broker traffic.
    /// A caller therefore receives its timeout even when the reply queue stays
    /// silent for good. The period bounds how far past its deadline a waiter can
    /// linger, so it should stay well below the smallest timeout in use.
    pub async fn enforce_deadlines(&self, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let expired = self.expire_overdue(Instant::now());
            if expired > 0 {
                debug!(expired, "Expired overdue reply waiters");
            }
        }
    }
}

/// Handle representing one outstanding call
///
/// Dropping the handle deregisters the waiter, so a caller that gets cancelled
/// while waiting does not leave a dangling registry entry behind.
pub struct PendingReply<R: Request> {
    registry: Arc<ReplyRegistry<R>>,
    id: CorrelationId,
    rx: oneshot::Receiver<Result<R::Response, RequestError>>,
}

impl<R: Request> PendingReply<R> {
    /// Token under which this call is registered
    pub fn correlation(&self) -> CorrelationId {
        self.id
    }

    /// Waits for the registry to resolve this call, one way or another
    pub async fn outcome(mut self) -> Result<R::Response, RequestError> {
        match (&mut self.rx).await {
            Ok(result) => result,
            // The registry disappeared without resolving us, which only
            // happens when the process is being torn down
            Err(_) => Err(RequestError::ShuttingDown),
        }
    }
}

impl<R: Request> Drop for PendingReply<R> {
    fn drop(&mut self) {
        // No-op when the waiter has already been resolved
        self.registry.deregister(self.id);
    }
}

#[cfg(test)]
mod does {
    use super::super::super::event::{Notification, QueueDescriptor};
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

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

    fn registry(capacity: usize) -> Arc<ReplyRegistry<MockRequest>> {
        Arc::new(ReplyRegistry::new(capacity))
    }

    fn deadline_in(duration: Duration) -> Instant {
        Instant::now() + duration
    }

    #[tokio::test]
    async fn resolve_each_token_at_most_once() {
        let registry = registry(16);
        let pending = registry
            .clone()
            .register(CorrelationId::generate(), deadline_in(Duration::from_secs(1)))
            .unwrap();
        let id = pending.correlation();

        assert!(registry.resolve(id, ReplyOutcome::Success(1)));
        assert!(!registry.resolve(id, ReplyOutcome::Success(2)));
        assert_eq!(registry.expire_overdue(Instant::now() + Duration::from_secs(2)), 0);

        assert_eq!(pending.outcome().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reject_token_collisions() {
        let registry = registry(16);
        let id = CorrelationId::generate();
        let _pending = registry
            .clone()
            .register(id, deadline_in(Duration::from_secs(1)))
            .unwrap();

        let error = registry
            .clone()
            .register(id, deadline_in(Duration::from_secs(1)))
            .err();

        assert_eq!(error, Some(RegisterError::TokenCollision));
    }

    #[tokio::test]
    async fn reject_waiters_beyond_capacity() {
        let registry = registry(1);
        let _pending = registry
            .clone()
            .register(CorrelationId::generate(), deadline_in(Duration::from_secs(1)))
            .unwrap();

        let error = registry
            .clone()
            .register(CorrelationId::generate(), deadline_in(Duration::from_secs(1)))
            .err();

        assert_eq!(error, Some(RegisterError::CapacityExhausted));
    }

    #[tokio::test]
    async fn expire_only_overdue_waiters() {
        let registry = registry(16);
        let due = registry
            .clone()
            .register(CorrelationId::generate(), deadline_in(Duration::from_millis(10)))
            .unwrap();
        let later = registry
            .clone()
            .register(CorrelationId::generate(), deadline_in(Duration::from_secs(10)))
            .unwrap();

        let expired = registry.expire_overdue(Instant::now() + Duration::from_millis(100));

        assert_eq!(expired, 1);
        assert_eq!(registry.len(), 1);
        assert!(matches!(due.outcome().await, Err(RequestError::TimedOut)));

        drop(later);
    }

    #[tokio::test]
    async fn fail_every_waiter_when_drained() {
        let registry = registry(16);
        let pending: Vec<_> = (0..3)
            .map(|_| {
                registry
                    .clone()
                    .register(CorrelationId::generate(), deadline_in(Duration::from_secs(10)))
                    .unwrap()
            })
            .collect();

        assert_eq!(registry.drain(), 3);
        assert!(registry.is_empty());

        for waiter in pending {
            assert!(matches!(
                waiter.outcome().await,
                Err(RequestError::ShuttingDown)
            ));
        }
    }

    #[tokio::test]
    async fn deregister_cancelled_callers() {
        let registry = registry(16);
        let pending = registry
            .clone()
            .register(CorrelationId::generate(), deadline_in(Duration::from_secs(10)))
            .unwrap();

        assert_eq!(registry.len(), 1);
        drop(pending);
        assert!(registry.is_empty());
    }
}

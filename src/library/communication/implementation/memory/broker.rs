use super::super::super::event::{
    ConsumerGroupDescriptor, QueueDescriptor, QueueDescriptorExtension, QueueLocation,
    QueueProvider, RawNotificationPublisher, RawQueueEntry, RoutingKey,
};
use super::super::json::{JsonNotificationPublisher, JsonQueueEntry};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;

struct StoredEntry {
    payload: Vec<u8>,
    routing: Option<RoutingKey>,
}

struct GroupState {
    cursor: usize,
    delivered: usize,
    acknowledged: usize,
}

struct QueueState {
    entries: Vec<Arc<StoredEntry>>,
    groups: HashMap<String, GroupState>,
    arrival: broadcast::Sender<()>,
}

impl QueueState {
    fn new() -> Self {
        let (arrival, _) = broadcast::channel(16);

        Self {
            entries: Vec::new(),
            groups: HashMap::new(),
            arrival,
        }
    }
}

/// Queue provider and publisher living entirely within the current process
///
/// Cloning is cheap and every clone operates on the same set of queues.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<HashMap<String, QueueState>>>,
}

impl MemoryBroker {
    /// Creates a new broker with no queues
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<HashMap<String, QueueState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of entries ever published to the given queue key
    pub fn published(&self, key: &str) -> usize {
        self.state().get(key).map(|q| q.entries.len()).unwrap_or(0)
    }

    /// Number of entries the given group has claimed but not acknowledged
    pub fn unacknowledged(&self, key: &str, group: &str) -> usize {
        self.state()
            .get(key)
            .and_then(|q| q.groups.get(group))
            .map(|g| g.delivered - g.acknowledged)
            .unwrap_or(0)
    }

    /// Routing hints of every entry published to the given queue key, in order
    pub fn published_routing(&self, key: &str) -> Vec<Option<RoutingKey>> {
        self.state()
            .get(key)
            .map(|q| q.entries.iter().map(|e| e.routing.clone()).collect())
            .unwrap_or_default()
    }

    /// Claims the next unclaimed entry for the group, waiting for arrivals
    ///
    /// Returns `None` once `idle_timeout` elapses without anything to claim.
    async fn next_entry(
        &self,
        key: &str,
        group_id: &str,
        idle_timeout: Option<Duration>,
    ) -> Option<MemoryQueueEntry> {
        loop {
            // Subscribing to arrivals while still holding the lock closes the gap
            // between observing an empty queue and going to sleep
            let mut arrivals = {
                let mut state = self.state();
                let queue = state.get_mut(key)?;
                let group = queue.groups.get_mut(group_id)?;

                if group.cursor < queue.entries.len() {
                    let stored = queue.entries[group.cursor].clone();
                    group.cursor += 1;
                    group.delivered += 1;

                    return Some(MemoryQueueEntry {
                        broker: self.clone(),
                        key: key.to_owned(),
                        group: group_id.to_owned(),
                        stored,
                    });
                }

                queue.arrival.subscribe()
            };

            // A lagged receiver only means we slept through several arrivals,
            // the re-check above will pick the entries up regardless
            match idle_timeout {
                Some(limit) => {
                    if timeout(limit, arrivals.recv()).await.is_err() {
                        return None;
                    }
                }
                None => {
                    arrivals.recv().await.ok();
                }
            }
        }
    }
}

#[async_trait]
impl RawNotificationPublisher for MemoryBroker {
    async fn publish_raw(
        &self,
        data: &[u8],
        descriptor: QueueDescriptor,
        extension: Option<QueueDescriptorExtension>,
        routing: Option<RoutingKey>,
    ) -> EmptyResult {
        let key = match extension {
            Some(extension) => descriptor.key_with_extension(&extension),
            None => descriptor.key().to_owned(),
        };

        let arrival = {
            let mut state = self.state();
            let queue = state.entry(key).or_insert_with(QueueState::new);

            queue.entries.push(Arc::new(StoredEntry {
                payload: data.to_vec(),
                routing,
            }));

            queue.arrival.clone()
        };

        // Nobody subscribed yet is fine, the entry waits in the log
        arrival.send(()).ok();

        Ok(())
    }
}

impl JsonNotificationPublisher for MemoryBroker {}

#[async_trait]
impl QueueProvider for MemoryBroker {
    type Entry = MemoryQueueEntry;

    async fn consume(
        &self,
        queue: QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        _consumer: &str, // &ConsumerIdentifier
        _batch_size: usize,
        idle_timeout: Option<Duration>,
        extension: &Option<QueueDescriptorExtension>,
    ) -> Result<BoxStream<Result<Self::Entry, BoxedError>>, BoxedError> {
        let key = match extension {
            Some(extension) => queue.key_with_extension(extension),
            None => queue.key().to_owned(),
        };
        let group_id = group.identifier().to_string();

        // Create queue and group eagerly so everything published from here on is
        // guaranteed to reach this subscription
        {
            let mut state = self.state();
            let queue_state = state.entry(key.clone()).or_insert_with(QueueState::new);
            let start = match group.start() {
                QueueLocation::Head => 0,
                QueueLocation::Tail => queue_state.entries.len(),
            };

            queue_state
                .groups
                .entry(group_id.clone())
                .or_insert(GroupState {
                    cursor: start,
                    delivered: 0,
                    acknowledged: 0,
                });
        }

        let broker = self.clone();
        let stream = stream::unfold(
            (broker, key, group_id, idle_timeout),
            |(broker, key, group_id, idle_timeout)| async move {
                let entry = broker.next_entry(&key, &group_id, idle_timeout).await?;
                Some((Ok(entry), (broker, key, group_id, idle_timeout)))
            },
        );

        Ok(stream.boxed())
    }
}

/// Entry claimed from a [`MemoryBroker`] queue
pub struct MemoryQueueEntry {
    broker: MemoryBroker,
    key: String,
    group: String,
    stored: Arc<StoredEntry>,
}

#[async_trait]
impl RawQueueEntry for MemoryQueueEntry {
    fn payload(&self) -> &[u8] {
        &self.stored.payload
    }

    async fn acknowledge(&mut self) -> EmptyResult {
        let mut state = self.broker.state();

        if let Some(queue) = state.get_mut(&self.key) {
            if let Some(group) = queue.groups.get_mut(&self.group) {
                group.acknowledged += 1;
            }
        }

        Ok(())
    }
}

impl JsonQueueEntry for MemoryQueueEntry {}

#[cfg(test)]
mod does {
    use super::super::super::super::event::ConsumerGroupIdentifier;
    use super::*;
    use pretty_assertions::assert_eq;

    fn descriptor() -> QueueDescriptor {
        QueueDescriptor::new("queue".into(), 100)
    }

    async fn publish(broker: &MemoryBroker, payload: &[u8]) {
        broker
            .publish_raw(payload, descriptor(), None, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn balance_entries_within_one_group() {
        let broker = MemoryBroker::new();
        for payload in [b"a", b"b", b"c", b"d"] {
            publish(&broker, payload).await;
        }

        let group = ConsumerGroupDescriptor::shared("workers");
        let mut first = broker
            .consume(descriptor(), &group, "first", 10, None, &None)
            .await
            .unwrap();
        let mut second = broker
            .consume(descriptor(), &group, "second", 10, None, &None)
            .await
            .unwrap();

        let mut payloads = Vec::new();
        for _ in 0..2 {
            payloads.push(first.next().await.unwrap().unwrap().payload().to_vec());
            payloads.push(second.next().await.unwrap().unwrap().payload().to_vec());
        }

        payloads.sort();
        assert_eq!(payloads, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);
    }

    #[tokio::test]
    async fn fan_out_across_groups() {
        let broker = MemoryBroker::new();
        publish(&broker, b"shared").await;

        for name in ["one", "two"] {
            let group = ConsumerGroupDescriptor::shared(name);
            let mut stream = broker
                .consume(descriptor(), &group, "c", 10, None, &None)
                .await
                .unwrap();

            let entry = stream.next().await.unwrap().unwrap();
            assert_eq!(entry.payload(), b"shared");
        }
    }

    #[tokio::test]
    async fn honor_the_tail_start_location() {
        let broker = MemoryBroker::new();
        publish(&broker, b"before").await;

        let group = ConsumerGroupDescriptor::new(
            ConsumerGroupIdentifier::Shared("late".into()),
            QueueLocation::Tail,
        );
        let mut stream = broker
            .consume(descriptor(), &group, "c", 10, None, &None)
            .await
            .unwrap();

        publish(&broker, b"after").await;

        let entry = stream.next().await.unwrap().unwrap();
        assert_eq!(entry.payload(), b"after");
    }

    #[tokio::test]
    async fn end_the_stream_after_the_idle_timeout() {
        let broker = MemoryBroker::new();
        let group = ConsumerGroupDescriptor::shared("workers");

        let mut stream = broker
            .consume(
                descriptor(),
                &group,
                "c",
                10,
                Some(Duration::from_millis(50)),
                &None,
            )
            .await
            .unwrap();

        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn track_acknowledgements() {
        let broker = MemoryBroker::new();
        publish(&broker, b"work").await;

        let group = ConsumerGroupDescriptor::shared("workers");
        let mut stream = broker
            .consume(descriptor(), &group, "c", 10, None, &None)
            .await
            .unwrap();

        let mut entry = stream.next().await.unwrap().unwrap();
        assert_eq!(broker.unacknowledged("queue", "workers"), 1);

        entry.acknowledge().await.unwrap();
        assert_eq!(broker.unacknowledged("queue", "workers"), 0);
    }

    #[tokio::test]
    async fn round_trip_routing_hints() {
        let broker = MemoryBroker::new();
        broker
            .publish_raw(b"keyed", descriptor(), None, Some("7".into()))
            .await
            .unwrap();

        assert_eq!(
            broker.published_routing("queue"),
            vec![Some(String::from("7"))]
        );
    }
}

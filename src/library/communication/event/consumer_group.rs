use super::{QueueDescriptorExtension, QueueLocation};
use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

/// Identity of one running process instance of a service
///
/// Reply queues and their consumer groups are derived from this identity, so two
/// instances of the same service never steal replies from one another. By default a
/// fresh random identity is generated at startup. Deployments that want stable
/// identities (and tests, which need deterministic ones) construct it explicitly.
///
/// An identity must never be reused by two processes whose lifetimes overlap,
/// otherwise the broker load-balances their shared reply group and either process
/// may receive replies belonging to the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceIdentity {
    service: String,
    instance: String,
}

impl InstanceIdentity {
    /// Creates an identity with a fresh random instance token
    pub fn generate(service: &str) -> Self {
        Self {
            service: service.to_owned(),
            instance: Uuid::new_v4().to_string(),
        }
    }

    /// Creates an identity from a fixed instance token
    pub fn new(service: &str, instance: &str) -> Self {
        Self {
            service: service.to_owned(),
            instance: instance.to_owned(),
        }
    }

    /// Service this instance belongs to
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Token distinguishing this instance from its siblings
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Queue key extension under which this instance expects its replies
    pub fn reply_extension(&self) -> QueueDescriptorExtension {
        self.to_string()
    }
}

impl Display for InstanceIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.service, self.instance)
    }
}

/// Unique identifier for a group of consumers
#[derive(Clone)]
pub enum ConsumerGroupIdentifier {
    /// Stable group name shared by all instances of one service
    Shared(String),
    /// Group owned by a single process instance
    Instance(InstanceIdentity),
}

impl ToString for ConsumerGroupIdentifier {
    fn to_string(&self) -> String {
        match self {
            Self::Shared(name) => name.to_owned(),
            Self::Instance(identity) => identity.to_string(),
        }
    }
}

/// Definition of a consumer group
///
/// In a message queue, a group of consumers collaborates to consume messages.
/// Each message is only delivered to one consumer within the same group, identified
/// by a [`ConsumerGroupIdentifier`]. When it is created, they start processing messages
/// from the provided [`QueueLocation`].
#[derive(Clone)]
pub struct ConsumerGroupDescriptor {
    identifier: ConsumerGroupIdentifier,
    start: QueueLocation,
}

impl ConsumerGroupDescriptor {
    /// Creates a new instance from raw parts
    pub fn new(identifier: ConsumerGroupIdentifier, start: QueueLocation) -> Self {
        Self { identifier, start }
    }

    /// Group shared by all instances of a service, starting at the queue head
    ///
    /// This is the responder side of the request/reply pattern: any member may
    /// pick up any entry and entries that were published while no member was
    /// alive are processed once somebody joins.
    pub fn shared(name: &str) -> Self {
        Self {
            identifier: ConsumerGroupIdentifier::Shared(name.to_owned()),
            start: QueueLocation::Head,
        }
    }

    /// Group owned by one process instance, starting at the queue tail
    ///
    /// This is the requester side: replies published before this instance existed
    /// belong to callers long gone and must not be replayed into a fresh registry.
    pub fn instance(identity: &InstanceIdentity) -> Self {
        Self {
            identifier: ConsumerGroupIdentifier::Instance(identity.clone()),
            start: QueueLocation::Tail,
        }
    }

    /// Unique identifier of the group
    pub fn identifier(&self) -> &ConsumerGroupIdentifier {
        &self.identifier
    }

    /// Location from where a consumer group begins to consume messages
    ///
    /// Note that it is not guaranteed that this will be honored (e.g. when the group already exists)!
    pub fn start(&self) -> &QueueLocation {
        &self.start
    }
}

/// Unique identifier of a consumer within a [`ConsumerGroup`](ConsumerGroupDescriptor)
pub type ConsumerIdentifier = String;

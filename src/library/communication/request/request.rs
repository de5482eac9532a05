use super::super::event::{Notification, QueueDescriptor, RoutingKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Query for information which can be replied to
///
/// Note that requests may not have side effects! Since a reply can get lost,
/// the request can and will get repeated eventually. If, for some sophisticated
/// reason, side effects are required (although they seldom are), they should be
/// idempotent or the reply should not be considered important (e.g. it only
/// serves as a confirmation but nothing happens as a consequence of it).
///
/// The request travels on the queue provided by the [`Notification`] supertrait
/// while replies travel on the [`reply_queue`](Request::reply_queue), specialised
/// per issuing instance through its reply extension.
pub trait Request: Notification {
    /// Expected reply payload type
    type Response: Serialize + DeserializeOwned + Debug + PartialEq + Send + Sync;

    /// Queue on which replies to this kind of request travel
    ///
    /// Static per call type; the concrete queue a reply lands on additionally
    /// carries the reply extension of the instance that asked.
    fn reply_queue() -> QueueDescriptor;

    /// Key grouping this request with others concerning the same business entity
    ///
    /// Partitioned transports preserve publish order within one key, so requests
    /// that must not overtake each other should return the same key. Defaults to
    /// `None` in which case the correlation token is used and no ordering beyond
    /// the individual call is guaranteed.
    fn routing_key(&self) -> Option<RoutingKey> {
        None
    }
}

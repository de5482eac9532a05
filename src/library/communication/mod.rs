//! Structures to communicate between services over a partitioned message broker
//!
//! There are two modes of operation:
//!
//! 1. Publish and subscribe
//! 2. Request and reply
//!
//! The first is the raw transport layer. Messages implementing the
//! [`Notification`](event::Notification) trait are published into named queues and
//! consumed by [`ConsumerGroups`](event::ConsumerGroupDescriptor) which load-balance
//! entries across their members. Everything in the [`event`] module is transport
//! agnostic; concrete bindings live in the [`implementation`] module.
//!
//! The second mode builds a synchronous-looking call on top of the first. A
//! [`Requestor`](request::Requestor) wraps a [`Request`](request::Request) into an
//! envelope carrying a correlation token and the location of a reply queue owned by
//! the issuing process instance. Any responder instance subscribed to the shared
//! request group may answer; the reply finds its way back to the one instance that
//! asked because reply queues are consumed under instance-scoped groups. The
//! [`request`] module documentation covers the flow in detail.

mod communication_factory;
mod error;

pub mod event;
pub mod implementation;
pub mod request;

pub use communication_factory::CommunicationFactory;
pub use error::RemoteError;

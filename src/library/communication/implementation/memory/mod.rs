//! In-process transport backed by plain data structures
//!
//! Implements the queue abstraction without an external broker: entries live in
//! per-queue append-only logs and every consumer group keeps a cursor into the
//! log it shares with its members. The semantics mirror the redis implementation
//! closely enough that code exercised against one behaves the same against the
//! other, which makes this the transport of choice for tests and for loopback
//! setups where requester and responder share a process.
//!
//! Queue length limits are accepted but not enforced; nothing in-process lives
//! long enough for eviction to matter.

mod broker;

pub use broker::*;

use crate::library::BoxedError;
use async_trait::async_trait;
use redis::aio::ConnectionLike;
use redis::{Cmd, Pipeline, RedisFuture, Value};

/// Variant for redis connections
pub enum RedisConnectionVariant {
    /// Individual connection that may allow for blocking commands without disturbing other users.
    /// While it may be reused after going out-of-scope, this variant indicates that the consumer
    /// is operating long-running, blocking operations on the connection and the use of a resource
    /// pool is unadvisable as it may take a long time for the connection to be returned.
    Owned,
    /// Same as [`Owned`](RedisConnectionVariant::Owned) but indicates that the consumer is expected
    /// to only block for relatively short periods of time so that the use of a connection pool is
    /// viable.
    Pooled,
    /// Connection that can be shared between multiple users and generally does not permit blocking
    /// commands
    Multiplexed,
}

/// Adapter making a boxed [`ConnectionLike`] trait object usable where a concrete
/// `ConnectionLike` value is required.
///
/// The [`redis`](::redis) crate does not implement `ConnectionLike` for
/// `Box<dyn ConnectionLike>`, and the orphan rule forbids adding that impl from
/// here, so the trait objects handed out by a [`RedisFactory`] are wrapped in this
/// newtype. Every call forwards verbatim to the inner connection.
pub struct BoxedConnection(pub Box<dyn ConnectionLike + Send + Sync>);

impl ConnectionLike for BoxedConnection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        self.0.req_packed_command(cmd)
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        self.0.req_packed_commands(cmd, offset, count)
    }

    fn get_db(&self) -> i64 {
        self.0.get_db()
    }
}

/// Factory for redis connections of different [types](RedisConnectionVariant)
#[async_trait]
pub trait RedisFactory {
    /// Establishes a new connection, retrieves one from a pool, or clones a shared one
    async fn connection(
        &self,
        variant: RedisConnectionVariant,
    ) -> Result<Box<dyn ConnectionLike + Send + Sync>, BoxedError>;
}

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use jatsl::TaskResourceHandle;
use lazy_static::lazy_static;
use redis::aio::{Connection, ConnectionLike, MultiplexedConnection};
use redis::{Client, Cmd, Pipeline, RedisError, RedisFuture, RedisResult, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, trace, warn};

const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(2);
const CONNECT_REQUEST_TIMEOUT: Duration = Duration::from_secs(4);

type SharedConnectionFuture = Shared<BoxFuture<'static, MultiplexedConnection>>;

lazy_static! {
    static ref SHARED_CONNECTIONS: Mutex<HashMap<String, SharedConnectionFuture>> =
        Mutex::new(HashMap::new());
}

/// Redis connection that monitors for connection errors
///
/// Every command result is inspected and connection-level failures are reported
/// to the [`TaskResourceHandle`] of the job owning the connection, prompting the
/// scheduler to restart the job once the resource recovers.
pub struct RedisResource<C: ConnectionLike> {
    con: C,
    handle: TaskResourceHandle,
}

impl RedisResource<Connection> {
    /// Creates a new standalone redis connection
    pub async fn new(handle: TaskResourceHandle, url: &str) -> RedisResult<Self> {
        debug!("Instantiating new standalone redis client");

        let client = Client::open(url)?;
        let con = Self::connect_standalone(client).await;

        Ok(Self { con, handle })
    }

    async fn connect_standalone(client: Client) -> Connection {
        let mut attempt = 0;

        loop {
            trace!(attempt, "Connecting to redis");

            match timeout(CONNECT_REQUEST_TIMEOUT, client.get_async_connection()).await {
                Ok(Ok(connection)) => return connection,
                Ok(Err(error)) => warn!(?error, "Failed to connect to redis"),
                Err(error) => warn!(?error, "Timeout connecting to redis"),
            }

            sleep(CONNECT_RETRY_INTERVAL).await;
            attempt += 1;
        }
    }
}

impl RedisResource<MultiplexedConnection> {
    /// Retrieves the shared multiplexed connection for the given URL, creating it on first use
    pub async fn shared(handle: TaskResourceHandle, url: &str) -> RedisResult<Self> {
        debug!("Instantiating shared redis client handle");

        let client = Client::open(url)?;

        let future = {
            let mut shared = SHARED_CONNECTIONS.lock().await;

            shared
                .entry(url.to_owned())
                .or_insert_with(|| Self::connect_shared(client).boxed().shared())
                .clone()
        };

        let con = future.await;

        Ok(Self { con, handle })
    }

    async fn connect_shared(client: Client) -> MultiplexedConnection {
        let mut attempt = 0;

        loop {
            trace!(attempt, "Connecting to redis");

            match timeout(
                CONNECT_REQUEST_TIMEOUT,
                client.get_multiplexed_tokio_connection(),
            )
            .await
            {
                Ok(Ok(connection)) => return connection,
                Ok(Err(error)) => warn!(?error, "Failed to connect to redis"),
                Err(error) => warn!(?error, "Timeout connecting to redis"),
            }

            sleep(CONNECT_RETRY_INTERVAL).await;
            attempt += 1;
        }
    }
}

impl<C: ConnectionLike> RedisResource<C> {
    async fn notify_if_disconnected(&mut self, error: &RedisError) {
        if error.is_connection_dropped()
            || error.is_io_error()
            || error.is_connection_refusal()
            || error.is_timeout()
        {
            error!(?error, "Redis connection encountered error");
            self.handle.resource_died().await;
        }
    }
}

impl<C: ConnectionLike + Send> ConnectionLike for RedisResource<C> {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        (async move {
            let result = self.con.req_packed_command(cmd).await;

            if let Err(ref error) = result {
                self.notify_if_disconnected(error).await;
            }

            result
        })
        .boxed()
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        (async move {
            let result = self.con.req_packed_commands(cmd, offset, count).await;

            if let Err(ref error) = result {
                self.notify_if_disconnected(error).await;
            }

            result
        })
        .boxed()
    }

    fn get_db(&self) -> i64 {
        self.con.get_db()
    }
}

//! Structures to keep the process alive until some event occurs

use futures::{
    channel::mpsc::{channel, Receiver, Sender},
    prelude::*,
    select,
};
use std::fmt::{self, Display, Formatter};
use tokio::signal::ctrl_c;
use tokio::signal::unix::{signal, SignalKind};
use tracing::debug;

/// Reason why the heart stopped beating
#[derive(Debug, Clone)]
pub enum DeathReason {
    /// Internal kill signal has been sent
    Killed(String),
    /// SIGINT, SIGTERM or other process-external cause
    Terminated,
}

impl Display for DeathReason {
    fn fmt(&self, w: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DeathReason::Killed(reason) => write!(w, "Killed ({})", reason),
            DeathReason::Terminated => write!(w, "Terminated due to external signal"),
        }
    }
}

/// Lifecycle management struct that can be used to keep the application alive
///
/// The linked [`HeartStone`] may be handed to whichever component is in a position
/// to decide that the process is done (or beyond saving).
pub struct Heart {
    rx: Receiver<String>,
}

impl Heart {
    /// Creates a new heart and linked stone
    pub fn new() -> (Self, HeartStone) {
        let (tx, rx) = channel(4);

        (Self { rx }, HeartStone { tx })
    }

    /// Creates a new heart that only reacts to external signals, discarding the stone
    pub fn without_heart_stone() -> Self {
        Heart::new().0
    }

    /// Future that waits until the heart dies for the returned reason
    pub async fn death(&mut self) -> DeathReason {
        debug!("Heart starts beating");

        loop {
            select! {
                reason = self.rx.next() => {
                    if let Some(reason) = reason {
                        return DeathReason::Killed(reason);
                    }
                },
                () = Heart::termination_signal().fuse() => return DeathReason::Terminated,
            };
        }
    }

    async fn termination_signal() {
        let interrupt = async {
            ctrl_c().await.ok();
        };

        let terminate = async {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(_) => future::pending::<()>().await,
            }
        };

        futures::pin_mut!(interrupt, terminate);
        future::select(interrupt, terminate).await;
    }
}

/// Remote control for a [`Heart`]
#[derive(Clone)]
pub struct HeartStone {
    tx: Sender<String>,
}

impl HeartStone {
    /// Kills the linked heart for the given reason
    pub async fn kill(&mut self, reason: String) {
        self.tx.send(reason).await.ok();
    }
}

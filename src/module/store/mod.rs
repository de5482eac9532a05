//! Store service endpoint answering store information requests
//!
//! The full store service fronts a relational database plus an HTTP API; this
//! module carries its messaging endpoint. All instances share one consumer group
//! on the request queue, so deployments scale horizontally by just starting more
//! of them.

mod directory;
mod options;
mod service;

pub use directory::*;
pub use options::Options;
use service::*;

use crate::constants;
use crate::harness::{Heart, Module, ServiceRunner};
use crate::library::communication::event::ConsumerGroupDescriptor;
use crate::library::BoxedError;
use async_trait::async_trait;
use jatsl::{schedule, JobScheduler};

/// Module implementation
pub struct Store {
    options: Options,
}

impl Store {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Module for Store {
    async fn run(&mut self, scheduler: &JobScheduler) -> Result<Option<Heart>, BoxedError> {
        let directory = StoreDirectory::from_file(&self.options.directory)?;

        let group = ConsumerGroupDescriptor::shared(constants::GROUP_STORE);
        let runner = ServiceRunner::<StoreInfoResponderService<_>>::new(
            self.options.redis.url.clone(),
            group,
            self.options.queueing.id.clone(),
            directory,
        );

        schedule!(scheduler, { runner });

        Ok(Some(Heart::without_heart_stone()))
    }
}

//! Connection factories binding the redis transport to the jatsl job system

mod factory;
mod resource;

pub use factory::*;
pub use resource::*;

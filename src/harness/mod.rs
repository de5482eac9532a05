//! Runtime harness to execute services in the context of modules

mod heart;
mod module;
mod redis;
mod rpc;
mod service;

pub use self::redis::*;
pub use heart::*;
pub use module::*;
pub use rpc::*;
pub use service::*;

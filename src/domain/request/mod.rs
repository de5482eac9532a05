//! Request/reply call types observed between the services
//!
//! One module per call type. Each request routes by the business entity it
//! concerns so entity-level ordering survives on partitioned transports, and
//! each call type owns a dedicated reply queue (specialised per instance at
//! runtime).

mod content;
mod media;
mod publishing;
mod store;

pub use content::*;
pub use media::*;
pub use publishing::*;
pub use store::*;

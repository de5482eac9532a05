//! Message contracts shared between the callbus services
//!
//! Queue keys, payload schemas and reply types defined here are the wire contract
//! between requesters and responders. They are versioned with the crate; changing
//! a field or a queue key is a breaking change for every deployed service.

pub mod request;

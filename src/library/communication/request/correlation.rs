use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

/// Opaque token linking one request to its eventual reply
///
/// Generated fresh for every call. 128 random bits make an accidental collision
/// with a call that is still in flight practically impossible; the registry
/// rejects the remaining theoretical case and the caller simply draws a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Draws a new random token
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for CorrelationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trip_through_json() {
        let id = CorrelationId::generate();
        let serialized = serde_json::to_string(&id).unwrap();
        let deserialized: CorrelationId = serde_json::from_str(&serialized).unwrap();

        assert_eq!(id, deserialized);
    }

    #[test]
    fn serialize_as_bare_string() {
        let id = CorrelationId::generate();
        let serialized = serde_json::to_string(&id).unwrap();

        assert_eq!(serialized, format!("\"{}\"", id));
    }
}

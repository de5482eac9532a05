use crate::domain::request::{StoreInfoRequest, StoreInfoResponse};
use crate::library::communication::request::RequestProcessor;
use crate::library::BoxedError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Single entry of the [`StoreDirectory`]
#[derive(Debug, Deserialize, Clone)]
pub struct StoreProfile {
    /// Unique identifier of the store
    pub id: u64,
    /// Display name of the store
    pub name: String,
    /// Line of business the store operates in
    pub industry: String,
    /// Street address, where the store maintains one
    #[serde(default)]
    pub address: Option<String>,
}

/// Failure modes of a directory lookup
#[derive(Error, Debug)]
pub enum StoreLookupError {
    /// No store is registered under the requested identifier
    #[error("store {0} does not exist")]
    UnknownStore(u64),
}

/// Lookup table answering store information requests
///
/// Seeded once at startup from a JSON document containing a list of
/// [`StoreProfiles`](StoreProfile). Cloning is cheap, all clones share the
/// same table.
#[derive(Clone)]
pub struct StoreDirectory {
    stores: Arc<HashMap<u64, StoreProfile>>,
}

impl StoreDirectory {
    /// Loads the directory from a JSON document
    pub fn from_file(path: &Path) -> Result<Self, BoxedError> {
        let raw = std::fs::read(path)?;
        let profiles: Vec<StoreProfile> = serde_json::from_slice(&raw)?;

        Ok(Self::from_profiles(profiles))
    }

    /// Builds the directory from already loaded profiles
    pub fn from_profiles(profiles: Vec<StoreProfile>) -> Self {
        let stores = profiles
            .into_iter()
            .map(|profile| (profile.id, profile))
            .collect();

        Self {
            stores: Arc::new(stores),
        }
    }
}

#[async_trait]
impl RequestProcessor for StoreDirectory {
    type Request = StoreInfoRequest;

    async fn process(&self, request: StoreInfoRequest) -> Result<StoreInfoResponse, BoxedError> {
        let profile = self
            .stores
            .get(&request.store_id)
            .ok_or(StoreLookupError::UnknownStore(request.store_id))?;

        Ok(StoreInfoResponse {
            name: profile.name.clone(),
            industry: profile.industry.clone(),
            address: profile.address.clone(),
        })
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    fn directory() -> StoreDirectory {
        StoreDirectory::from_profiles(vec![StoreProfile {
            id: 42,
            name: "Cafe A".into(),
            industry: "F&B".into(),
            address: Some("1 Example Road".into()),
        }])
    }

    #[tokio::test]
    async fn answer_known_stores() {
        let response = directory()
            .process(StoreInfoRequest { store_id: 42 })
            .await
            .unwrap();

        assert_eq!(response.name, "Cafe A");
        assert_eq!(response.industry, "F&B");
    }

    #[tokio::test]
    async fn reject_unknown_stores() {
        let result = directory().process(StoreInfoRequest { store_id: 7 }).await;

        assert!(result.is_err());
    }
}

//! Connection profile resolution.
//!
//! Profiles are looked up once at startup by connector kind and cached
//! read-only for the life of the process. A missing profile is fatal:
//! nothing can be provisioned without one.

use thiserror::Error;
use tracing::info;

use flowkeeper_core::config::ProfilesConfig;

use crate::client::ControlPlaneClient;
use crate::error::ControlPlaneError;
use crate::types::ConnectionProfile;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to list connection profiles: {0}")]
    List(#[from] ControlPlaneError),

    #[error("no connection profile with connector {0:?}")]
    Missing(String),
}

/// Profile ids for the queue and the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCache {
    pub queue_profile_id: String,
    pub store_profile_id: String,
}

impl ProfileCache {
    /// Pick the profiles matching the configured connector kinds.
    ///
    /// When several profiles share a connector the last one listed wins.
    pub fn resolve(
        profiles: &[ConnectionProfile],
        config: &ProfilesConfig,
    ) -> Result<Self, ProfileError> {
        let find = |connector: &str| {
            profiles
                .iter()
                .rev()
                .find(|p| p.connector == connector)
                .map(|p| p.id.clone())
                .ok_or_else(|| ProfileError::Missing(connector.to_string()))
        };

        Ok(Self {
            queue_profile_id: find(&config.queue_connector)?,
            store_profile_id: find(&config.store_connector)?,
        })
    }

    /// List profiles from the control plane and resolve them.
    pub async fn load(
        client: &ControlPlaneClient,
        config: &ProfilesConfig,
    ) -> Result<Self, ProfileError> {
        let profiles = client.list_connection_profiles().await?;
        let cache = Self::resolve(&profiles, config)?;
        info!(
            queue_profile = %cache.queue_profile_id,
            store_profile = %cache.store_profile_id,
            "connection profiles resolved"
        );
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str, connector: &str) -> ConnectionProfile {
        ConnectionProfile {
            id: id.to_string(),
            name: format!("{connector}-profile"),
            connector: connector.to_string(),
            description: None,
        }
    }

    #[test]
    fn resolves_both_profiles() {
        let profiles = vec![profile("cp_k", "kafka"), profile("cp_s", "scylla")];
        let cache = ProfileCache::resolve(&profiles, &ProfilesConfig::default()).unwrap();
        assert_eq!(cache.queue_profile_id, "cp_k");
        assert_eq!(cache.store_profile_id, "cp_s");
    }

    #[test]
    fn last_profile_wins() {
        let profiles = vec![
            profile("cp_k1", "kafka"),
            profile("cp_s", "scylla"),
            profile("cp_k2", "kafka"),
        ];
        let cache = ProfileCache::resolve(&profiles, &ProfilesConfig::default()).unwrap();
        assert_eq!(cache.queue_profile_id, "cp_k2");
    }

    #[test]
    fn missing_store_profile_is_an_error() {
        let profiles = vec![profile("cp_k", "kafka")];
        let err = ProfileCache::resolve(&profiles, &ProfilesConfig::default()).unwrap_err();
        assert!(matches!(err, ProfileError::Missing(c) if c == "scylla"));
    }

    #[test]
    fn missing_queue_profile_is_an_error() {
        let err = ProfileCache::resolve(&[], &ProfilesConfig::default()).unwrap_err();
        assert!(matches!(err, ProfileError::Missing(c) if c == "kafka"));
    }
}

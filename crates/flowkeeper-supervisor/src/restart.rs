//! Delete-and-recreate restart of a single pipeline.

use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use flowkeeper_control::{ControlPlaneClient, ControlPlaneError, CreatePipelineRequest, PipelineSummary};
use flowkeeper_core::config::{PipelineDefaults, SupervisorConfig};

#[derive(Debug, Error)]
pub enum RestartError {
    #[error("failed to fetch pipeline {id}: {source}")]
    Fetch {
        id: String,
        #[source]
        source: ControlPlaneError,
    },

    #[error("failed to delete pipeline {id}: {source}")]
    Delete {
        id: String,
        #[source]
        source: ControlPlaneError,
    },

    /// The old pipeline is already deleted; `name` no longer exists.
    #[error("pipeline {name} ({id}) was deleted but could not be recreated: {source}")]
    Recreate {
        id: String,
        name: String,
        #[source]
        source: ControlPlaneError,
    },
}

impl RestartError {
    /// True when the pipeline was deleted and is now missing.
    pub fn pipeline_lost(&self) -> bool {
        matches!(self, RestartError::Recreate { .. })
    }
}

/// Checkpoint interval of every recreated pipeline, whatever the old
/// definition or `[pipelines]` config says.
pub const RESTART_CHECKPOINT_INTERVAL_MICROS: u64 = 60_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Pause between delete and recreate.
    pub grace: Duration,
    /// Used when the old definition carries no parallelism.
    pub default_parallelism: u32,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            grace: Duration::from_millis(500),
            default_parallelism: 1,
        }
    }
}

impl RestartPolicy {
    pub fn from_config(supervisor: &SupervisorConfig, pipelines: &PipelineDefaults) -> Self {
        Self {
            grace: supervisor.restart_grace(),
            default_parallelism: pipelines.default_parallelism.max(1),
        }
    }
}

/// Restart pipeline `id`: fetch its definition, delete it, wait out the
/// grace period, and create it again under the same name and query.
pub async fn restart_pipeline(
    client: &ControlPlaneClient,
    id: &str,
    policy: &RestartPolicy,
) -> Result<Option<PipelineSummary>, RestartError> {
    let pipeline = client
        .get_pipeline(id)
        .await
        .map_err(|source| RestartError::Fetch {
            id: id.to_string(),
            source,
        })?;

    let request = CreatePipelineRequest {
        name: pipeline.name.clone(),
        query: pipeline.query,
        parallelism: pipeline
            .parallelism
            .filter(|p| *p > 0)
            .unwrap_or(policy.default_parallelism),
        checkpoint_interval_micros: RESTART_CHECKPOINT_INTERVAL_MICROS,
        udfs: Vec::new(),
    };

    client
        .delete_pipeline(id)
        .await
        .map_err(|source| RestartError::Delete {
            id: id.to_string(),
            source,
        })?;

    tokio::time::sleep(policy.grace).await;

    match client.create_pipeline(&request).await {
        Ok(created) => {
            info!(
                old_id = %id,
                pipeline_id = created.as_ref().map(|c| c.id.as_str()).unwrap_or("unknown"),
                pipeline = %request.name,
                parallelism = request.parallelism,
                "pipeline recreated"
            );
            Ok(created)
        }
        Err(source) => {
            warn!(
                pipeline_id = %id,
                pipeline = %request.name,
                error = %source,
                "pipeline deleted but recreate failed; it must be recreated manually"
            );
            Err(RestartError::Recreate {
                id: id.to_string(),
                name: request.name,
                source,
            })
        }
    }
}

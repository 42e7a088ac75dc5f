//! Pipeline health derived from its job list.

use flowkeeper_control::{Job, JobState};

/// Health of one pipeline at sweep time. Recomputed every sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineHealth {
    /// No job is Stopped or Failed. A pipeline with no jobs is healthy.
    Healthy,
    /// At least one job is Stopped or Failed; carries the first one.
    Unhealthy {
        job_id: String,
        state: JobState,
        failure_message: Option<String>,
    },
}

impl PipelineHealth {
    pub fn assess(jobs: &[Job]) -> Self {
        match jobs.iter().find(|j| j.state.is_terminal_failure()) {
            Some(job) => PipelineHealth::Unhealthy {
                job_id: job.id.clone(),
                state: job.state.clone(),
                failure_message: job.failure_message.clone(),
            },
            None => PipelineHealth::Healthy,
        }
    }

    pub fn needs_restart(&self) -> bool {
        matches!(self, PipelineHealth::Unhealthy { .. })
    }
}

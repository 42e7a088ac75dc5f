//! flowkeeper-supervisor — keeps pipelines running.
//!
//! Every sweep lists all pipelines, inspects their jobs, and restarts any
//! pipeline with a Stopped or Failed job by deleting and recreating it
//! from its own definition.
//!
//! Restarts are not atomic: if the recreate step fails after a successful
//! delete, the pipeline stays gone and nothing brings it back. The
//! failure is surfaced as [`RestartError::Recreate`] naming the pipeline.

pub mod health;
pub mod restart;
pub mod supervisor;

pub use health::PipelineHealth;
pub use restart::{RESTART_CHECKPOINT_INTERVAL_MICROS, RestartError, RestartPolicy, restart_pipeline};
pub use supervisor::{PipelineSupervisor, SweepReport};

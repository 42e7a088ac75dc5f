//! Periodic pipeline health sweep.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use flowkeeper_control::{ControlPlaneClient, ControlPlaneError};
use flowkeeper_metrics::OrchestratorMetrics;

use crate::health::PipelineHealth;
use crate::restart::{RestartPolicy, restart_pipeline};

/// Summary of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pipelines whose jobs were listed.
    pub checked: usize,
    pub healthy: usize,
    /// Ids of pipelines restarted successfully.
    pub restarted: Vec<String>,
    /// Ids of pipelines whose restart failed at any step.
    pub restart_failed: Vec<String>,
    /// Ids of pipelines skipped because their jobs could not be listed.
    pub skipped: Vec<String>,
}

pub struct PipelineSupervisor {
    client: ControlPlaneClient,
    policy: RestartPolicy,
    metrics: Option<Arc<OrchestratorMetrics>>,
}

impl PipelineSupervisor {
    pub fn new(client: ControlPlaneClient, policy: RestartPolicy) -> Self {
        Self {
            client,
            policy,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<OrchestratorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Check every pipeline once and restart the unhealthy ones.
    ///
    /// Fails only when the pipeline listing fails. Each pipeline gets at
    /// most one restart attempt per sweep.
    pub async fn sweep(&self) -> Result<SweepReport, ControlPlaneError> {
        let pipelines = match self.client.list_pipelines().await {
            Ok(p) => p,
            Err(e) => {
                if let Some(m) = &self.metrics {
                    m.record_sweep(false);
                }
                return Err(e);
            }
        };

        let mut report = SweepReport::default();
        for pipeline in pipelines {
            let jobs = match self.client.list_jobs(&pipeline.id).await {
                Ok(jobs) => jobs,
                Err(e) => {
                    warn!(
                        pipeline_id = %pipeline.id,
                        pipeline = %pipeline.name,
                        error = %e,
                        "failed to list jobs, skipping pipeline"
                    );
                    report.skipped.push(pipeline.id);
                    continue;
                }
            };
            report.checked += 1;

            let PipelineHealth::Unhealthy {
                job_id,
                state,
                failure_message,
            } = PipelineHealth::assess(&jobs)
            else {
                report.healthy += 1;
                continue;
            };

            info!(
                pipeline_id = %pipeline.id,
                pipeline = %pipeline.name,
                job_id = %job_id,
                state = %state,
                failure_message = failure_message.as_deref().unwrap_or(""),
                "unhealthy pipeline, restarting"
            );

            let outcome = restart_pipeline(&self.client, &pipeline.id, &self.policy).await;
            if let Some(m) = &self.metrics {
                m.record_restart(outcome.is_ok());
            }
            match outcome {
                Ok(_) => report.restarted.push(pipeline.id),
                Err(e) => {
                    error!(
                        pipeline_id = %pipeline.id,
                        pipeline = %pipeline.name,
                        lost = e.pipeline_lost(),
                        error = %e,
                        "pipeline restart failed"
                    );
                    report.restart_failed.push(pipeline.id);
                }
            }
        }

        if let Some(m) = &self.metrics {
            m.record_sweep(true);
        }
        debug!(
            checked = report.checked,
            healthy = report.healthy,
            restarted = report.restarted.len(),
            restart_failed = report.restart_failed.len(),
            skipped = report.skipped.len(),
            "supervisor sweep complete"
        );
        Ok(report)
    }

    /// Sweep every `interval` until shutdown flips.
    pub async fn run(&self, interval: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!(interval_ms = interval.as_millis() as u64, "pipeline supervisor started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.sweep().await {
                        warn!(error = %e, "supervisor sweep aborted");
                    }
                }
                _ = shutdown.changed() => {
                    info!("pipeline supervisor shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowkeeper_control::mock::MockControlPlane;
    use flowkeeper_control::{Job, JobState};
    use http::Method;

    fn job(id: &str, state: JobState) -> Job {
        Job {
            id: id.to_string(),
            state,
            start_time: Some(1_700_000_000),
            failure_message: None,
        }
    }

    fn supervisor(mock: &MockControlPlane) -> PipelineSupervisor {
        PipelineSupervisor::new(
            mock.client(),
            RestartPolicy {
                grace: Duration::from_millis(50),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn healthy_and_jobless_pipelines_are_left_alone() {
        let mock = MockControlPlane::start().await;
        let running = mock.add_pipeline("running", "SELECT 1", Some(1));
        mock.set_jobs(
            &running,
            vec![job("j1", JobState::Running), job("j2", JobState::Scheduling)],
        );
        mock.add_pipeline("idle", "SELECT 1", Some(1));

        let report = supervisor(&mock).sweep().await.unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.healthy, 2);
        assert!(report.restarted.is_empty());
        assert!(mock.calls_to(&Method::POST, "/pipelines").is_empty());
        assert_eq!(mock.pipelines().len(), 2);
    }

    #[tokio::test]
    async fn failed_job_triggers_exactly_one_restart() {
        let mock = MockControlPlane::start().await;
        let id = mock.add_pipeline("p1", "INSERT INTO a SELECT * FROM b;", None);
        mock.set_jobs(
            &id,
            vec![
                job("j1", JobState::Failed),
                job("j2", JobState::Stopped),
            ],
        );
        let metrics = Arc::new(OrchestratorMetrics::new());

        let report = supervisor(&mock)
            .with_metrics(metrics.clone())
            .sweep()
            .await
            .unwrap();
        assert_eq!(report.restarted, vec![id.clone()]);
        assert_eq!(mock.calls_to(&Method::DELETE, &format!("/pipelines/{id}")).len(), 1);
        assert_eq!(mock.calls_to(&Method::POST, "/pipelines").len(), 1);

        let recreated = mock.pipeline_by_name("p1").unwrap();
        assert_eq!(recreated.query, "INSERT INTO a SELECT * FROM b;");
        assert_eq!(recreated.parallelism, Some(1));
        assert_eq!(recreated.checkpoint_interval_micros, Some(60_000_000));

        let s = metrics.snapshot();
        assert_eq!(s.supervisor_sweeps, 1);
        assert_eq!(s.restarts_succeeded, 1);
    }

    #[tokio::test]
    async fn created_response_without_body_counts_as_restarted() {
        let mock = MockControlPlane::start().await;
        let id = mock.add_pipeline("p1", "SELECT 1", Some(1));
        mock.set_jobs(&id, vec![job("j1", JobState::Failed)]);
        mock.fail(Method::POST, "/pipelines", 201, "");
        let metrics = Arc::new(OrchestratorMetrics::new());

        let report = supervisor(&mock)
            .with_metrics(metrics.clone())
            .sweep()
            .await
            .unwrap();
        assert_eq!(report.restarted, vec![id]);
        assert!(report.restart_failed.is_empty());

        let s = metrics.snapshot();
        assert_eq!(s.restarts_succeeded, 1);
        assert_eq!(s.restarts_failed, 0);
    }

    #[tokio::test]
    async fn listing_failure_aborts_sweep_and_next_one_proceeds() {
        let mock = MockControlPlane::start().await;
        let id = mock.add_pipeline("p1", "SELECT 1", Some(1));
        mock.set_jobs(&id, vec![job("j1", JobState::Failed)]);
        mock.fail(Method::GET, "/pipelines", 500, "internal error");
        let sup = supervisor(&mock);

        let err = sup.sweep().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(mock.calls_to(&Method::DELETE, &format!("/pipelines/{id}")).is_empty());

        mock.clear_failures();
        let report = sup.sweep().await.unwrap();
        assert_eq!(report.restarted, vec![id]);
    }

    #[tokio::test]
    async fn job_listing_failure_skips_only_that_pipeline() {
        let mock = MockControlPlane::start().await;
        let broken = mock.add_pipeline("broken", "SELECT 1", Some(1));
        let failed = mock.add_pipeline("failed", "SELECT 2", Some(1));
        mock.set_jobs(&failed, vec![job("j1", JobState::Stopped)]);
        mock.fail(Method::GET, &format!("/pipelines/{broken}/jobs"), 502, "bad gateway");

        let report = supervisor(&mock).sweep().await.unwrap();
        assert_eq!(report.skipped, vec![broken]);
        assert_eq!(report.restarted, vec![failed]);
        assert_eq!(report.checked, 1);
    }

    #[tokio::test]
    async fn restart_failure_is_isolated() {
        let mock = MockControlPlane::start().await;
        let a = mock.add_pipeline("a", "SELECT 1", Some(1));
        let b = mock.add_pipeline("b", "SELECT 2", Some(1));
        mock.set_jobs(&a, vec![job("ja", JobState::Failed)]);
        mock.set_jobs(&b, vec![job("jb", JobState::Failed)]);
        mock.fail(Method::DELETE, &format!("/pipelines/{a}"), 500, "locked");

        let report = supervisor(&mock).sweep().await.unwrap();
        assert_eq!(report.restart_failed, vec![a]);
        assert_eq!(report.restarted, vec![b]);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let mock = MockControlPlane::start().await;
        let sup = supervisor(&mock);
        let (tx, rx) = tokio::sync::watch::channel(false);

        let handle = tokio::spawn(async move { sup.run(Duration::from_millis(20), rx).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("supervisor should stop")
            .unwrap();
        assert!(!mock.calls_to(&Method::GET, "/pipelines").is_empty());
    }
}

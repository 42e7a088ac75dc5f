//! Topic discovery loop.
//!
//! Polls the broker's topic list and provisions each managed topic the
//! watcher has not seen before. The known set is owned by the watcher
//! task alone; a topic only enters it once provisioning succeeded, so
//! failed topics are retried on the next tick.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use flowkeeper_control::ControlPlaneClient;
use flowkeeper_core::topics::TopicClass;
use flowkeeper_metrics::OrchestratorMetrics;

use crate::catalog::{CatalogError, TopicCatalog};
use crate::provisioner::Provisioner;

/// Summary of one watcher tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Topics returned by the catalog.
    pub seen: usize,
    /// Internal, unmanaged or already-known topics.
    pub skipped: usize,
    pub provisioned: Vec<String>,
    pub failed: Vec<String>,
}

pub struct TopicWatcher {
    catalog: Arc<dyn TopicCatalog>,
    provisioner: Provisioner,
    client: ControlPlaneClient,
    known_topics: HashSet<String>,
    metrics: Option<Arc<OrchestratorMetrics>>,
}

impl TopicWatcher {
    pub fn new(
        catalog: Arc<dyn TopicCatalog>,
        provisioner: Provisioner,
        client: ControlPlaneClient,
    ) -> Self {
        Self {
            catalog,
            provisioner,
            client,
            known_topics: HashSet::new(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<OrchestratorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn known_topics(&self) -> &HashSet<String> {
        &self.known_topics
    }

    /// Seed the known set from the names of existing pipelines.
    ///
    /// Pipelines are named after their topic. If the listing fails the set
    /// stays empty and the first tick re-provisions, which is idempotent.
    pub async fn seed(&mut self) {
        match self.client.list_pipelines().await {
            Ok(pipelines) => {
                self.known_topics
                    .extend(pipelines.into_iter().map(|p| p.name));
                info!(known = self.known_topics.len(), "known topics seeded");
            }
            Err(e) => {
                warn!(error = %e, "failed to seed known topics, starting empty");
            }
        }
    }

    /// Run one discovery pass.
    ///
    /// Only a failed topic listing aborts the tick. Per-topic provisioning
    /// failures are collected in the report and a failed metadata refresh
    /// is logged.
    pub async fn tick(&mut self) -> Result<TickReport, CatalogError> {
        let topics = match self.catalog.list_topics().await {
            Ok(topics) => topics,
            Err(e) => {
                if let Some(m) = &self.metrics {
                    m.record_watcher_tick(false);
                }
                return Err(e);
            }
        };

        let mut report = TickReport {
            seen: topics.len(),
            ..Default::default()
        };

        for topic in topics {
            match self.provisioner.rules().classify(&topic) {
                TopicClass::Internal | TopicClass::Unmanaged => {
                    report.skipped += 1;
                    continue;
                }
                TopicClass::Managed(_) => {}
            }
            if self.known_topics.contains(&topic) {
                report.skipped += 1;
                continue;
            }

            match self.provisioner.provision(&topic).await {
                Ok(outcome) => {
                    info!(
                        topic = %topic,
                        ingest_table = %outcome.ingest_table,
                        destination = %outcome.destination,
                        "topic provisioned"
                    );
                    if let Some(m) = &self.metrics {
                        m.record_provision(true);
                    }
                    self.known_topics.insert(topic.clone());
                    report.provisioned.push(topic);
                }
                Err(e) => {
                    warn!(topic = %topic, error = %e, "topic provisioning failed, will retry");
                    if let Some(m) = &self.metrics {
                        m.record_provision(false);
                    }
                    report.failed.push(topic);
                }
            }
        }

        if let Err(e) = self.catalog.refresh_metadata().await {
            warn!(error = %e, "topic metadata refresh failed");
        }

        if let Some(m) = &self.metrics {
            m.record_watcher_tick(true);
        }
        debug!(
            seen = report.seen,
            skipped = report.skipped,
            provisioned = report.provisioned.len(),
            failed = report.failed.len(),
            "watcher tick complete"
        );
        Ok(report)
    }

    /// Tick immediately, then every `interval` until shutdown flips.
    pub async fn run(mut self, interval: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!(
            interval_secs = interval.as_secs(),
            known = self.known_topics.len(),
            "topic watcher started"
        );

        loop {
            if let Err(e) = self.tick().await {
                warn!(error = %e, "watcher tick aborted");
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => {
                    info!("topic watcher shutting down");
                    break;
                }
            }
        }
    }
}

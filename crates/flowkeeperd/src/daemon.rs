//! Daemon assembly: config loading and the run sequence.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info};

use flowkeeper_control::{ControlPlaneClient, ProfileCache};
use flowkeeper_core::FlowkeeperConfig;
use flowkeeper_metrics::OrchestratorMetrics;
use flowkeeper_supervisor::{PipelineSupervisor, RestartPolicy};
use flowkeeper_watcher::{Provisioner, TopicWatcher, build_catalog};

/// Command-line and environment settings that win over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub control_plane: Option<String>,
    pub brokers: Option<Vec<String>>,
    pub port: Option<u16>,
}

/// Load `path` (or defaults when absent), apply overrides and validate.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<FlowkeeperConfig> {
    let mut config = match path {
        Some(path) => FlowkeeperConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => FlowkeeperConfig::default(),
    };

    if let Some(address) = &overrides.control_plane {
        config.control_plane.address = address.clone();
    }
    if let Some(brokers) = &overrides.brokers {
        config.broker.brokers = brokers
            .iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
    }
    if let Some(port) = overrides.port {
        config.api.port = port;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// One-line-per-setting summary for `check-config`.
pub fn describe(config: &FlowkeeperConfig) -> String {
    let families: Vec<String> = config
        .watcher
        .rules
        .families
        .iter()
        .map(|f| format!("{}* -> {}", f.prefix, f.destination))
        .collect();
    format!(
        "control plane: {}{} (timeout {:?})\n\
         broker: {:?} {:?}\n\
         watcher: every {:?}, families [{}]\n\
         supervisor: every {:?}, restart grace {:?}\n\
         status api: port {}",
        config.control_plane.address,
        config.control_plane.base_path,
        config.control_plane.timeout(),
        config.broker.kind,
        config.broker.brokers,
        config.watcher.interval(),
        families.join(", "),
        config.supervisor.interval(),
        config.supervisor.restart_grace(),
        config.api.port,
    )
}

pub async fn run(config: FlowkeeperConfig) -> anyhow::Result<()> {
    info!(
        control_plane = %config.control_plane.address,
        broker_kind = ?config.broker.kind,
        "flowkeeper daemon starting"
    );

    // ── Initialize subsystems ──────────────────────────────────

    let client = ControlPlaneClient::from_config(&config.control_plane);

    // Nothing can be provisioned without both profiles.
    let profiles = ProfileCache::load(&client, &config.profiles)
        .await
        .context("resolving connection profiles")?;

    let catalog = build_catalog(&config.broker).context("building topic catalog")?;
    info!(kind = ?config.broker.kind, "topic catalog initialized");

    let metrics = Arc::new(OrchestratorMetrics::new());

    let provisioner = Provisioner::new(
        client.clone(),
        profiles,
        config.watcher.rules.clone(),
        &config.pipelines,
    )
    .with_queue_connector(&config.profiles.queue_connector);
    let mut watcher =
        TopicWatcher::new(catalog, provisioner, client.clone()).with_metrics(metrics.clone());
    watcher.seed().await;

    let supervisor = PipelineSupervisor::new(
        client.clone(),
        RestartPolicy::from_config(&config.supervisor, &config.pipelines),
    )
    .with_metrics(metrics.clone());

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watcher_shutdown = shutdown_rx.clone();
    let supervisor_shutdown = shutdown_rx;

    // ── Start background loops ─────────────────────────────────

    let watcher_interval = config.watcher.interval();
    let watcher_handle = tokio::spawn(async move {
        watcher.run(watcher_interval, watcher_shutdown).await;
    });

    let supervisor_interval = config.supervisor.interval();
    let supervisor_handle = tokio::spawn(async move {
        supervisor.run(supervisor_interval, supervisor_shutdown).await;
    });

    // ── Start status API ───────────────────────────────────────

    let router = flowkeeper_api::build_router(flowkeeper_api::ApiState { client, metrics });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding status API on {addr}"))?;
    info!(%addr, "status API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c, shutting down");
            }
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    // Loops exit at their next scheduling point.
    let _ = watcher_handle.await;
    let _ = supervisor_handle.await;

    info!("flowkeeper daemon stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    use flowkeeper_core::config::BrokerKind;

    #[test]
    fn defaults_without_a_file() {
        let config = load_config(None, &Overrides::default()).unwrap();
        assert_eq!(config.control_plane.address, "localhost:5115");
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.supervisor.interval(), Duration::from_secs(5));
    }

    #[test]
    fn overrides_win_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[control_plane]
address = "engine:5115"

[broker]
kind = "static"
brokers = ["a:9092"]
topics = ["temperatures_a"]

[api]
port = 9000
"#
        )
        .unwrap();

        let overrides = Overrides {
            control_plane: Some("arroyo:5115".into()),
            brokers: Some(vec!["k1:9092".into(), " k2:9092 ".into(), "".into()]),
            port: None,
        };
        let config = load_config(Some(file.path()), &overrides).unwrap();
        assert_eq!(config.control_plane.address, "arroyo:5115");
        assert_eq!(config.broker.brokers, vec!["k1:9092", "k2:9092"]);
        assert_eq!(config.broker.kind, BrokerKind::Static);
        assert_eq!(config.api.port, 9000);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/flowkeeper.toml")), &Overrides::default())
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/flowkeeper.toml"));
    }

    #[test]
    fn empty_address_override_fails_validation() {
        let overrides = Overrides {
            control_plane: Some("  ".into()),
            ..Default::default()
        };
        assert!(load_config(None, &overrides).is_err());
    }

    #[test]
    fn sample_config_matches_defaults() {
        let sample = FlowkeeperConfig::parse(include_str!("../../../flowkeeper.toml")).unwrap();
        let defaults = FlowkeeperConfig::default();
        assert_eq!(sample.watcher.rules, defaults.watcher.rules);
        assert_eq!(sample.supervisor.restart_grace(), defaults.supervisor.restart_grace());
        assert_eq!(
            sample.pipelines.checkpoint_interval_micros,
            defaults.pipelines.checkpoint_interval_micros
        );
    }

    #[cfg(feature = "kafka")]
    #[test]
    fn default_broker_kind_builds_in_default_build() {
        let config = load_config(None, &Overrides::default()).unwrap();
        assert_eq!(config.broker.kind, BrokerKind::Kafka);
        // Client creation does not contact the broker.
        assert!(build_catalog(&config.broker).is_ok());
    }

    #[test]
    fn describe_lists_families() {
        let config = FlowkeeperConfig::default();
        let text = describe(&config);
        assert!(text.contains("temperatures_* -> scylla_temperatures"));
        assert!(text.contains("port 8080"));
    }
}

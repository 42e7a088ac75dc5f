//! flowkeeper.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duration::parse_duration;
use crate::topics::TopicRules;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowkeeperConfig {
    #[serde(default)]
    pub control_plane: ControlPlaneConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub pipelines: PipelineDefaults,
    #[serde(default)]
    pub profiles: ProfilesConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneConfig {
    /// host:port of the stream-processing engine's HTTP API.
    #[serde(default = "default_control_plane_address")]
    pub address: String,
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default = "default_request_timeout")]
    pub timeout: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    Kafka,
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_kind")]
    pub kind: BrokerKind,
    #[serde(default = "default_brokers")]
    pub brokers: Vec<String>,
    /// Fixed topic list for `kind = "static"`.
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "default_watcher_interval")]
    pub interval: String,
    #[serde(flatten)]
    pub rules: TopicRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_supervisor_interval")]
    pub interval: String,
    #[serde(default = "default_restart_grace")]
    pub restart_grace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefaults {
    #[serde(default = "default_parallelism")]
    pub default_parallelism: u32,
    #[serde(default = "default_checkpoint_interval_micros")]
    pub checkpoint_interval_micros: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesConfig {
    #[serde(default = "default_queue_connector")]
    pub queue_connector: String,
    #[serde(default = "default_store_connector")]
    pub store_connector: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl FlowkeeperConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: FlowkeeperConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_nonzero("control_plane.timeout", &self.control_plane.timeout)?;
        check_nonzero("broker.metadata_timeout", &self.broker.metadata_timeout)?;
        check_nonzero("watcher.interval", &self.watcher.interval)?;
        check_nonzero("supervisor.interval", &self.supervisor.interval)?;
        check_duration("supervisor.restart_grace", &self.supervisor.restart_grace)?;

        if self.control_plane.address.trim().is_empty() {
            return Err(ConfigError::Invalid("control_plane.address is empty".into()));
        }
        if self.watcher.rules.families.is_empty() {
            return Err(ConfigError::Invalid("watcher.families is empty".into()));
        }
        if self.pipelines.default_parallelism == 0 {
            return Err(ConfigError::Invalid(
                "pipelines.default_parallelism must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl ControlPlaneConfig {
    pub fn timeout(&self) -> Duration {
        parse_duration(&self.timeout).unwrap_or(Duration::from_secs(10))
    }
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            address: default_control_plane_address(),
            base_path: default_base_path(),
            timeout: default_request_timeout(),
        }
    }
}

impl BrokerConfig {
    pub fn metadata_timeout(&self) -> Duration {
        parse_duration(&self.metadata_timeout).unwrap_or(Duration::from_secs(5))
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            kind: default_broker_kind(),
            brokers: default_brokers(),
            topics: Vec::new(),
            metadata_timeout: default_metadata_timeout(),
        }
    }
}

impl WatcherConfig {
    pub fn interval(&self) -> Duration {
        parse_duration(&self.interval).unwrap_or(Duration::from_secs(30))
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            interval: default_watcher_interval(),
            rules: TopicRules::default(),
        }
    }
}

impl SupervisorConfig {
    pub fn interval(&self) -> Duration {
        parse_duration(&self.interval).unwrap_or(Duration::from_secs(5))
    }

    pub fn restart_grace(&self) -> Duration {
        parse_duration(&self.restart_grace).unwrap_or(Duration::from_millis(500))
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            interval: default_supervisor_interval(),
            restart_grace: default_restart_grace(),
        }
    }
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        Self {
            default_parallelism: default_parallelism(),
            checkpoint_interval_micros: default_checkpoint_interval_micros(),
        }
    }
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            queue_connector: default_queue_connector(),
            store_connector: default_store_connector(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

fn check_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
    })
}

/// Loop intervals and timeouts of zero would busy-spin or never succeed.
fn check_nonzero(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if check_duration(field, value)?.is_zero() {
        return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
    }
    Ok(())
}

fn default_control_plane_address() -> String {
    "localhost:5115".to_string()
}

fn default_base_path() -> String {
    "/api/v1".to_string()
}

fn default_request_timeout() -> String {
    "10s".to_string()
}

fn default_broker_kind() -> BrokerKind {
    BrokerKind::Kafka
}

fn default_brokers() -> Vec<String> {
    vec!["localhost:9092".to_string()]
}

fn default_metadata_timeout() -> String {
    "5s".to_string()
}

fn default_watcher_interval() -> String {
    "30s".to_string()
}

fn default_supervisor_interval() -> String {
    "5s".to_string()
}

fn default_restart_grace() -> String {
    "500ms".to_string()
}

fn default_parallelism() -> u32 {
    1
}

fn default_checkpoint_interval_micros() -> u64 {
    60_000_000
}

fn default_queue_connector() -> String {
    "kafka".to_string()
}

fn default_store_connector() -> String {
    "scylla".to_string()
}

fn default_api_port() -> u16 {
    8080
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = FlowkeeperConfig::parse("").unwrap();
        assert_eq!(config.control_plane.address, "localhost:5115");
        assert_eq!(config.control_plane.base_path, "/api/v1");
        assert_eq!(config.control_plane.timeout(), Duration::from_secs(10));
        assert_eq!(config.broker.kind, BrokerKind::Kafka);
        assert_eq!(config.watcher.interval(), Duration::from_secs(30));
        assert_eq!(config.watcher.rules.internal_prefix, "__");
        assert_eq!(config.watcher.rules.families.len(), 3);
        assert_eq!(config.supervisor.interval(), Duration::from_secs(5));
        assert_eq!(config.supervisor.restart_grace(), Duration::from_millis(500));
        assert_eq!(config.pipelines.default_parallelism, 1);
        assert_eq!(config.pipelines.checkpoint_interval_micros, 60_000_000);
        assert_eq!(config.profiles.queue_connector, "kafka");
        assert_eq!(config.profiles.store_connector, "scylla");
        assert_eq!(config.api.port, 8080);
    }

    #[test]
    fn parse_full_document() {
        let toml_str = r#"
[control_plane]
address = "arroyo:5115"
timeout = "3s"

[broker]
kind = "static"
topics = ["temperatures_a", "__consumer_offsets"]

[watcher]
interval = "1m"
internal_prefix = "_sys"
families = [{ prefix = "wind_", destination = "scylla_wind" }]

[supervisor]
interval = "2s"
restart_grace = "250ms"

[api]
port = 9000
"#;
        let config = FlowkeeperConfig::parse(toml_str).unwrap();
        assert_eq!(config.control_plane.address, "arroyo:5115");
        assert_eq!(config.control_plane.timeout(), Duration::from_secs(3));
        assert_eq!(config.broker.kind, BrokerKind::Static);
        assert_eq!(config.broker.topics.len(), 2);
        assert_eq!(config.watcher.interval(), Duration::from_secs(60));
        assert_eq!(config.watcher.rules.internal_prefix, "_sys");
        assert_eq!(config.watcher.rules.families[0].destination, "scylla_wind");
        assert_eq!(config.supervisor.restart_grace(), Duration::from_millis(250));
        assert_eq!(config.api.port, 9000);
    }

    #[test]
    fn rejects_bad_duration() {
        let err = FlowkeeperConfig::parse("[supervisor]\ninterval = \"often\"\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration { field: "supervisor.interval", .. }
        ));
    }

    #[test]
    fn rejects_zero_loop_intervals() {
        for doc in [
            "[supervisor]\ninterval = \"0s\"\n",
            "[watcher]\ninterval = \"0\"\n",
            "[control_plane]\ntimeout = \"0ms\"\n",
        ] {
            let err = FlowkeeperConfig::parse(doc).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("greater than zero")), "{doc}");
        }
    }

    #[test]
    fn zero_restart_grace_is_allowed() {
        let config = FlowkeeperConfig::parse("[supervisor]\nrestart_grace = \"0ms\"\n").unwrap();
        assert_eq!(config.supervisor.restart_grace(), Duration::ZERO);
    }

    #[test]
    fn rejects_overflowing_duration() {
        let err = FlowkeeperConfig::parse("[watcher]\ninterval = \"400000000000000000m\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration { field: "watcher.interval", .. }));
    }

    #[test]
    fn rejects_empty_families() {
        let err = FlowkeeperConfig::parse("[watcher]\nfamilies = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_parallelism() {
        let err =
            FlowkeeperConfig::parse("[pipelines]\ndefault_parallelism = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_broker_kind() {
        assert!(matches!(
            FlowkeeperConfig::parse("[broker]\nkind = \"pulsar\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = FlowkeeperConfig::from_file(Path::new("/nonexistent/flowkeeper.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

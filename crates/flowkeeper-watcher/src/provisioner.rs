//! Idempotent per-topic resource provisioning.
//!
//! For a managed topic the provisioner creates two control-plane
//! resources: an ingest connection table reading the topic, and a
//! pipeline copying that table into the family's destination table.
//! Both are keyed by name, and a name clash counts as success, so
//! provisioning the same topic repeatedly never duplicates anything.

use thiserror::Error;
use tracing::{debug, info};

use flowkeeper_control::{
    BadDataPolicy, ConnectionSchema, ConnectionTableConfig, ConnectionTableRequest,
    ControlPlaneClient, ControlPlaneError, CreatePipelineRequest, Format, ProfileCache,
    SchemaDefinition, SourceOptions,
};
use flowkeeper_core::config::PipelineDefaults;
use flowkeeper_core::topics::{self, TopicRules};

/// JSON schema of the sensor readings carried on every managed topic.
pub const READING_SCHEMA: &str = r#"{"type":"object","properties":{"sensor_id":{"type":"string","format":"uuid"},"bucket_date":{"type":"string","format":"date"},"timestamp":{"type":"string","format":"date-time"},"value":{"type":"number"}},"required":["sensor_id","bucket_date","timestamp","value"]}"#;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("topic {0:?} does not belong to a managed family")]
    Unmanaged(String),

    #[error("failed to create ingest table {table}: {source}")]
    IngestTable {
        table: String,
        #[source]
        source: ControlPlaneError,
    },

    #[error("failed to create pipeline {pipeline}: {source}")]
    Pipeline {
        pipeline: String,
        #[source]
        source: ControlPlaneError,
    },
}

/// What `provision` did for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub ingest_table: String,
    pub pipeline: String,
    pub destination: String,
    /// False when the table already existed.
    pub ingest_created: bool,
    /// False when the pipeline already existed.
    pub pipeline_created: bool,
}

/// Creates the ingest table and pipeline for managed topics.
#[derive(Debug, Clone)]
pub struct Provisioner {
    client: ControlPlaneClient,
    profiles: ProfileCache,
    rules: TopicRules,
    parallelism: u32,
    checkpoint_interval_micros: u64,
    queue_connector: String,
}

impl Provisioner {
    pub fn new(
        client: ControlPlaneClient,
        profiles: ProfileCache,
        rules: TopicRules,
        defaults: &PipelineDefaults,
    ) -> Self {
        Self {
            client,
            profiles,
            rules,
            parallelism: defaults.default_parallelism.max(1),
            checkpoint_interval_micros: defaults.checkpoint_interval_micros,
            queue_connector: "kafka".to_string(),
        }
    }

    /// Connector type written into ingest tables; matches the one the
    /// queue profile was resolved by.
    pub fn with_queue_connector(mut self, connector: impl Into<String>) -> Self {
        self.queue_connector = connector.into();
        self
    }

    pub fn rules(&self) -> &TopicRules {
        &self.rules
    }

    /// Connection table request for the topic's ingest table.
    pub fn ingest_table_request(&self, topic: &str) -> ConnectionTableRequest {
        ConnectionTableRequest {
            name: topics::ingest_table_name(topic),
            connector: self.queue_connector.clone(),
            connection_profile_id: self.profiles.queue_profile_id.clone(),
            config: ConnectionTableConfig {
                source: SourceOptions {
                    offset: "latest".to_string(),
                    read_mode: "read_uncommitted".to_string(),
                },
                topic: topic.to_string(),
                auto_offset_reset: Some("earliest".to_string()),
                format: Format::Json {},
            },
            schema: ConnectionSchema {
                fields: Vec::new(),
                bad_data: BadDataPolicy::Drop {},
                format: Format::Json {},
                definition: SchemaDefinition::JsonSchema(READING_SCHEMA.to_string()),
            },
        }
    }

    /// Ensure the ingest table and pipeline for `topic` exist.
    pub async fn provision(&self, topic: &str) -> Result<ProvisionOutcome, ProvisionError> {
        let family = self
            .rules
            .family_of(topic)
            .ok_or_else(|| ProvisionError::Unmanaged(topic.to_string()))?;

        let ingest_table = topics::ingest_table_name(topic);
        let ingest_created = match self
            .client
            .create_connection_table(&self.ingest_table_request(topic))
            .await
        {
            Ok(table) => {
                debug!(topic, table = %table.name, table_id = %table.id, "ingest table created");
                true
            }
            Err(e) if e.is_already_exists() => {
                info!(topic, table = %ingest_table, "ingest table already exists");
                false
            }
            Err(source) => {
                return Err(ProvisionError::IngestTable {
                    table: ingest_table,
                    source,
                });
            }
        };

        let pipeline = topics::pipeline_name(topic);
        let request = CreatePipelineRequest {
            name: pipeline.clone(),
            query: topics::copy_query(&family.destination, &ingest_table),
            parallelism: self.parallelism,
            checkpoint_interval_micros: self.checkpoint_interval_micros,
            udfs: Vec::new(),
        };
        let pipeline_created = match self.client.create_pipeline(&request).await {
            Ok(created) => {
                let pipeline_id = created.as_ref().map(|c| c.id.as_str()).unwrap_or("unknown");
                debug!(topic, pipeline_id, "pipeline created");
                true
            }
            Err(e) if e.is_already_exists() => {
                info!(topic, pipeline = %pipeline, "pipeline already exists");
                false
            }
            Err(source) => return Err(ProvisionError::Pipeline { pipeline, source }),
        };

        Ok(ProvisionOutcome {
            ingest_table,
            pipeline,
            destination: family.destination.clone(),
            ingest_created,
            pipeline_created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowkeeper_control::mock::MockControlPlane;
    use http::Method;

    fn provisioner(mock: &MockControlPlane) -> Provisioner {
        Provisioner::new(
            mock.client(),
            ProfileCache {
                queue_profile_id: "cp_kafka".into(),
                store_profile_id: "cp_scylla".into(),
            },
            TopicRules::default(),
            &PipelineDefaults::default(),
        )
    }

    #[test]
    fn reading_schema_is_valid_json() {
        let schema: serde_json::Value = serde_json::from_str(READING_SCHEMA).unwrap();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, ["sensor_id", "bucket_date", "timestamp", "value"]);
        assert_eq!(schema["properties"]["sensor_id"]["format"], "uuid");
        assert_eq!(schema["properties"]["value"]["type"], "number");
    }

    #[tokio::test]
    async fn provisions_temperature_topic() {
        let mock = MockControlPlane::start().await;
        let outcome = provisioner(&mock)
            .provision("temperatures_docker")
            .await
            .unwrap();

        assert_eq!(outcome.ingest_table, "kafka_temperatures_docker");
        assert_eq!(outcome.destination, "scylla_temperatures");
        assert!(outcome.ingest_created && outcome.pipeline_created);

        let table = &mock.tables()["kafka_temperatures_docker"];
        assert_eq!(table["connector"], "kafka");
        assert_eq!(table["connectionProfileId"], "cp_kafka");
        assert_eq!(table["config"]["type"]["offset"], "latest");
        assert_eq!(table["config"]["type"]["read_mode"], "read_uncommitted");
        assert_eq!(table["config"]["autoOffsetReset"], "earliest");
        assert_eq!(table["schema"]["badData"], serde_json::json!({ "drop": {} }));
        assert_eq!(
            table["schema"]["definition"]["json_schema"].as_str(),
            Some(READING_SCHEMA)
        );

        let pipeline = mock.pipeline_by_name("temperatures_docker").unwrap();
        assert_eq!(
            pipeline.query,
            "INSERT INTO scylla_temperatures\nSELECT * FROM \"kafka_temperatures_docker\";"
        );
        assert_eq!(pipeline.parallelism, Some(1));
        assert_eq!(pipeline.checkpoint_interval_micros, Some(60_000_000));
    }

    #[tokio::test]
    async fn ingest_table_uses_configured_connector() {
        let mock = MockControlPlane::start().await;
        provisioner(&mock)
            .with_queue_connector("redpanda")
            .provision("temperatures_edge")
            .await
            .unwrap();

        let table = &mock.tables()["kafka_temperatures_edge"];
        assert_eq!(table["connector"], "redpanda");
        assert_eq!(table["connectionProfileId"], "cp_kafka");
    }

    #[tokio::test]
    async fn provisioning_twice_creates_nothing_new() {
        let mock = MockControlPlane::start().await;
        let p = provisioner(&mock);

        p.provision("humidities_lab").await.unwrap();
        let again = p.provision("humidities_lab").await.unwrap();

        assert!(!again.ingest_created);
        assert!(!again.pipeline_created);
        assert_eq!(mock.tables().len(), 1);
        assert_eq!(mock.pipelines().len(), 1);
    }

    #[tokio::test]
    async fn unmanaged_topic_makes_no_calls() {
        let mock = MockControlPlane::start().await;
        let err = provisioner(&mock).provision("orders").await.unwrap_err();
        assert!(matches!(err, ProvisionError::Unmanaged(t) if t == "orders"));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn table_failure_stops_before_pipeline() {
        let mock = MockControlPlane::start().await;
        mock.fail(Method::POST, "/connection_tables", 500, "boom");

        let err = provisioner(&mock).provision("ph_levels_a").await.unwrap_err();
        assert!(matches!(err, ProvisionError::IngestTable { ref table, .. } if table == "kafka_ph_levels_a"));
        assert!(mock.calls_to(&Method::POST, "/pipelines").is_empty());
    }

    #[tokio::test]
    async fn pipeline_failure_is_reported() {
        let mock = MockControlPlane::start().await;
        mock.fail(Method::POST, "/pipelines", 503, "engine busy");

        let err = provisioner(&mock).provision("ph_levels_a").await.unwrap_err();
        match err {
            ProvisionError::Pipeline { pipeline, source } => {
                assert_eq!(pipeline, "ph_levels_a");
                assert_eq!(source.status(), Some(503));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

//! Control-plane wire records.
//!
//! Every response envelope gets an explicit type. Unknown fields are
//! ignored; missing required fields fail decoding.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `{ "data": [...] }` list envelope used by every list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEnvelope<T> {
    pub data: Vec<T>,
}

/// Entry of `GET /pipelines`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// Full pipeline definition from `GET /pipelines/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_interval_micros: Option<u64>,
}

/// Body of `POST /pipelines`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePipelineRequest {
    pub name: String,
    pub query: String,
    pub parallelism: u32,
    pub checkpoint_interval_micros: u64,
    #[serde(default)]
    pub udfs: Vec<serde_json::Value>,
}

/// Execution state of a job.
///
/// States the engine reports beyond the four tracked here are kept
/// verbatim in `Other`; only `Stopped` and `Failed` count as unhealthy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    Scheduling,
    Running,
    Stopped,
    Failed,
    Other(String),
}

impl JobState {
    /// Stopped or Failed.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, JobState::Stopped | JobState::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobState::Scheduling => "Scheduling",
            JobState::Running => "Running",
            JobState::Stopped => "Stopped",
            JobState::Failed => "Failed",
            JobState::Other(s) => s,
        }
    }
}

impl From<String> for JobState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Scheduling" => JobState::Scheduling,
            "Running" => JobState::Running,
            "Stopped" => JobState::Stopped,
            "Failed" => JobState::Failed,
            _ => JobState::Other(s),
        }
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of `GET /pipelines/{id}/jobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

/// Entry of `GET /connection_profiles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub id: String,
    pub name: String,
    pub connector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `POST /connection_tables`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTableRequest {
    pub name: String,
    pub connector: String,
    pub connection_profile_id: String,
    pub config: ConnectionTableConfig,
    pub schema: ConnectionSchema,
}

/// Connector-specific table config for a queue source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTableConfig {
    #[serde(rename = "type")]
    pub source: SourceOptions,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_offset_reset: Option<String>,
    pub format: Format,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOptions {
    pub offset: String,
    pub read_mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSchema {
    #[serde(default)]
    pub fields: Vec<serde_json::Value>,
    pub bad_data: BadDataPolicy,
    pub format: Format,
    pub definition: SchemaDefinition,
}

/// Serialized as `{"json": {}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Json {},
}

/// Serialized as `{"drop": {}}` / `{"fail": {}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadDataPolicy {
    Drop {},
    Fail {},
}

/// Serialized as `{"json_schema": "<schema text>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaDefinition {
    JsonSchema(String),
}

/// Response of `POST /connection_tables`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTable {
    pub id: String,
    pub name: String,
}

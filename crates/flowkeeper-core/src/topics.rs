//! Topic naming rules.
//!
//! Everything the watcher and provisioner derive from a topic name lives
//! here: whether the topic is managed at all, which destination table its
//! family writes into, and the names of the resources created for it.
//! All of these are pure functions of the topic name, so provisioning the
//! same topic twice always targets the same resources.

use serde::{Deserialize, Serialize};

/// Prefix of every ingest connection table name.
pub const INGEST_TABLE_PREFIX: &str = "kafka_";

/// A family of managed topics sharing a prefix and a destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicFamily {
    /// Topic name prefix, e.g. `temperatures_`.
    pub prefix: String,
    /// Destination connection table in the wide-column store.
    pub destination: String,
}

impl TopicFamily {
    pub fn new(prefix: &str, destination: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            destination: destination.to_string(),
        }
    }
}

/// How the watcher should treat a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicClass<'a> {
    /// Broker-internal topic (reserved prefix).
    Internal,
    /// Not part of any managed family.
    Unmanaged,
    /// Managed; provision into the family's destination.
    Managed(&'a TopicFamily),
}

/// The managed-topic allow-list plus the reserved internal marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRules {
    #[serde(default = "default_internal_prefix")]
    pub internal_prefix: String,
    #[serde(default = "default_families")]
    pub families: Vec<TopicFamily>,
}

impl Default for TopicRules {
    fn default() -> Self {
        Self {
            internal_prefix: default_internal_prefix(),
            families: default_families(),
        }
    }
}

impl TopicRules {
    /// Classify a topic name. Internal wins over any family match.
    pub fn classify(&self, topic: &str) -> TopicClass<'_> {
        if !self.internal_prefix.is_empty() && topic.starts_with(&self.internal_prefix) {
            return TopicClass::Internal;
        }
        match self.family_of(topic) {
            Some(family) => TopicClass::Managed(family),
            None => TopicClass::Unmanaged,
        }
    }

    /// First family whose prefix the topic starts with.
    pub fn family_of(&self, topic: &str) -> Option<&TopicFamily> {
        self.families.iter().find(|f| topic.starts_with(&f.prefix))
    }

    /// Whether the watcher should provision this topic.
    pub fn is_managed(&self, topic: &str) -> bool {
        matches!(self.classify(topic), TopicClass::Managed(_))
    }
}

/// Name of the ingest connection table bound to `topic`.
pub fn ingest_table_name(topic: &str) -> String {
    format!("{INGEST_TABLE_PREFIX}{topic}")
}

/// Name of the pipeline that drains `topic`.
///
/// The watcher seeds its known set from existing pipeline names, so this
/// must stay the identity.
pub fn pipeline_name(topic: &str) -> String {
    topic.to_string()
}

/// Query text copying every ingested row into the destination table.
pub fn copy_query(destination: &str, ingest_table: &str) -> String {
    format!("INSERT INTO {destination}\nSELECT * FROM \"{ingest_table}\";")
}

fn default_internal_prefix() -> String {
    "__".to_string()
}

fn default_families() -> Vec<TopicFamily> {
    vec![
        TopicFamily::new("temperatures_", "scylla_temperatures"),
        TopicFamily::new("humidities_", "scylla_humidities"),
        TopicFamily::new("ph_levels_", "scylla_ph_levels"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn managed_topics_resolve_their_family() {
        let rules = TopicRules::default();
        match rules.classify("temperatures_docker") {
            TopicClass::Managed(f) => assert_eq!(f.destination, "scylla_temperatures"),
            other => panic!("unexpected class: {other:?}"),
        }
        match rules.classify("humidities_greenhouse") {
            TopicClass::Managed(f) => assert_eq!(f.destination, "scylla_humidities"),
            other => panic!("unexpected class: {other:?}"),
        }
        match rules.classify("ph_levels_field_7") {
            TopicClass::Managed(f) => assert_eq!(f.destination, "scylla_ph_levels"),
            other => panic!("unexpected class: {other:?}"),
        }
    }

    #[test]
    fn internal_topics_are_never_managed() {
        let rules = TopicRules::default();
        assert_eq!(rules.classify("__consumer_offsets"), TopicClass::Internal);
        // Even if the remainder looks like a family.
        assert_eq!(rules.classify("__temperatures_x"), TopicClass::Internal);
        assert!(!rules.is_managed("__consumer_offsets"));
    }

    #[test]
    fn unknown_prefixes_are_unmanaged() {
        let rules = TopicRules::default();
        assert_eq!(rules.classify("pressure_docker"), TopicClass::Unmanaged);
        assert_eq!(rules.classify("temperatures"), TopicClass::Unmanaged);
        assert_eq!(rules.classify(""), TopicClass::Unmanaged);
    }

    #[test]
    fn empty_internal_prefix_disables_the_check() {
        let rules = TopicRules {
            internal_prefix: String::new(),
            families: vec![TopicFamily::new("__x_", "dest")],
        };
        assert!(rules.is_managed("__x_topic"));
    }

    #[test]
    fn derived_names_are_deterministic() {
        assert_eq!(ingest_table_name("temperatures_docker"), "kafka_temperatures_docker");
        assert_eq!(pipeline_name("temperatures_docker"), "temperatures_docker");
        assert_eq!(
            copy_query("scylla_temperatures", "kafka_temperatures_docker"),
            copy_query("scylla_temperatures", "kafka_temperatures_docker"),
        );
    }

    #[test]
    fn copy_query_targets_destination_and_quotes_source() {
        let q = copy_query("scylla_humidities", "kafka_humidities_a");
        assert!(q.starts_with("INSERT INTO scylla_humidities"));
        assert!(q.contains("SELECT * FROM \"kafka_humidities_a\";"));
    }
}

//! flowkeeper-watcher — topic discovery and provisioning.
//!
//! The watcher polls the broker's topic catalog, and for every managed
//! topic it has not seen before, asks the provisioner to create the
//! ingest connection table and the pipeline that drains it.
//!
//! # Architecture
//!
//! ```text
//! TopicWatcher (owns known_topics, single task)
//!   ├── seed()  ← existing pipeline names
//!   ├── tick()
//!   │   ├── TopicCatalog::list_topics()
//!   │   ├── TopicRules::classify() → skip internal / unmanaged / known
//!   │   ├── Provisioner::provision(topic)
//!   │   └── TopicCatalog::refresh_metadata()
//!   └── run() → tick every interval until shutdown
//! ```
//!
//! # Idempotency
//!
//! `known_topics` is only a fast path. Both provisioning steps treat
//! "already exists" from the control plane as success, so a restart of
//! the daemon (or a second watcher) never duplicates resources.

pub mod catalog;
pub mod provisioner;
pub mod watcher;

pub use catalog::{CatalogError, StaticCatalog, TopicCatalog, build_catalog};
pub use provisioner::{ProvisionError, ProvisionOutcome, Provisioner};
pub use watcher::{TickReport, TopicWatcher};

pub mod config;
pub mod duration;
pub mod topics;

pub use config::{ConfigError, FlowkeeperConfig};
pub use duration::parse_duration;
pub use topics::{TopicClass, TopicFamily, TopicRules};

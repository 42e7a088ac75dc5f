//! Topic catalog sources.
//!
//! The watcher only needs two side-effect-free reads from the broker:
//! the current topic list and a metadata refresh. Backends are injected
//! behind [`TopicCatalog`] so tests and static deployments don't need a
//! broker.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use flowkeeper_core::config::{BrokerConfig, BrokerKind};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to list topics: {0}")]
    List(String),

    #[error("failed to refresh metadata: {0}")]
    Refresh(String),

    #[error("failed to create broker client: {0}")]
    Client(String),

    #[error("broker kind {0:?} is not supported by this build")]
    Unsupported(String),
}

/// Boxed future returned by catalog operations.
pub type CatalogFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CatalogError>> + Send + 'a>>;

/// Read-only view over the broker's topic metadata.
pub trait TopicCatalog: Send + Sync {
    /// Current topic names, from the last metadata the catalog holds.
    fn list_topics(&self) -> CatalogFuture<'_, Vec<String>>;

    /// Re-read metadata from the broker so the next listing is current.
    fn refresh_metadata(&self) -> CatalogFuture<'_, ()>;
}

/// Fixed topic list, replaceable at runtime.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    topics: RwLock<Vec<String>>,
}

impl StaticCatalog {
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: RwLock::new(topics.into_iter().map(Into::into).collect()),
        }
    }

    pub fn set_topics<I, S>(&self, topics: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        // A plain Vec stays valid across a panicking writer.
        let mut guard = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        *guard = topics.into_iter().map(Into::into).collect();
    }
}

impl TopicCatalog for StaticCatalog {
    fn list_topics(&self) -> CatalogFuture<'_, Vec<String>> {
        let topics = self
            .topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Box::pin(async move { Ok(topics) })
    }

    fn refresh_metadata(&self) -> CatalogFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

/// Build the catalog selected by `[broker] kind`.
pub fn build_catalog(config: &BrokerConfig) -> Result<Arc<dyn TopicCatalog>, CatalogError> {
    match config.kind {
        BrokerKind::Static => Ok(Arc::new(StaticCatalog::new(config.topics.clone()))),
        #[cfg(feature = "kafka")]
        BrokerKind::Kafka => Ok(Arc::new(kafka::KafkaCatalog::connect(
            &config.brokers,
            config.metadata_timeout(),
        )?)),
        #[cfg(not(feature = "kafka"))]
        BrokerKind::Kafka => Err(CatalogError::Unsupported("kafka".to_string())),
    }
}

#[cfg(feature = "kafka")]
pub mod kafka {
    //! Kafka metadata via librdkafka.

    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;

    use rdkafka::ClientConfig;
    use rdkafka::consumer::{BaseConsumer, Consumer};
    use tracing::debug;

    use super::{CatalogError, CatalogFuture, TopicCatalog};

    /// Topic catalog backed by broker metadata requests.
    ///
    /// `list_topics` serves the cached metadata; only the first call and
    /// `refresh_metadata` go to the broker.
    pub struct KafkaCatalog {
        consumer: Arc<BaseConsumer>,
        timeout: Duration,
        cached: Arc<Mutex<Option<Vec<String>>>>,
    }

    impl KafkaCatalog {
        pub fn connect(brokers: &[String], timeout: Duration) -> Result<Self, CatalogError> {
            let consumer: BaseConsumer = ClientConfig::new()
                .set("bootstrap.servers", brokers.join(","))
                .set("client.id", "flowkeeper-watcher")
                .create()
                .map_err(|e| CatalogError::Client(e.to_string()))?;
            Ok(Self {
                consumer: Arc::new(consumer),
                timeout,
                cached: Arc::new(Mutex::new(None)),
            })
        }

        async fn fetch(&self) -> Result<Vec<String>, String> {
            let consumer = Arc::clone(&self.consumer);
            let timeout = self.timeout;
            // fetch_metadata blocks on the broker round-trip.
            let topics = tokio::task::spawn_blocking(move || {
                consumer
                    .fetch_metadata(None, timeout)
                    .map(|md| {
                        md.topics()
                            .iter()
                            .map(|t| t.name().to_string())
                            .collect::<Vec<_>>()
                    })
                    .map_err(|e| e.to_string())
            })
            .await
            .map_err(|e| e.to_string())??;

            debug!(count = topics.len(), "kafka metadata fetched");
            *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = Some(topics.clone());
            Ok(topics)
        }
    }

    impl TopicCatalog for KafkaCatalog {
        fn list_topics(&self) -> CatalogFuture<'_, Vec<String>> {
            Box::pin(async move {
                let cached = self
                    .cached
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                match cached {
                    Some(topics) => Ok(topics),
                    None => self.fetch().await.map_err(CatalogError::List),
                }
            })
        }

        fn refresh_metadata(&self) -> CatalogFuture<'_, ()> {
            Box::pin(async move { self.fetch().await.map(|_| ()).map_err(CatalogError::Refresh) })
        }
    }
}

//! flowkeeper-control — client for the stream-processing engine's control API.
//!
//! A thin, stateless JSON-over-HTTP client plus typed operations for the
//! resources flowkeeper manages.
//!
//! # Endpoints
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | GET | `/pipelines` | [`ControlPlaneClient::list_pipelines`] |
//! | GET | `/pipelines/{id}` | [`ControlPlaneClient::get_pipeline`] |
//! | DELETE | `/pipelines/{id}` | [`ControlPlaneClient::delete_pipeline`] |
//! | POST | `/pipelines` | [`ControlPlaneClient::create_pipeline`] |
//! | GET | `/pipelines/{id}/jobs` | [`ControlPlaneClient::list_jobs`] |
//! | GET | `/connection_profiles` | [`ControlPlaneClient::list_connection_profiles`] |
//! | POST | `/connection_tables` | [`ControlPlaneClient::create_connection_table`] |
//!
//! Non-2xx answers become [`ControlPlaneError::Status`] with the body text,
//! except name clashes, which become [`ControlPlaneError::AlreadyExists`].
//! There are no retries at this layer.

pub mod api;
pub mod client;
pub mod error;
pub mod profiles;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{ControlPlaneClient, RawResponse};
pub use error::{ControlPlaneError, ControlPlaneResult};
pub use profiles::{ProfileCache, ProfileError};
pub use types::*;

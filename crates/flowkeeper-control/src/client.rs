//! HTTP transport to the stream-processing engine's control API.
//!
//! One short-lived HTTP/1 connection per call, each bounded by the client
//! timeout. The client holds no mutable state, so clones can be used from
//! the watcher, the supervisor and the status API at the same time.

use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ControlPlaneError, ControlPlaneResult};

/// A fully-read control-plane response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl RawResponse {
    /// Body as lossy UTF-8, for logs and error messages.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> ControlPlaneResult<T> {
        serde_json::from_slice(&self.body).map_err(ControlPlaneError::Decode)
    }

    /// Turn a non-2xx answer into an error carrying status and body.
    pub fn error_for_status(self) -> ControlPlaneResult<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }

    /// Accept only the listed statuses.
    pub fn expect_status(self, accepted: &[StatusCode]) -> ControlPlaneResult<Self> {
        if accepted.contains(&self.status) {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }

    fn into_error(self) -> ControlPlaneError {
        let body = self.text();
        if self.status == StatusCode::CONFLICT || body.to_ascii_lowercase().contains("already exists")
        {
            ControlPlaneError::AlreadyExists(body)
        } else {
            ControlPlaneError::Status {
                status: self.status.as_u16(),
                body,
            }
        }
    }
}

/// Stateless control-plane client.
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    /// host:port
    address: String,
    /// Prefix prepended to every request path, e.g. `/api/v1`.
    base_path: String,
    timeout: Duration,
}

impl ControlPlaneClient {
    pub fn new(address: &str, base_path: &str, timeout: Duration) -> Self {
        let address = address
            .trim()
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        let base_path = base_path.trim_end_matches('/').to_string();
        Self {
            address,
            base_path,
            timeout,
        }
    }

    pub fn from_config(config: &flowkeeper_core::config::ControlPlaneConfig) -> Self {
        Self::new(&config.address, &config.base_path, config.timeout())
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `GET path`; non-2xx is an error.
    pub async fn get(&self, path: &str) -> ControlPlaneResult<RawResponse> {
        self.send(Method::GET, path, None).await?.error_for_status()
    }

    /// `POST path` with a JSON body; non-2xx is an error.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ControlPlaneResult<RawResponse> {
        let body = serde_json::to_vec(body).map_err(ControlPlaneError::Encode)?;
        self.send(Method::POST, path, Some(body)).await?.error_for_status()
    }

    /// `DELETE path` with an optional JSON body; non-2xx is an error.
    pub async fn delete<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> ControlPlaneResult<RawResponse> {
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(ControlPlaneError::Encode)?;
        self.send(Method::DELETE, path, body).await?.error_for_status()
    }

    /// Issue a request and return whatever the server answered.
    ///
    /// Only transport failures and timeouts are errors here.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> ControlPlaneResult<RawResponse> {
        let full_path = format!("{}{}", self.base_path, path);

        match tokio::time::timeout(self.timeout, self.exchange(&method, &full_path, body)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(%method, path = %full_path, "control plane request timed out");
                Err(ControlPlaneError::Timeout {
                    method,
                    path: full_path,
                    timeout: self.timeout,
                })
            }
        }
    }

    async fn exchange(
        &self,
        method: &Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> ControlPlaneResult<RawResponse> {
        let stream = tokio::net::TcpStream::connect(&self.address)
            .await
            .map_err(|source| ControlPlaneError::Connect {
                address: self.address.clone(),
                source,
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "control plane connection closed with error");
            }
        });

        let mut builder = http::Request::builder()
            .method(method.clone())
            .uri(path)
            .header(http::header::HOST, &self.address)
            .header(http::header::USER_AGENT, "flowkeeper/0.1")
            .header(http::header::ACCEPT, "application/json");

        let payload = match body {
            Some(bytes) => {
                builder = builder.header(http::header::CONTENT_TYPE, "application/json");
                Bytes::from(bytes)
            }
            None => Bytes::new(),
        };

        let req = builder.body(Full::new(payload))?;
        let resp = sender.send_request(req).await?;
        let status = resp.status();
        let body = resp.into_body().collect().await?.to_bytes();

        debug!(%method, %path, status = status.as_u16(), "control plane response");
        Ok(RawResponse { status, body })
    }
}

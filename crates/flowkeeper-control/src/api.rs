//! Typed control-plane operations.

use http::{Method, StatusCode};
use tracing::debug;

use crate::client::ControlPlaneClient;
use crate::error::ControlPlaneResult;
use crate::types::*;

impl ControlPlaneClient {
    /// `GET /pipelines`
    pub async fn list_pipelines(&self) -> ControlPlaneResult<Vec<PipelineSummary>> {
        let envelope: ListEnvelope<PipelineSummary> = self.get("/pipelines").await?.json()?;
        Ok(envelope.data)
    }

    /// `GET /pipelines/{id}`
    pub async fn get_pipeline(&self, id: &str) -> ControlPlaneResult<Pipeline> {
        self.get(&format!("/pipelines/{id}")).await?.json()
    }

    /// `DELETE /pipelines/{id}`; only 200 and 204 count as deleted.
    pub async fn delete_pipeline(&self, id: &str) -> ControlPlaneResult<()> {
        self.delete::<()>(&format!("/pipelines/{id}"), None)
            .await?
            .expect_status(&[StatusCode::OK, StatusCode::NO_CONTENT])?;
        debug!(pipeline_id = %id, "pipeline deleted");
        Ok(())
    }

    /// `POST /pipelines`; only 200 and 201 count as created.
    ///
    /// The status alone decides success. The created pipeline is returned
    /// when the body decodes as one, `None` otherwise.
    pub async fn create_pipeline(
        &self,
        req: &CreatePipelineRequest,
    ) -> ControlPlaneResult<Option<PipelineSummary>> {
        let body = serde_json::to_vec(req).map_err(crate::ControlPlaneError::Encode)?;
        let resp = self
            .send(Method::POST, "/pipelines", Some(body))
            .await?
            .expect_status(&[StatusCode::OK, StatusCode::CREATED])?;
        match resp.json::<PipelineSummary>() {
            Ok(created) => Ok(Some(created)),
            Err(e) => {
                debug!(pipeline = %req.name, error = %e, "create response body not decodable");
                Ok(None)
            }
        }
    }

    /// `GET /pipelines/{id}/jobs`
    pub async fn list_jobs(&self, pipeline_id: &str) -> ControlPlaneResult<Vec<Job>> {
        let envelope: ListEnvelope<Job> = self
            .get(&format!("/pipelines/{pipeline_id}/jobs"))
            .await?
            .json()?;
        Ok(envelope.data)
    }

    /// `GET /connection_profiles`
    pub async fn list_connection_profiles(&self) -> ControlPlaneResult<Vec<ConnectionProfile>> {
        let envelope: ListEnvelope<ConnectionProfile> =
            self.get("/connection_profiles").await?.json()?;
        Ok(envelope.data)
    }

    /// `POST /connection_tables`
    ///
    /// A name clash comes back as `ControlPlaneError::AlreadyExists`.
    pub async fn create_connection_table(
        &self,
        req: &ConnectionTableRequest,
    ) -> ControlPlaneResult<ConnectionTable> {
        self.post("/connection_tables", req).await?.json()
    }
}

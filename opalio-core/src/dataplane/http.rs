use super::{ConnectionHandle, DataService};
use crate::error::{OpalError, Result};
use crate::types::{ContainerData, NodeInfo};
use async_trait::async_trait;
use reqwest::{Url, header};
use serde::{Deserialize, Serialize};

const TRACE_ID_HEADER: &str = "x-opalio-trace-id";

#[derive(Debug, Serialize)]
struct CreatePipelineRequest<'a> {
    pipeline_id: &'a str,
    members: &'a [NodeInfo],
}

#[derive(Debug, Deserialize)]
struct ReadContainerResponse {
    container: ContainerData,
}

/// HTTP client for a pipeline's data-service endpoint. Requests go to the
/// pipeline leader recorded in the connection handle.
#[derive(Debug, Clone, Default)]
pub struct HttpDataService;

impl HttpDataService {
    pub fn new() -> Self {
        Self
    }

    fn container_url(handle: &ConnectionHandle, container_id: u64) -> Result<Url> {
        Url::parse(&format!(
            "http://{}/internal/v1/containers/{}",
            handle.leader().address,
            container_id
        ))
        .map_err(|error| OpalError::Rpc(error.to_string()))
    }

    fn pipelines_url(handle: &ConnectionHandle) -> Result<Url> {
        Url::parse(&format!(
            "http://{}/internal/v1/pipelines",
            handle.leader().address
        ))
        .map_err(|error| OpalError::Rpc(error.to_string()))
    }
}

#[async_trait]
impl DataService for HttpDataService {
    async fn create_container(
        &self,
        handle: &ConnectionHandle,
        container_id: u64,
        trace_id: &str,
    ) -> Result<()> {
        let response = handle
            .http()
            .post(Self::container_url(handle, container_id)?)
            .header(TRACE_ID_HEADER, trace_id)
            .send()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))?;

        if !response.status().is_success() {
            return Err(OpalError::Rpc(format!(
                "container create failed: node={} status={} container={}",
                handle.leader().node_id,
                response.status(),
                container_id
            )));
        }

        Ok(())
    }

    async fn delete_container(
        &self,
        handle: &ConnectionHandle,
        container_id: u64,
        force: bool,
        trace_id: &str,
    ) -> Result<()> {
        let mut url = Self::container_url(handle, container_id)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("force", &force.to_string());
        }

        let response = handle
            .http()
            .delete(url)
            .header(TRACE_ID_HEADER, trace_id)
            .send()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))?;

        if !response.status().is_success() {
            return Err(OpalError::Rpc(format!(
                "container delete failed: node={} status={} container={} force={}",
                handle.leader().node_id,
                response.status(),
                container_id,
                force
            )));
        }

        Ok(())
    }

    async fn close_container(
        &self,
        handle: &ConnectionHandle,
        container_id: u64,
        trace_id: &str,
    ) -> Result<()> {
        let url = Url::parse(&format!(
            "http://{}/internal/v1/containers/{}/close",
            handle.leader().address,
            container_id
        ))
        .map_err(|error| OpalError::Rpc(error.to_string()))?;

        let response = handle
            .http()
            .post(url)
            .header(TRACE_ID_HEADER, trace_id)
            .send()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))?;

        if !response.status().is_success() {
            return Err(OpalError::Rpc(format!(
                "container close failed: node={} status={} container={}",
                handle.leader().node_id,
                response.status(),
                container_id
            )));
        }

        Ok(())
    }

    async fn read_container(
        &self,
        handle: &ConnectionHandle,
        container_id: u64,
        trace_id: &str,
    ) -> Result<ContainerData> {
        let response = handle
            .http()
            .get(Self::container_url(handle, container_id)?)
            .header(TRACE_ID_HEADER, trace_id)
            .send()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))?;

        if !response.status().is_success() {
            return Err(OpalError::Rpc(format!(
                "container read failed: node={} status={} container={}",
                handle.leader().node_id,
                response.status(),
                container_id
            )));
        }

        let payload: ReadContainerResponse = response
            .json()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))?;

        Ok(payload.container)
    }

    async fn create_pipeline(
        &self,
        handle: &ConnectionHandle,
        pipeline_id: &str,
        members: &[NodeInfo],
    ) -> Result<()> {
        let payload = CreatePipelineRequest {
            pipeline_id,
            members,
        };

        let response = handle
            .http()
            .post(Self::pipelines_url(handle)?)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))?;

        if !response.status().is_success() {
            return Err(OpalError::Rpc(format!(
                "pipeline create failed: node={} status={} pipeline={}",
                handle.leader().node_id,
                response.status(),
                pipeline_id
            )));
        }

        Ok(())
    }
}

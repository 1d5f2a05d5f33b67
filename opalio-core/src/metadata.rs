//! Placement service facade.
//!
//! The placement service owns container allocation, pipeline bookkeeping and
//! node queries. This module exposes it behind a trait so the coordinator can
//! be exercised against test doubles.

use crate::error::{OpalError, Result};
use crate::types::{
    ContainerRecord, NodePool, NodeState, Pipeline, QueryScope, ReplicationSpec, StageOp,
    StagePhase, StageSubject,
};
use async_trait::async_trait;
use reqwest::{Client, Url, header};
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Allocate a new container and the pipeline that will host it.
    async fn allocate_container(
        &self,
        replication: ReplicationSpec,
        owner: &str,
    ) -> Result<ContainerRecord>;

    /// Report that a lifecycle operation on a container or pipeline has
    /// begun or completed.
    async fn notify_stage_change(
        &self,
        subject: StageSubject,
        subject_id: &str,
        op: StageOp,
        phase: StagePhase,
    ) -> Result<()>;

    /// Remove a container from the placement service index.
    async fn delete_container(&self, container_id: u64) -> Result<()>;

    /// Fetch the record of an existing container.
    async fn get_container(&self, container_id: u64) -> Result<ContainerRecord>;

    /// List container records ordered by id, starting at `start_id`.
    async fn list_container(&self, start_id: u64, count: u32) -> Result<Vec<ContainerRecord>>;

    /// Return the nodes matching the given state filter within a scope.
    async fn query_node(
        &self,
        states: &[NodeState],
        scope: QueryScope,
        pool_name: &str,
    ) -> Result<NodePool>;

    /// Ask the placement service to register a replication pipeline over the
    /// given node pool.
    async fn create_replication_pipeline(
        &self,
        replication: ReplicationSpec,
        pool: &NodePool,
    ) -> Result<Pipeline>;
}

#[derive(Debug, Serialize)]
struct AllocateContainerRequest<'a> {
    replication: ReplicationSpec,
    owner: &'a str,
}

#[derive(Debug, Serialize)]
struct StageChangeRequest<'a> {
    subject: StageSubject,
    subject_id: &'a str,
    op: StageOp,
    phase: StagePhase,
}

#[derive(Debug, Serialize)]
struct QueryNodeRequest<'a> {
    states: &'a [NodeState],
    scope: QueryScope,
    pool_name: &'a str,
}

#[derive(Debug, Serialize)]
struct CreatePipelineRequest<'a> {
    replication: ReplicationSpec,
    node_pool: &'a NodePool,
}

#[derive(Debug, Deserialize)]
struct ListContainerResponse {
    containers: Vec<ContainerRecord>,
}

/// HTTP client for the placement service.
#[derive(Clone)]
pub struct HttpMetadataService {
    client: Client,
    metadata_addr: String,
}

impl HttpMetadataService {
    pub fn new(metadata_addr: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            metadata_addr: metadata_addr.into(),
        }
    }

    fn containers_url(&self) -> Result<Url> {
        Url::parse(&format!("http://{}/v1/containers", self.metadata_addr))
            .map_err(|error| OpalError::Rpc(error.to_string()))
    }

    fn container_url(&self, container_id: u64) -> Result<Url> {
        Url::parse(&format!(
            "http://{}/v1/containers/{}",
            self.metadata_addr, container_id
        ))
        .map_err(|error| OpalError::Rpc(error.to_string()))
    }

    fn endpoint_url(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("http://{}{}", self.metadata_addr, path))
            .map_err(|error| OpalError::Rpc(error.to_string()))
    }
}

#[async_trait]
impl MetadataService for HttpMetadataService {
    async fn allocate_container(
        &self,
        replication: ReplicationSpec,
        owner: &str,
    ) -> Result<ContainerRecord> {
        let payload = AllocateContainerRequest { replication, owner };

        let response = self
            .client
            .post(self.containers_url()?)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))?;

        if !response.status().is_success() {
            return Err(OpalError::Rpc(format!(
                "container allocation failed: status={} owner={}",
                response.status(),
                owner
            )));
        }

        response
            .json()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))
    }

    async fn notify_stage_change(
        &self,
        subject: StageSubject,
        subject_id: &str,
        op: StageOp,
        phase: StagePhase,
    ) -> Result<()> {
        let payload = StageChangeRequest {
            subject,
            subject_id,
            op,
            phase,
        };

        let response = self
            .client
            .post(self.endpoint_url("/v1/stage-changes")?)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))?;

        if !response.status().is_success() {
            return Err(OpalError::Rpc(format!(
                "stage change notification failed: status={} subject={:?} id={} op={:?} phase={:?}",
                response.status(),
                subject,
                subject_id,
                op,
                phase
            )));
        }

        Ok(())
    }

    async fn delete_container(&self, container_id: u64) -> Result<()> {
        let response = self
            .client
            .delete(self.container_url(container_id)?)
            .send()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))?;

        if !response.status().is_success() {
            return Err(OpalError::Rpc(format!(
                "container index delete failed: status={} container={}",
                response.status(),
                container_id
            )));
        }

        Ok(())
    }

    async fn get_container(&self, container_id: u64) -> Result<ContainerRecord> {
        let response = self
            .client
            .get(self.container_url(container_id)?)
            .send()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))?;

        if !response.status().is_success() {
            return Err(OpalError::Rpc(format!(
                "container fetch failed: status={} container={}",
                response.status(),
                container_id
            )));
        }

        response
            .json()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))
    }

    async fn list_container(&self, start_id: u64, count: u32) -> Result<Vec<ContainerRecord>> {
        let mut url = self.containers_url()?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("start", &start_id.to_string());
            pairs.append_pair("count", &count.to_string());
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))?;

        if !response.status().is_success() {
            return Err(OpalError::Rpc(format!(
                "container listing failed: status={} start={} count={}",
                response.status(),
                start_id,
                count
            )));
        }

        let payload: ListContainerResponse = response
            .json()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))?;

        Ok(payload.containers)
    }

    async fn query_node(
        &self,
        states: &[NodeState],
        scope: QueryScope,
        pool_name: &str,
    ) -> Result<NodePool> {
        let payload = QueryNodeRequest {
            states,
            scope,
            pool_name,
        };

        let response = self
            .client
            .post(self.endpoint_url("/v1/nodes/query")?)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))?;

        if !response.status().is_success() {
            return Err(OpalError::Rpc(format!(
                "node query failed: status={} scope={:?} pool={}",
                response.status(),
                scope,
                pool_name
            )));
        }

        response
            .json()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))
    }

    async fn create_replication_pipeline(
        &self,
        replication: ReplicationSpec,
        pool: &NodePool,
    ) -> Result<Pipeline> {
        let payload = CreatePipelineRequest {
            replication,
            node_pool: pool,
        };

        let response = self
            .client
            .post(self.endpoint_url("/v1/pipelines")?)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))?;

        if !response.status().is_success() {
            return Err(OpalError::Rpc(format!(
                "replication pipeline creation failed: status={} nodes={}",
                response.status(),
                pool.nodes.len()
            )));
        }

        response
            .json()
            .await
            .map_err(|error| OpalError::Rpc(error.to_string()))
    }
}

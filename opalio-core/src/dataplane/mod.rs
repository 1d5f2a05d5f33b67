//! Data-plane facade for pipelines of storage nodes.
//!
//! Container bytes live on the member nodes of a pipeline. Calls here go to
//! the pipeline leader over a pooled connection handle acquired from a
//! [`ConnectionPool`].

pub mod http;
pub mod pool;

use crate::error::Result;
use crate::types::{ContainerData, NodeInfo, Pipeline};
use async_trait::async_trait;
use reqwest::Client;

pub use http::HttpDataService;
pub use pool::{CachingConnectionPool, ConnectionPool};

/// Pooled handle to one pipeline's data-service endpoint.
///
/// A handle must be returned to the pool it came from exactly once per
/// acquisition, on every path out of the operation that acquired it.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pipeline_id: String,
    container_id: u64,
    leader: NodeInfo,
    members: Vec<NodeInfo>,
    http: Client,
}

impl ConnectionHandle {
    pub fn new(pipeline: &Pipeline, container_id: u64, http: Client) -> Self {
        Self {
            pipeline_id: pipeline.pipeline_id.clone(),
            container_id,
            leader: pipeline.leader.clone(),
            members: pipeline.members.clone(),
            http,
        }
    }

    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    pub fn container_id(&self) -> u64 {
        self.container_id
    }

    pub fn leader(&self) -> &NodeInfo {
        &self.leader
    }

    pub fn members(&self) -> &[NodeInfo] {
        &self.members
    }

    pub fn http(&self) -> &Client {
        &self.http
    }
}

#[async_trait]
pub trait DataService: Send + Sync {
    /// Create the data-plane representation of a container on the handle's
    /// pipeline.
    async fn create_container(
        &self,
        handle: &ConnectionHandle,
        container_id: u64,
        trace_id: &str,
    ) -> Result<()>;

    /// Delete a container's replicas. `force` bypasses the node-side guard
    /// checks, e.g. still-open writers.
    async fn delete_container(
        &self,
        handle: &ConnectionHandle,
        container_id: u64,
        force: bool,
        trace_id: &str,
    ) -> Result<()>;

    /// Close a container on its pipeline, sealing it against further writes.
    async fn close_container(
        &self,
        handle: &ConnectionHandle,
        container_id: u64,
        trace_id: &str,
    ) -> Result<()>;

    /// Read a container's data-plane snapshot.
    async fn read_container(
        &self,
        handle: &ConnectionHandle,
        container_id: u64,
        trace_id: &str,
    ) -> Result<ContainerData>;

    /// Materialize a pipeline on its chosen member nodes.
    async fn create_pipeline(
        &self,
        handle: &ConnectionHandle,
        pipeline_id: &str,
        members: &[NodeInfo],
    ) -> Result<()>;
}

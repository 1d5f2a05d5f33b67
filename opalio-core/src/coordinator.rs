//! Container lifecycle coordination.
//!
//! Turns one logical container operation into the correctly ordered sequence
//! of calls against the placement service and the container's pipeline,
//! bracketing data-plane work with stage-change notifications and returning
//! pooled connection handles on every path out.

use crate::config::ClientConfig;
use crate::dataplane::{ConnectionHandle, ConnectionPool, DataService};
use crate::error::{OpalError, Result};
use crate::metadata::MetadataService;
use crate::trace::TraceIds;
use crate::types::{
    ContainerData, ContainerRecord, NodePool, NodeState, Pipeline, PipelineState, QueryScope,
    ReplicationSpec, StageOp, StagePhase, StageSubject,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Client-facing container operations.
#[async_trait]
pub trait ContainerClient: Send + Sync {
    /// Allocate a container, materialize its pipeline if needed, and create
    /// it on the data plane. Falls back to the configured replication when
    /// none is given.
    async fn create_container(
        &self,
        owner: &str,
        replication: Option<ReplicationSpec>,
    ) -> Result<ContainerRecord>;

    /// Delete a container's replicas, then drop it from the placement index.
    async fn delete_container(
        &self,
        container_id: u64,
        pipeline: &Pipeline,
        force: bool,
    ) -> Result<()>;

    /// Seal a container against further writes.
    async fn close_container(&self, container_id: u64, pipeline: &Pipeline) -> Result<()>;

    /// Fetch a container's data-plane snapshot from its pipeline.
    async fn read_container(
        &self,
        container_id: u64,
        pipeline: &Pipeline,
    ) -> Result<ContainerData>;

    /// Fetch the placement record of an existing container.
    async fn get_container(&self, container_id: u64) -> Result<ContainerRecord>;

    /// List placement records ordered by container id.
    async fn list_container(&self, start_id: u64, count: u32) -> Result<Vec<ContainerRecord>>;

    /// Return the nodes matching a state filter within a scope.
    async fn query_node(
        &self,
        states: &[NodeState],
        scope: QueryScope,
        pool_name: &str,
    ) -> Result<NodePool>;

    /// Register a replication pipeline over the given node pool.
    async fn create_replication_pipeline(
        &self,
        replication: ReplicationSpec,
        pool: &NodePool,
    ) -> Result<Pipeline>;

    /// Capacity of the given container in bytes.
    async fn container_size(&self, container_id: u64) -> Result<u64>;
}

/// The production [`ContainerClient`].
///
/// Holds no per-call state; concurrent operations are independent apart from
/// contention inside the pool and the services themselves.
pub struct Coordinator {
    metadata: Arc<dyn MetadataService>,
    dataplane: Arc<dyn DataService>,
    pool: Arc<dyn ConnectionPool>,
    trace_ids: Arc<dyn TraceIds>,
    config: Arc<ClientConfig>,
}

impl Coordinator {
    pub fn new(
        metadata: Arc<dyn MetadataService>,
        dataplane: Arc<dyn DataService>,
        pool: Arc<dyn ConnectionPool>,
        trace_ids: Arc<dyn TraceIds>,
        config: Arc<ClientConfig>,
    ) -> Self {
        Self {
            metadata,
            dataplane,
            pool,
            trace_ids,
            config,
        }
    }

    async fn create_on_pipeline(
        &self,
        handle: &ConnectionHandle,
        container: &ContainerRecord,
    ) -> Result<()> {
        let pipeline = &container.pipeline;

        // An Allocated pipeline exists only in the placement service's
        // namespace; the member nodes have to be told about it before any
        // container can land on them.
        match pipeline.state {
            PipelineState::Allocated => self.materialize_pipeline(handle, pipeline).await?,
            PipelineState::Open => {}
            other => {
                return Err(OpalError::IllegalState(format!(
                    "unexpected pipeline state {:?} for pipeline {}",
                    other, pipeline.pipeline_id
                )));
            }
        }

        let container_id = container.container_id;
        let subject_id = container_id.to_string();

        self.metadata
            .notify_stage_change(
                StageSubject::Container,
                &subject_id,
                StageOp::Create,
                StagePhase::Begin,
            )
            .await?;

        let trace_id = self.trace_ids.next_trace_id();
        self.dataplane
            .create_container(handle, container_id, &trace_id)
            .await?;

        // The complete notification goes out only after the data plane has
        // the container, so the placement service never records a container
        // that does not exist.
        self.metadata
            .notify_stage_change(
                StageSubject::Container,
                &subject_id,
                StageOp::Create,
                StagePhase::Complete,
            )
            .await?;

        tracing::debug!(
            "Created container {} leader={} members={:?}",
            container_id,
            pipeline.leader.address,
            pipeline.member_addresses()
        );

        Ok(())
    }

    async fn materialize_pipeline(
        &self,
        handle: &ConnectionHandle,
        pipeline: &Pipeline,
    ) -> Result<()> {
        if pipeline.pipeline_id.is_empty() {
            return Err(OpalError::InvalidRequest(
                "pipeline id cannot be empty when materializing a pipeline".to_string(),
            ));
        }

        // Materialization is a three step protocol: notify the placement
        // service a pipeline create is starting, create it on the member
        // nodes, notify the placement service it finished. The placement
        // service does not accept pipeline subjects in stage-change
        // notifications yet, so only the node-side create runs here.
        // TODO: send the begin/complete pipeline stage events once the
        // placement service handles pipeline stage changes.
        self.dataplane
            .create_pipeline(handle, &pipeline.pipeline_id, &pipeline.members)
            .await?;

        tracing::debug!(
            "Pipeline {} created on {:?}",
            pipeline.pipeline_id,
            pipeline.member_addresses()
        );

        Ok(())
    }

    async fn delete_on_pipeline(
        &self,
        handle: &ConnectionHandle,
        container_id: u64,
        force: bool,
    ) -> Result<()> {
        let trace_id = self.trace_ids.next_trace_id();

        // Replicas go first. A crash between the two steps leaves an orphan
        // the background scrubber can collect; an index entry pointing at
        // already-deleted data cannot be recovered from this client.
        self.dataplane
            .delete_container(handle, container_id, force, &trace_id)
            .await?;
        self.metadata.delete_container(container_id).await?;

        tracing::debug!(
            "Deleted container {} leader={} members={:?}",
            container_id,
            handle.leader().address,
            handle.members()
        );

        Ok(())
    }

    async fn close_on_pipeline(&self, handle: &ConnectionHandle, container_id: u64) -> Result<()> {
        let subject_id = container_id.to_string();

        self.metadata
            .notify_stage_change(
                StageSubject::Container,
                &subject_id,
                StageOp::Close,
                StagePhase::Begin,
            )
            .await?;

        // Close on the pipeline before telling the placement service the
        // close completed. If this client dies in between, the placement
        // service keeps routing allocations to a sealed container and those
        // writes fail cleanly at the nodes; completing on the placement
        // service first could let it replicate a container that is still
        // accepting writes.
        let trace_id = self.trace_ids.next_trace_id();
        self.dataplane
            .close_container(handle, container_id, &trace_id)
            .await?;

        self.metadata
            .notify_stage_change(
                StageSubject::Container,
                &subject_id,
                StageOp::Close,
                StagePhase::Complete,
            )
            .await?;

        Ok(())
    }

    async fn read_on_pipeline(
        &self,
        handle: &ConnectionHandle,
        container_id: u64,
    ) -> Result<ContainerData> {
        let trace_id = self.trace_ids.next_trace_id();
        let data = self
            .dataplane
            .read_container(handle, container_id, &trace_id)
            .await?;

        tracing::debug!(
            "Read container {} leader={} members={:?}",
            container_id,
            handle.leader().address,
            handle.members()
        );

        Ok(data)
    }
}

#[async_trait]
impl ContainerClient for Coordinator {
    async fn create_container(
        &self,
        owner: &str,
        replication: Option<ReplicationSpec>,
    ) -> Result<ContainerRecord> {
        let replication = replication.unwrap_or(self.config.replication);
        let container = self.metadata.allocate_container(replication, owner).await?;

        let handle = self
            .pool
            .acquire(&container.pipeline, container.container_id)
            .await?;
        let result = self.create_on_pipeline(&handle, &container).await;
        self.pool.release(handle).await;
        result?;

        Ok(container)
    }

    async fn delete_container(
        &self,
        container_id: u64,
        pipeline: &Pipeline,
        force: bool,
    ) -> Result<()> {
        let handle = self.pool.acquire(pipeline, container_id).await?;
        let result = self.delete_on_pipeline(&handle, container_id, force).await;
        self.pool.release(handle).await;
        result
    }

    async fn close_container(&self, container_id: u64, pipeline: &Pipeline) -> Result<()> {
        let handle = self.pool.acquire(pipeline, container_id).await?;
        let result = self.close_on_pipeline(&handle, container_id).await;
        self.pool.release(handle).await;
        result
    }

    async fn read_container(
        &self,
        container_id: u64,
        pipeline: &Pipeline,
    ) -> Result<ContainerData> {
        let handle = self.pool.acquire(pipeline, container_id).await?;
        let result = self.read_on_pipeline(&handle, container_id).await;
        self.pool.release(handle).await;
        result
    }

    async fn get_container(&self, container_id: u64) -> Result<ContainerRecord> {
        self.metadata.get_container(container_id).await
    }

    async fn list_container(&self, start_id: u64, count: u32) -> Result<Vec<ContainerRecord>> {
        self.metadata.list_container(start_id, count).await
    }

    async fn query_node(
        &self,
        states: &[NodeState],
        scope: QueryScope,
        pool_name: &str,
    ) -> Result<NodePool> {
        self.metadata.query_node(states, scope, pool_name).await
    }

    async fn create_replication_pipeline(
        &self,
        replication: ReplicationSpec,
        pool: &NodePool,
    ) -> Result<Pipeline> {
        self.metadata
            .create_replication_pipeline(replication, pool)
            .await
    }

    async fn container_size(&self, _container_id: u64) -> Result<u64> {
        // Reports the configured per-container capacity, not current usage.
        self.config
            .container_capacity_bytes
            .ok_or(OpalError::SizeUnknown)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeInfo {
    pub node_id: String,
    pub address: String,
}

/// Lifecycle state of a pipeline as tracked by the placement service.
///
/// `Allocated` means the placement service has reserved the pipeline in its
/// namespace but the member nodes have never been told about it; `Open` means
/// the pipeline exists on its nodes and can host containers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Allocated,
    Open,
    Closed,
}

/// A named, ordered set of storage nodes that jointly host container replicas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pipeline {
    pub pipeline_id: String,
    pub leader: NodeInfo,
    pub members: Vec<NodeInfo>,
    pub state: PipelineState,
}

impl Pipeline {
    pub fn member_addresses(&self) -> Vec<&str> {
        self.members
            .iter()
            .map(|node| node.address.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    Allocated,
    Creating,
    Open,
    Closing,
    Closed,
    Deleting,
}

/// Placement-service record for one container. The authoritative copy lives
/// in the placement service; clients only ever hold a transient snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerRecord {
    pub container_id: u64,
    pub pipeline: Pipeline,
    pub allocated_bytes: u64,
    pub used_bytes: u64,
    pub owner: String,
    pub state: ContainerState,
    pub allocated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationType {
    Standalone,
    Chained,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationFactor {
    One,
    Three,
}

impl ReplicationFactor {
    pub fn replica_count(&self) -> usize {
        match self {
            ReplicationFactor::One => 1,
            ReplicationFactor::Three => 3,
        }
    }
}

/// Replication type and factor pair used when allocating containers and
/// pipelines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicationSpec {
    pub rtype: ReplicationType,
    pub factor: ReplicationFactor,
}

impl Default for ReplicationSpec {
    fn default() -> Self {
        Self {
            rtype: ReplicationType::Standalone,
            factor: ReplicationFactor::One,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Healthy,
    Stale,
    Dead,
    Decommissioning,
    Decommissioned,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryScope {
    Cluster,
    Pool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodePool {
    pub nodes: Vec<NodeInfo>,
}

/// Data-plane snapshot of one container, as reported by its pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerData {
    pub container_id: u64,
    pub state: ContainerState,
    pub used_bytes: u64,
    pub key_count: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageSubject {
    Container,
    Pipeline,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageOp {
    Create,
    Close,
    Delete,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StagePhase {
    Begin,
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;

    // The placement service matches on these strings; renames here are wire
    // breaks, not refactors.
    #[test]
    fn test_lifecycle_enums_serialize_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&PipelineState::Allocated).unwrap(),
            "\"allocated\""
        );
        assert_eq!(
            serde_json::to_string(&ReplicationType::Chained).unwrap(),
            "\"chained\""
        );
        assert_eq!(
            serde_json::to_string(&StagePhase::Begin).unwrap(),
            "\"begin\""
        );
        assert_eq!(
            serde_json::to_string(&StageSubject::Container).unwrap(),
            "\"container\""
        );

        let state: ContainerState = serde_json::from_str("\"closing\"").unwrap();
        assert_eq!(state, ContainerState::Closing);
    }
}

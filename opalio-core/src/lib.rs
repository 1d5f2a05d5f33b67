//! Opalio client core - container lifecycle coordination for replicated
//! edge storage.
//!
//! Sequences each logical container operation across two services:
//! - a placement service that owns container and pipeline bookkeeping
//! - pipelines of storage nodes that hold the container replicas
//!
//! The coordinator brackets data-plane work with stage-change notifications,
//! materializes pipelines before first use, and returns pooled connection
//! handles on every path out of an operation.

pub mod config;
pub mod coordinator;
pub mod dataplane;
pub mod error;
pub mod metadata;
pub mod trace;
pub mod types;

pub use config::ClientConfig;
pub use coordinator::{ContainerClient, Coordinator};
pub use dataplane::{
    CachingConnectionPool, ConnectionHandle, ConnectionPool, DataService, HttpDataService,
};
pub use error::{OpalError, Result};
pub use metadata::{HttpMetadataService, MetadataService};
pub use trace::{TraceIds, UlidTraceIds};
pub use types::{
    ContainerData, ContainerRecord, ContainerState, NodeInfo, NodePool, NodeState, Pipeline,
    PipelineState, QueryScope, ReplicationFactor, ReplicationSpec, ReplicationType, StageOp,
    StagePhase, StageSubject,
};

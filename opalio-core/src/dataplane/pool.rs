//! Connection pooling for pipeline endpoints.
//!
//! Acquisitions of the same pipeline share one underlying HTTP client, so
//! repeated operations against a pipeline multiplex over the same
//! connections. Release is best-effort and never surfaces a failure, since
//! callers run it unconditionally on cleanup paths.

use super::ConnectionHandle;
use crate::error::{OpalError, Result};
use crate::types::Pipeline;
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::sync::RwLock;

#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Acquire a handle to the pipeline's data-service endpoint. May perform
    /// network setup and can therefore fail.
    async fn acquire(&self, pipeline: &Pipeline, container_id: u64) -> Result<ConnectionHandle>;

    /// Return a handle to the pool. Must never fail observably.
    async fn release(&self, handle: ConnectionHandle);
}

struct PooledEndpoint {
    http: Client,
    leases: usize,
}

/// Pool of per-pipeline HTTP clients, keyed by pipeline id.
#[derive(Default)]
pub struct CachingConnectionPool {
    endpoints: RwLock<HashMap<String, PooledEndpoint>>,
}

impl std::fmt::Debug for CachingConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingConnectionPool").finish_non_exhaustive()
    }
}

impl CachingConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionPool for CachingConnectionPool {
    async fn acquire(&self, pipeline: &Pipeline, container_id: u64) -> Result<ConnectionHandle> {
        Url::parse(&format!("http://{}/", pipeline.leader.address)).map_err(|error| {
            OpalError::Rpc(format!(
                "invalid data service address {}: {}",
                pipeline.leader.address, error
            ))
        })?;

        let mut endpoints = self.endpoints.write().await;
        let endpoint = match endpoints.entry(pipeline.pipeline_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let http = Client::builder()
                    .build()
                    .map_err(|error| OpalError::Rpc(error.to_string()))?;
                entry.insert(PooledEndpoint { http, leases: 0 })
            }
        };

        endpoint.leases += 1;
        Ok(ConnectionHandle::new(
            pipeline,
            container_id,
            endpoint.http.clone(),
        ))
    }

    async fn release(&self, handle: ConnectionHandle) {
        let mut endpoints = self.endpoints.write().await;
        match endpoints.get_mut(handle.pipeline_id()) {
            Some(endpoint) if endpoint.leases > 0 => {
                endpoint.leases -= 1;
            }
            _ => {
                tracing::warn!(
                    "Released a handle the pool does not account for: pipeline={}",
                    handle.pipeline_id()
                );
            }
        }
    }
}

use crate::error::{OpalError, Result};
use crate::types::ReplicationSpec;
use serde::{Deserialize, Serialize};

/// Client configuration, built once at start-up and shared immutably.
///
/// There is deliberately no setter surface: the capacity and replication
/// defaults are fixed for the lifetime of the process once the config has
/// been constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Address of the placement service, e.g. `placement-0:9860`.
    pub metadata_addr: String,

    /// Replication used when a caller does not request one explicitly.
    #[serde(default)]
    pub replication: ReplicationSpec,

    /// Capacity of one container in bytes. All containers share the same
    /// capacity. `None` means the deployment never configured it, and size
    /// queries will fail until it does.
    #[serde(default)]
    pub container_capacity_bytes: Option<u64>,
}

impl ClientConfig {
    pub fn new(metadata_addr: impl Into<String>) -> Self {
        Self {
            metadata_addr: metadata_addr.into(),
            replication: ReplicationSpec::default(),
            container_capacity_bytes: None,
        }
    }

    pub fn with_replication(mut self, replication: ReplicationSpec) -> Self {
        self.replication = replication;
        self
    }

    pub fn with_container_capacity_bytes(mut self, capacity: u64) -> Self {
        self.container_capacity_bytes = Some(capacity);
        self
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("OPALIO"))
            .build()
            .map_err(|e| OpalError::Config(e.to_string()))?;

        let config: ClientConfig = settings
            .try_deserialize()
            .map_err(|e| OpalError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.metadata_addr.trim().is_empty() {
            return Err(OpalError::Config(
                "placement service address cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReplicationFactor, ReplicationType};
    use std::io::Write;

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opalio.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "metadata_addr: placement-0:9860\n\
             replication:\n  rtype: chained\n  factor: three\n\
             container_capacity_bytes: 5368709120"
        )
        .unwrap();

        let config = ClientConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.metadata_addr, "placement-0:9860");
        assert_eq!(config.replication.rtype, ReplicationType::Chained);
        assert_eq!(config.replication.factor, ReplicationFactor::Three);
        assert_eq!(config.container_capacity_bytes, Some(5368709120));
    }

    #[test]
    fn test_config_defaults_leave_capacity_unset() {
        let config = ClientConfig::new("placement-0:9860");
        assert_eq!(config.replication, ReplicationSpec::default());
        assert!(config.container_capacity_bytes.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_empty_metadata_addr() {
        let config = ClientConfig::new("  ");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, OpalError::Config(_)));
    }
}

use crate::{
    drain::DrainConfig,
    errors::{AdmissionChangeSnafu, ServiceNotFoundSnafu, StatusQuerySnafu, SvcError},
    operations::{ResourceAdmission, ResourceStateRefresh},
};
use fabric_port::{FabricOperations, NodeId, ServiceStatus, COMPUTE_BINARY_NAME};
use snafu::{OptionExt, ResultExt};
use std::sync::Arc;

/// Identity of the drained node within the fabric.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    id: NodeId,
    binary: String,
}

impl NodeSpec {
    /// Get the node id, the node's hostname.
    pub fn id(&self) -> &NodeId {
        &self.id
    }
    /// Get the compute service binary name used to address the node.
    pub fn binary(&self) -> &str {
        &self.binary
    }
}

/// A compute-fabric node undergoing maintenance.
///
/// Owns the cached scheduling status: the only mutation paths are
/// [`ResourceStateRefresh::refresh_state`] (follows the fabric-reported
/// status) and [`ResourceAdmission`] (records a successful change). Nothing
/// here is shared with the migration tasks, so admission and drain logic
/// never race.
pub struct Node {
    spec: NodeSpec,
    scheduling_enabled: bool,
    fabric: Arc<dyn FabricOperations>,
    config: DrainConfig,
}

impl Node {
    /// New node addressed by its hostname, assumed scheduling-enabled until
    /// the first refresh.
    pub fn new(id: impl Into<NodeId>, fabric: Arc<dyn FabricOperations>) -> Self {
        Self {
            spec: NodeSpec {
                id: id.into(),
                binary: COMPUTE_BINARY_NAME.to_string(),
            },
            scheduling_enabled: true,
            fabric,
            config: DrainConfig::default(),
        }
    }

    /// Address the node through a non-default compute service binary name.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.spec.binary = binary.into();
        self
    }

    /// Replace the default drain tunables.
    #[must_use]
    pub fn with_config(mut self, config: DrainConfig) -> Self {
        self.config = config;
        self
    }

    /// Identity of this node.
    pub fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    /// Last known scheduling status of this node.
    pub fn scheduling_enabled(&self) -> bool {
        self.scheduling_enabled
    }

    pub(crate) fn fabric(&self) -> &Arc<dyn FabricOperations> {
        &self.fabric
    }

    pub(crate) fn config(&self) -> &DrainConfig {
        &self.config
    }

    /// Locate this node's compute service in the fabric service list and
    /// extract its scheduling status.
    async fn service_status(&self) -> Result<ServiceStatus, SvcError> {
        let services = self
            .config
            .status_retry()
            .retry(|| self.fabric.list_services())
            .await
            .context(StatusQuerySnafu {
                node_id: self.spec.id(),
            })?;
        let service = services
            .iter()
            .find(|service| {
                service.host == self.spec.id().as_str() && service.binary == self.spec.binary()
            })
            .context(ServiceNotFoundSnafu {
                node_id: self.spec.id(),
                binary: self.spec.binary(),
            })?;
        Ok(service.service_status())
    }

    /// Issue the admission change and record it in the cache on success.
    /// On error the cache is left untouched: the node's scheduling state
    /// must not be assumed to have changed.
    async fn set_scheduling(&mut self, enable: bool) -> Result<(), SvcError> {
        self.config
            .admission_retry()
            .retry(|| {
                self.fabric
                    .set_node_scheduling(self.spec.id(), self.spec.binary(), enable)
            })
            .await
            .context(AdmissionChangeSnafu {
                node_id: self.spec.id(),
                enable,
            })?;
        self.scheduling_enabled = enable;
        tracing::info!(
            node.id = %self.spec.id(),
            scheduling.enabled = enable,
            "Node admission changed"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResourceStateRefresh for Node {
    async fn refresh_state(&mut self) -> Result<(), SvcError> {
        let enabled = self.service_status().await? == ServiceStatus::Enabled;
        if enabled != self.scheduling_enabled {
            tracing::info!(
                node.id = %self.spec.id(),
                scheduling.enabled = enabled,
                "Node scheduling status updated"
            );
            self.scheduling_enabled = enabled;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResourceAdmission for Node {
    async fn enable(&mut self) -> Result<(), SvcError> {
        self.set_scheduling(true).await
    }
    async fn disable(&mut self) -> Result<(), SvcError> {
        self.set_scheduling(false).await
    }
}

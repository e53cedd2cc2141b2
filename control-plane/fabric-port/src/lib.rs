#![warn(missing_docs)]
//! Transport types and the control-plane API contract consumed by the node
//! drain agent.
//!
//! Implementations of [`FabricOperations`] own authentication, url
//! construction, pagination and the wire format of the individual REST
//! calls; callers only ever see structured results.

mod error;
mod transport;

pub use error::FabricError;
pub use transport::{HostId, NodeId, RemoteService, ServiceStatus, Vm, VmId};

use async_trait::async_trait;

/// Well-known binary name of the per-node compute service, used to address
/// a node in scheduling api calls.
pub const COMPUTE_BINARY_NAME: &str = "fabric-compute";

/// Operations consumed from the compute-fabric control-plane API.
///
/// The contract is semantic: an `Ok` means the fabric accepted the request,
/// an `Err` carries a structured failure kind. Implementations must be safe
/// for concurrent use, as one drain issues calls from one task per resident
/// vm.
#[async_trait]
pub trait FabricOperations: Send + Sync {
    /// List all fabric-reported compute services.
    async fn list_services(&self) -> Result<Vec<RemoteService>, FabricError>;

    /// Enable or disable scheduling of new vms onto the given node.
    async fn set_node_scheduling(
        &self,
        node_id: &NodeId,
        binary: &str,
        enable: bool,
    ) -> Result<(), FabricError>;

    /// List the vms currently resident on the given node.
    async fn list_vms_on_host(&self, node_id: &NodeId) -> Result<Vec<Vm>, FabricError>;

    /// Request a live migration of the given vm off its current host, with
    /// or without block migration.
    async fn request_live_migration(
        &self,
        vm_id: &VmId,
        block_migration: bool,
    ) -> Result<(), FabricError>;

    /// Get the current snapshot of the given vm.
    async fn get_vm(&self, vm_id: &VmId) -> Result<Vm, FabricError>;
}

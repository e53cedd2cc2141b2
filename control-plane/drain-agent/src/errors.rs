use fabric_port::{FabricError, NodeId, VmId};
use snafu::Snafu;

/// Errors surfaced by the drain agent operations.
///
/// Retries happen below this level: a variant here means the fixed attempt
/// budget for the operation is already exhausted. Per-vm migration failures
/// are recorded in the drain result, not raised; only `MigrationPoll` is
/// ever swallowed (logged by the poll loop and treated as not-yet-migrated).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[allow(missing_docs)]
pub enum SvcError {
    #[snafu(display("Failed to query the scheduling status of node '{}'", node_id))]
    StatusQuery {
        node_id: NodeId,
        source: FabricError,
    },
    #[snafu(display(
        "Compute service '{}' for node '{}' not found in the fabric service list",
        binary,
        node_id
    ))]
    ServiceNotFound { node_id: NodeId, binary: String },
    #[snafu(display(
        "Failed to change the scheduling admission of node '{}' (enable: {})",
        node_id,
        enable
    ))]
    AdmissionChange {
        node_id: NodeId,
        enable: bool,
        source: FabricError,
    },
    #[snafu(display("Failed to enumerate the vms resident on node '{}'", node_id))]
    VmEnumeration {
        node_id: NodeId,
        source: FabricError,
    },
    #[snafu(display("Failed to issue a live migration of vm '{}'", vm_id))]
    MigrationIssue { vm_id: VmId, source: FabricError },
    #[snafu(display("Failed to poll the current host of vm '{}'", vm_id))]
    MigrationPoll { vm_id: VmId, source: FabricError },
}

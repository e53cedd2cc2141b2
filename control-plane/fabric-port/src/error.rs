use crate::transport::{NodeId, VmId};
use snafu::Snafu;

/// Failures reported by a control-plane API adapter.
///
/// Adapters translate transport detail into these kinds. The shared-storage
/// incompatibility is a distinguished kind rather than a message to be
/// pattern-matched: it is the one rejection the drain logic branches on.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FabricError {
    #[snafu(display("Fabric api request '{}' failed: {}", request, reason))]
    /// The fabric rejected or failed to serve a request.
    Request {
        /// Name of the failed operation.
        request: String,
        /// Adapter-provided failure detail.
        reason: String,
    },
    #[snafu(display("Block migration can not be used with shared storage"))]
    /// Block migration was requested for a vm backed by shared storage.
    IncompatibleStorage {},
    #[snafu(display("Vm '{}' not found", vm_id))]
    /// The fabric does not know the given vm.
    VmNotFound {
        /// ID of the missing vm.
        vm_id: VmId,
    },
    #[snafu(display("Node '{}' not found", node_id))]
    /// The fabric does not know the given node.
    NodeNotFound {
        /// ID of the missing node.
        node_id: NodeId,
    },
    #[snafu(display("Failed to decode fabric api response: {}", reason))]
    /// The fabric answered with something the adapter could not decode.
    InvalidResponse {
        /// Decoding failure detail.
        reason: String,
    },
}

impl FabricError {
    /// The distinguished rejection that makes a migration task fall back
    /// from block migration to a plain live migration.
    pub fn incompatible_storage(&self) -> bool {
        matches!(self, Self::IncompatibleStorage {})
    }
}

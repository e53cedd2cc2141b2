#![warn(missing_docs)]
//! Node drain agent for a compute-fabric node.
//!
//! Draining takes the node out of scheduling eligibility and live-migrates
//! every resident vm to other nodes, waiting until all relocations are
//! confirmed or a single shared wall-clock deadline expires. The fabric's
//! control-plane API is consumed through the abstract
//! [`fabric_port::FabricOperations`] contract.

mod drain;
mod errors;
#[cfg(test)]
mod mock;
mod node;
mod operations;
mod retry;

pub use drain::{DrainConfig, DrainResult, MigrationStage, VmDrainStatus};
pub use errors::SvcError;
pub use node::{Node, NodeSpec};
pub use operations::{ResourceAdmission, ResourceDrain, ResourceStateRefresh};
pub use retry::RetryPolicy;

use crate::{
    drain::{DrainConfig, VmDrainStatus},
    errors::{MigrationIssueSnafu, SvcError},
    retry::RetryPolicy,
};
use fabric_port::{FabricOperations, HostId, Vm, VmId};
use snafu::ResultExt;
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;

/// Stages of one vm's relocation off the drained node.
///
/// The stage only ever moves forward; `Migrated` and `Abandoned` are final.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MigrationStage {
    /// Task created, nothing issued yet.
    Pending,
    /// Requesting a live migration from the fabric.
    Issuing,
    /// A block migration was accepted by the fabric.
    IssuedBlock,
    /// A plain live migration was accepted after the shared-storage
    /// fallback.
    IssuedPlain,
    /// Waiting for the vm's reported host to change.
    Polling,
    /// The vm is confirmed on another host.
    Migrated,
    /// The issue budget was exhausted; the vm stays put and is never
    /// polled.
    Abandoned,
}

/// Per-vm migration state machine.
///
/// Issues a live migration with the block-migration-first fallback
/// strategy, then polls until the vm's reported host differs from the one
/// captured at drain start. Polling carries no attempt budget of its own;
/// it is bounded only by the orchestrator's shared deadline.
pub(crate) struct MigrationTask {
    vm_id: VmId,
    original_host: HostId,
    stage: MigrationStage,
    fabric: Arc<dyn FabricOperations>,
    issue_retry: RetryPolicy,
    poll_backoff_unit: Duration,
}

impl MigrationTask {
    /// New task for a vm resident on the drained node, capturing the host
    /// id before any migration is issued.
    pub(crate) fn new(vm: &Vm, fabric: Arc<dyn FabricOperations>, config: &DrainConfig) -> Self {
        Self {
            vm_id: vm.id.clone(),
            original_host: vm.host_id.clone(),
            stage: MigrationStage::Pending,
            fabric,
            issue_retry: config.issue_retry().clone(),
            poll_backoff_unit: config.poll_backoff_unit(),
        }
    }

    pub(crate) fn vm_id(&self) -> &VmId {
        &self.vm_id
    }

    #[cfg(test)]
    pub(crate) fn stage(&self) -> MigrationStage {
        self.stage
    }

    /// Drive the state machine to a terminal stage.
    pub(crate) async fn run(mut self) -> (VmId, VmDrainStatus) {
        let status = match self.issue().await {
            Ok(()) => self.poll().await,
            Err(error) => {
                tracing::warn!(vm.uuid = %self.vm_id, %error, "Cannot migrate vm");
                self.stage = MigrationStage::Abandoned;
                VmDrainStatus::Abandoned
            }
        };
        (self.vm_id, status)
    }

    /// Ask the fabric to live-migrate the vm. Block migration is tried
    /// first; the shared-storage rejection switches to a plain live
    /// migration with the same retry shape. Any other rejection consumes
    /// the attempt budget.
    async fn issue(&mut self) -> Result<(), SvcError> {
        self.stage = MigrationStage::Issuing;
        let request = self
            .issue_retry
            .retry_if(
                || self.fabric.request_live_migration(&self.vm_id, true),
                |error| !error.incompatible_storage(),
            )
            .await;
        match request {
            Ok(()) => {
                tracing::info!(vm.uuid = %self.vm_id, "Block migration request accepted");
                self.stage = MigrationStage::IssuedBlock;
                Ok(())
            }
            Err(error) if error.incompatible_storage() => {
                tracing::info!(
                    vm.uuid = %self.vm_id,
                    "Vm is backed by shared storage, falling back to a plain live migration"
                );
                self.issue_retry
                    .retry(|| self.fabric.request_live_migration(&self.vm_id, false))
                    .await
                    .context(MigrationIssueSnafu {
                        vm_id: self.vm_id.clone(),
                    })?;
                tracing::info!(vm.uuid = %self.vm_id, "Plain live migration request accepted");
                self.stage = MigrationStage::IssuedPlain;
                Ok(())
            }
            Err(error) => Err(error).context(MigrationIssueSnafu {
                vm_id: self.vm_id.clone(),
            }),
        }
    }

    /// Delay before the next poll, growing linearly with the poll count.
    fn poll_delay(&self, polls: u32) -> Duration {
        self.poll_backoff_unit * polls
    }

    /// Poll the vm until its host differs from the one captured at drain
    /// start, backing off by `polls * unit` between queries. Query failures
    /// are transient here: the vm may well be mid-migration, so they count
    /// as not-yet-migrated.
    async fn poll(&mut self) -> VmDrainStatus {
        self.stage = MigrationStage::Polling;
        let mut polls = 0u32;
        loop {
            match self.fabric.get_vm(&self.vm_id).await {
                Ok(vm) if vm.host_id != self.original_host => {
                    tracing::info!(
                        vm.uuid = %self.vm_id,
                        host.id = %vm.host_id,
                        "Vm has been migrated"
                    );
                    self.stage = MigrationStage::Migrated;
                    return VmDrainStatus::Migrated;
                }
                Ok(_) => {
                    tracing::info!(vm.uuid = %self.vm_id, "Vm has not been migrated yet");
                }
                Err(source) => {
                    let error = SvcError::MigrationPoll {
                        vm_id: self.vm_id.clone(),
                        source,
                    };
                    tracing::warn!(%error, "Cannot poll the vm status");
                }
            }
            sleep(self.poll_delay(polls)).await;
            polls += 1;
        }
    }
}

mod task;

pub use task::MigrationStage;
use task::MigrationTask;

use crate::{
    errors::{SvcError, VmEnumerationSnafu},
    node::Node,
    operations::ResourceDrain,
    retry::RetryPolicy,
};
use fabric_port::VmId;
use serde::Serialize;
use snafu::ResultExt;
use std::{collections::HashMap, time::Duration};
use tokio::sync::{mpsc, oneshot};

/// Tunables of the drain workflow.
///
/// The defaults match the production shape: 3 attempts per retrying
/// operation, back-to-back status/admission retries and 10s linear backoff
/// units for issuance and polling.
#[derive(Debug, Clone)]
pub struct DrainConfig {
    status_retry: RetryPolicy,
    admission_retry: RetryPolicy,
    issue_retry: RetryPolicy,
    poll_backoff_unit: Duration,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            status_retry: RetryPolicy::no_backoff(3),
            admission_retry: RetryPolicy::no_backoff(3),
            issue_retry: RetryPolicy::new(3, Duration::from_secs(10)),
            poll_backoff_unit: Duration::from_secs(10),
        }
    }
}

impl DrainConfig {
    /// Replace the status-query retry policy.
    #[must_use]
    pub fn with_status_retry(mut self, retry: RetryPolicy) -> Self {
        self.status_retry = retry;
        self
    }
    /// Replace the admission-change retry policy.
    #[must_use]
    pub fn with_admission_retry(mut self, retry: RetryPolicy) -> Self {
        self.admission_retry = retry;
        self
    }
    /// Replace the migration-issuance retry policy.
    #[must_use]
    pub fn with_issue_retry(mut self, retry: RetryPolicy) -> Self {
        self.issue_retry = retry;
        self
    }
    /// Replace the unit of the `polls * unit` poll backoff.
    #[must_use]
    pub fn with_poll_backoff_unit(mut self, unit: Duration) -> Self {
        self.poll_backoff_unit = unit;
        self
    }

    pub(crate) fn status_retry(&self) -> &RetryPolicy {
        &self.status_retry
    }
    pub(crate) fn admission_retry(&self) -> &RetryPolicy {
        &self.admission_retry
    }
    pub(crate) fn issue_retry(&self) -> &RetryPolicy {
        &self.issue_retry
    }
    pub(crate) fn poll_backoff_unit(&self) -> Duration {
        self.poll_backoff_unit
    }
}

/// Outcome of one vm's migration as known when the drain returned.
#[derive(Serialize, Debug, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum VmDrainStatus {
    /// Still in flight when the drain deadline fired.
    Pending,
    /// Confirmed on a different host.
    Migrated,
    /// The issue budget was exhausted; the vm was never polled.
    Abandoned,
}

/// Aggregate outcome of a node drain.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DrainResult {
    all_migrated: bool,
    vm_status: HashMap<VmId, VmDrainStatus>,
}

impl DrainResult {
    fn new(vm_status: HashMap<VmId, VmDrainStatus>) -> Self {
        let all_migrated = vm_status
            .values()
            .all(|status| *status == VmDrainStatus::Migrated);
        Self {
            all_migrated,
            vm_status,
        }
    }

    /// True iff every resident vm was confirmed migrated before the
    /// deadline. Vacuously true when the node had no resident vms.
    pub fn all_migrated(&self) -> bool {
        self.all_migrated
    }

    /// Per-vm outcomes known when the drain returned.
    pub fn vm_status(&self) -> &HashMap<VmId, VmDrainStatus> {
        &self.vm_status
    }
}

#[async_trait::async_trait]
impl ResourceDrain for Node {
    type DrainOutput = DrainResult;

    /// Fan out one migration task per resident vm and wait for all of them
    /// under a single shared wall-clock deadline.
    ///
    /// Enumeration failures abort the drain before anything is spawned.
    /// Per-vm failures do not: they are recorded in the result and the
    /// drain proceeds for the other vms. On deadline expiry the tasks
    /// still in flight are cancelled at their next await point and
    /// reported as [`VmDrainStatus::Pending`].
    async fn drain(&mut self, timeout: Duration) -> Result<DrainResult, SvcError> {
        let vms = self
            .fabric()
            .list_vms_on_host(self.spec().id())
            .await
            .context(VmEnumerationSnafu {
                node_id: self.spec().id(),
            })?;
        tracing::info!(
            node.id = %self.spec().id(),
            vms = vms.len(),
            "Retrieved the list of resident vms"
        );

        let mut vm_status = vms
            .iter()
            .map(|vm| (vm.id.clone(), VmDrainStatus::Pending))
            .collect::<HashMap<_, _>>();
        if vms.is_empty() {
            return Ok(DrainResult::new(vm_status));
        }

        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let mut cancellations = Vec::with_capacity(vms.len());
        for vm in &vms {
            let task = MigrationTask::new(vm, self.fabric().clone(), self.config());
            let vm_id = task.vm_id().clone();
            let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
            cancellations.push(cancel_tx);
            let done = done_tx.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel_rx => {
                        tracing::warn!(
                            vm.uuid = %vm_id,
                            "Drain deadline reached, migration task cancelled"
                        );
                    }
                    outcome = task.run() => {
                        // The orchestrator may have stopped waiting already.
                        done.send(outcome).ok();
                    }
                }
            });
        }
        drop(done_tx);

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let mut outstanding = vms.len();
        while outstanding > 0 {
            tokio::select! {
                _ = &mut deadline => {
                    tracing::warn!(
                        node.id = %self.spec().id(),
                        outstanding,
                        "Timed out waiting for live migrations"
                    );
                    break;
                }
                outcome = done_rx.recv() => match outcome {
                    Some((vm_id, status)) => {
                        vm_status.insert(vm_id, status);
                        outstanding -= 1;
                    }
                    None => break,
                },
            }
        }
        for cancel in cancellations {
            cancel.send(()).ok();
        }

        let result = DrainResult::new(vm_status);
        if result.all_migrated() {
            tracing::info!(node.id = %self.spec().id(), "All vms migrated");
        }
        Ok(result)
    }
}

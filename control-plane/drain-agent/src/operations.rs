use crate::errors::SvcError;
use std::time::Duration;

/// Refresh the locally cached state of a resource from the fabric.
#[async_trait::async_trait]
pub trait ResourceStateRefresh {
    /// Re-read the fabric-reported state and update the cached value.
    async fn refresh_state(&mut self) -> Result<(), SvcError>;
}

/// Scheduling admission operations on a fabric resource.
#[async_trait::async_trait]
pub trait ResourceAdmission {
    /// Put the resource back into the scheduler's eligibility set.
    async fn enable(&mut self) -> Result<(), SvcError>;
    /// Take the resource out of the scheduler's eligibility set.
    async fn disable(&mut self) -> Result<(), SvcError>;
}

/// Drain operations on a fabric resource.
#[async_trait::async_trait]
pub trait ResourceDrain {
    /// Output of a completed drain.
    type DrainOutput;
    /// Relocate every resident vm, waiting no longer than `timeout` for the
    /// combined outcome.
    async fn drain(&mut self, timeout: Duration) -> Result<Self::DrainOutput, SvcError>;
}

//! Fixed-period re-execution of the poll cycle.
//!
//! The loop waits for the startup delay, then alternates between running one
//! cycle and waiting one period. The next wait is only requested once the
//! cycle has finished, so cycles never overlap, and the cycle's outcome has
//! no effect on the cadence.

use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::{cycle::PollCycle, model::PollTarget};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("delayed execution is no longer available: {0}")]
    TimerUnavailable(String),
}

/// Delayed-execution capability supplied by the host.
///
/// Returns once `after` has elapsed. An error means the callback will never
/// fire, which ends polling.
#[async_trait]
pub trait DelayedExecutor: Send + Sync {
    async fn delay(&self, after: Duration) -> Result<(), SchedulerError>;
}

/// Delays on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl DelayedExecutor for TokioDelay {
    async fn delay(&self, after: Duration) -> Result<(), SchedulerError> {
        tokio::time::sleep(after).await;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub startup_delay: Duration,
    pub period: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_secs(5),
            period: Duration::from_secs(15 * 60),
        }
    }
}

pub struct Scheduler {
    cycle: PollCycle,
    target: PollTarget,
    executor: Arc<dyn DelayedExecutor>,
    cadence: Cadence,
}

impl Scheduler {
    pub fn new(
        cycle: PollCycle,
        target: PollTarget,
        executor: Arc<dyn DelayedExecutor>,
        cadence: Cadence,
    ) -> Self {
        Self {
            cycle,
            target,
            executor,
            cadence,
        }
    }

    /// Run until the executor stops firing.
    pub async fn run(self) {
        tracing::info!(
            entity = %self.target.primary,
            startup_delay = ?self.cadence.startup_delay,
            period = ?self.cadence.period,
            "polling scheduled"
        );

        let mut wait = self.cadence.startup_delay;
        loop {
            if let Err(e) = self.executor.delay(wait).await {
                tracing::warn!(error = %e, "polling stopped");
                return;
            }

            let outcome = self.cycle.run(&self.target).await;
            tracing::debug!(?outcome, "cycle finished");

            wait = self.cadence.period;
        }
    }

    /// Start the loop as the single timer task for this instance.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

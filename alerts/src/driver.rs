use crate::registry::AlertQueues;
use log::*;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const MIN_PRUNE_PERIOD: Duration = Duration::from_secs(1);

/// Background task that prunes every alert queue on a fixed period.
pub struct PruneDriver;

impl PruneDriver {
    pub fn spawn(
        queues: Arc<AlertQueues>,
        period: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let period = if period.is_zero() {
            warn!("Alert prune period must be non-zero, using {MIN_PRUNE_PERIOD:?}");
            MIN_PRUNE_PERIOD
        } else {
            period
        };
        info!("Starting alert prune driver (every {}s)", period.as_secs());
        tokio::spawn(Self::run(queues, period, shutdown))
    }

    async fn run(queues: Arc<AlertQueues>, period: Duration, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("Alert prune driver shutting down");
                    break;
                }
                _ = interval.tick() => {
                    Self::prune_once(&queues);
                }
            }
        }
    }

    /// Run one prune pass over every queue and log what it did.
    /// Returns the number of expiration hook failures.
    pub fn prune_once(queues: &AlertQueues) -> usize {
        let mut failures = 0;
        for (name, report) in queues.prune_all() {
            if report.is_quiet() {
                continue;
            }
            debug!(
                "{name}: evicted={}, deferred={}, expired={}, stale={}",
                report.subscribers_evicted,
                report.evictions_deferred,
                report.updates_expired,
                report.stale_copies_dropped
            );
            for err in &report.failures {
                warn!("{name}: expired alert could not be handed off: {err}");
            }
            failures += report.failures.len();
        }
        failures
    }
}

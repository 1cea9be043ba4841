//! # Sync Scheduler
//!
//! Background task that runs a sync cycle immediately on start and then on a
//! fixed interval. Ticks never overlap: if a cycle is still in flight when
//! the next tick fires, that tick is skipped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, histogram};
use tokio::task::JoinHandle;
use tokio::time::{Duration as TokioDuration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::sync::SyncEngine;

/// Background scheduler service.
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    config: SyncConfig,
}

/// Handle to a running scheduler. Dropping it does not stop the loop; call
/// [`SchedulerHandle::stop`] for a clean shutdown that lets an in-flight
/// cycle finish.
pub struct SchedulerHandle {
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// A no-op handle for when scheduling is disabled.
    fn disabled() -> Self {
        Self {
            shutdown: CancellationToken::new(),
            task: None,
        }
    }

    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                error!(error = %err, "scheduler task panicked");
            }
        }
    }
}

impl SyncScheduler {
    pub fn new(engine: Arc<SyncEngine>, config: SyncConfig) -> Self {
        Self { engine, config }
    }

    /// Start the scheduler loop. With sync disabled this returns a handle
    /// that does nothing.
    pub fn start(self) -> SchedulerHandle {
        if !self.config.enabled {
            info!("background sync disabled, scheduler not started");
            return SchedulerHandle::disabled();
        }

        let interval = TokioDuration::from_secs(self.config.interval_minutes as u64 * 60);
        info!(
            interval_minutes = self.config.interval_minutes,
            "starting sync scheduler"
        );

        let shutdown = CancellationToken::new();
        let loop_shutdown = shutdown.clone();
        let task = tokio::spawn(async move {
            self.run(loop_shutdown, interval).await;
        });

        SchedulerHandle {
            shutdown,
            task: Some(task),
        }
    }

    async fn run(self, shutdown: CancellationToken, interval: TokioDuration) {
        let in_progress = Arc::new(AtomicBool::new(false));
        // First tick completes immediately, the rest keep the fixed cadence
        // no matter how long a cycle takes.
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: Option<JoinHandle<()>> = None;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("sync scheduler shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    if let Some(task) = self.spawn_cycle(&in_progress) {
                        in_flight = Some(task);
                    }
                }
            }
        }

        // Let an in-flight cycle finish before reporting the loop stopped.
        if let Some(task) = in_flight.take() {
            if let Err(err) = task.await {
                error!(error = %err, "sync cycle task panicked");
            }
        }
        info!("sync scheduler stopped");
    }

    /// Spawn one cycle, unless the previous one is still running.
    fn spawn_cycle(&self, in_progress: &Arc<AtomicBool>) -> Option<JoinHandle<()>> {
        if !claim_tick(in_progress) {
            warn!("previous sync cycle still running, skipping tick");
            counter!("jira_sync_ticks_skipped_total").increment(1);
            return None;
        }

        let engine = self.engine.clone();
        let guard = in_progress.clone();
        Some(tokio::spawn(async move {
            let started = Instant::now();
            if let Err(err) = engine.run_cycle().await {
                error!(error = %err, "sync cycle failed");
            }
            histogram!("jira_sync_cycle_duration_ms")
                .record(started.elapsed().as_secs_f64() * 1_000.0);
            release_tick(&guard);
        }))
    }
}

/// Try to claim the single-flight guard. Returns false when a cycle is
/// already running.
fn claim_tick(in_progress: &AtomicBool) -> bool {
    in_progress
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

fn release_tick(in_progress: &AtomicBool) {
    in_progress.store(false, Ordering::Release);
}

//! # Sync Scheduler
//!
//! Runs the fetch → diff → dispatch → publish cycle on a fixed interval.
//!
//! ## Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         One Sync Cycle                                  │
//! │                                                                         │
//! │  interval.tick()                                                        │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  fetch_labels() ──► fetch_tally() ──failed──► publish "Error: ..."     │
//! │                          │                    (empty snapshot,          │
//! │                          │ ok                  zero commands)           │
//! │                          ▼                                              │
//! │  engine_snapshot() ──► compute_transitions() ──► dispatch()            │
//! │                                                      │                  │
//! │                                                      ▼                  │
//! │                                  settle() ──► publish "Connected" /     │
//! │                                               "Degraded: N of M ..."    │
//! │                                                                         │
//! │  Errors and panics stop at the cycle boundary. The loop never exits    │
//! │  except on shutdown.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tally_core::diff::compute_transitions;
use tally_core::{ConnectivityStatus, SourceLabels, SourceSnapshot, TallyStatus};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::context::BridgeContext;
use crate::dispatcher::{CommandDispatcher, DispatchReport};
use crate::error::{BridgeError, BridgeResult};
use crate::switcher::SwitcherSource;

// =============================================================================
// Scheduler
// =============================================================================

/// Drives the bridge.
pub struct SyncScheduler {
    context: Arc<BridgeContext>,
    source: Arc<dyn SwitcherSource>,
    dispatcher: CommandDispatcher,
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(
        context: Arc<BridgeContext>,
        source: Arc<dyn SwitcherSource>,
        dispatcher: CommandDispatcher,
        interval: Duration,
    ) -> Self {
        SyncScheduler {
            context,
            source,
            dispatcher,
            interval,
        }
    }

    pub fn context(&self) -> &Arc<BridgeContext> {
        &self.context
    }

    /// Runs a single cycle and returns the status it published.
    ///
    /// Never fails: errors and panics inside the cycle become an `Error: ...`
    /// status with an empty snapshot.
    pub async fn run_once(&self) -> TallyStatus {
        let status = match AssertUnwindSafe(self.cycle()).catch_unwind().await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => self.failed_status(&e),
            Err(panic) => {
                let e = BridgeError::CyclePanicked(panic_message(panic.as_ref()));
                error!(error = %e, "Sync cycle panicked");
                self.failed_status(&e)
            }
        };

        self.context.publish(status.clone()).await;
        status
    }

    fn failed_status(&self, err: &BridgeError) -> TallyStatus {
        TallyStatus::from_snapshot(
            &SourceSnapshot::empty(),
            &SourceLabels::new(),
            &ConnectivityStatus::Error(err.to_string()),
        )
    }

    async fn cycle(&self) -> BridgeResult<TallyStatus> {
        let labels = self.source.fetch_labels().await;

        let outcome = self.source.fetch_tally(&labels).await;
        if let Some(e) = outcome.error {
            return Err(e);
        }
        let snapshot = outcome.snapshot;

        let engine = self.context.engine_snapshot().await;
        let transitions = compute_transitions(&snapshot, &engine.mapping, &engine.committed);

        let report = if transitions.is_empty() {
            DispatchReport::default()
        } else {
            debug!(count = transitions.len(), "Dispatching tally transitions");
            self.dispatcher.dispatch(&transitions, &self.context).await
        };

        self.context.settle().await;

        Ok(TallyStatus::from_snapshot(
            &snapshot,
            &labels,
            &report.connectivity(),
        ))
    }

    /// Runs cycles until a shutdown signal arrives.
    pub async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(interval_ms = self.interval.as_millis() as u64, "Sync scheduler starting");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let status = self.run_once().await;
                    if status.status.starts_with("Error") {
                        warn!(status = %status.status, "Sync cycle failed");
                    } else {
                        debug!(status = %status.status, "Sync cycle complete");
                    }
                }

                _ = shutdown_rx.recv() => {
                    info!("Sync scheduler shutting down");
                    break;
                }
            }
        }
    }

    /// Spawns the scheduler loop onto the runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let context = self.context.clone();
        let task = tokio::spawn(self.run(shutdown_rx));

        SchedulerHandle {
            shutdown_tx,
            context,
            task,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// =============================================================================
// Scheduler Handle (for external control)
// =============================================================================

/// Handle for a running scheduler.
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    context: Arc<BridgeContext>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Shared context for status reads and mapping updates.
    pub fn context(&self) -> &Arc<BridgeContext> {
        &self.context
    }

    /// Latest published status.
    pub async fn status(&self) -> TallyStatus {
        self.context.status().await
    }

    /// Signals the scheduler to stop and waits for the current cycle to end.
    pub async fn shutdown(self) -> BridgeResult<()> {
        let _ = self.shutdown_tx.send(()).await;
        self.task
            .await
            .map_err(|e| BridgeError::CyclePanicked(e.to_string()))
    }
}

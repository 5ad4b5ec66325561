//! Scheduler poller: claims and executes due updates on a fixed tick.
//!
//! Each tick loads the due set, then per record: computes the following
//! occurrence from the record's *original* `next_run` (missed ticks stay
//! on cadence instead of drifting to "now"), claims it with a
//! compare-and-set, executes, and appends the run record. Ticks run
//! strictly sequentially, so an in-flight tick never overlaps itself.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use refresh_core::model::RunRecord;

use crate::engine::ExecutionEngine;
use crate::recurrence;
use crate::store::ScheduledUpdateStore;

pub struct SchedulerPoller {
    store: Arc<dyn ScheduledUpdateStore>,
    engine: ExecutionEngine,
    tick_interval: Duration,
}

impl SchedulerPoller {
    pub fn new(
        store: Arc<dyn ScheduledUpdateStore>,
        engine: ExecutionEngine,
        tick_interval: Duration,
    ) -> Self {
        Self {
            store,
            engine,
            tick_interval,
        }
    }

    /// Process every update due at `now`. One record's failure never
    /// stops the rest; nothing escapes this function.
    pub async fn tick(&self, now: DateTime<Utc>) {
        let due = match self.store.list_due(now).await {
            Ok(due) => due,
            Err(e) => {
                warn!(error = %e, "failed to load due scheduled updates");
                return;
            }
        };

        if due.is_empty() {
            debug!(%now, "tick: nothing due");
            return;
        }
        info!(count = due.len(), "tick: processing due scheduled updates");

        for update in due {
            // list_due only returns records with a next_run.
            let Some(expected) = update.next_run else {
                continue;
            };

            // Reschedule off the original next_run, then claim. A failed
            // claim means another worker (or a concurrent edit) owns this
            // occurrence.
            let following = recurrence::next_run(&update.recurrence, expected);
            match self.store.claim_due(update.id, expected, following).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(update_id = %update.id, "due update claimed elsewhere, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(update_id = %update.id, error = %e, "failed to claim due update");
                    continue;
                }
            }

            let result = self.engine.execute(&update, false).await;
            if !result.success {
                warn!(update_id = %update.id, message = %result.message, "scheduled run failed");
            }

            let record = RunRecord {
                timestamp: Utc::now(),
                items_processed: result.items_processed,
                success: result.success,
                triggered_manually: false,
            };
            if let Err(e) = self.store.append_run(update.id, record).await {
                warn!(update_id = %update.id, error = %e, "failed to record scheduled run");
            }
        }
    }

    /// Tick loop; runs until `shutdown` is notified.
    pub async fn run(&self, shutdown: Arc<Notify>) {
        info!(
            interval_secs = self.tick_interval.as_secs(),
            "scheduler poller started"
        );
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Utc::now()).await;
                }
                _ = shutdown.notified() => {
                    info!("scheduler poller shutting down");
                    break;
                }
            }
        }
    }
}
